//! Error types for presence-core operations.
//!
//! Two types keep the fatal/recoverable split explicit: `StartupError` can
//! only come out of [`crate::session::connect`] and ends the process, while
//! `PresenceError` is what a single tick may fail with and the loop absorbs.

use presence_protocol::ErrorInfo;

// ═══════════════════════════════════════════════════════════════════════════════
// Recoverable (per-tick) errors
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum PresenceError {
    // ─────────────────────────────────────────────────────────────────────
    // Probe Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Process query failed: {0}")]
    ProcessQuery(String),

    #[error("Window title lookup failed: {0}")]
    WindowTitle(String),

    // ─────────────────────────────────────────────────────────────────────
    // Presence Client Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Presence client error: {0}")]
    Client(String),

    #[error("Presence connection closed: {0}")]
    ConnectionClosed(String),

    #[error("Presence protocol error: {0}")]
    Protocol(#[from] ErrorInfo),

    // ─────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Platform not supported for this operation: {0}")]
    UnsupportedPlatform(String),
}

impl PresenceError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        PresenceError::Io {
            context: context.into(),
            source,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Fatal (startup) errors
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Discord is not running. Please start Discord first.")]
    HostNotRunning,

    #[error("Failed to check for Discord: {0}")]
    HostCheck(#[source] PresenceError),

    #[error("Failed to initialize Discord: {0}")]
    Client(#[source] PresenceError),
}

/// Convenience type alias for Results using PresenceError.
pub type Result<T> = std::result::Result<T, PresenceError>;
