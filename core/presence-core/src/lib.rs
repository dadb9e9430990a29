//! # presence-core
//!
//! Decides what Discord should show about the local Unity editor.
//!
//! ## Design Principles
//!
//! - **Synchronous**: one thread, blocking sleeps, no async runtime.
//! - **Recomputed every tick**: the only cross-tick state is the session
//!   start timestamp held in [`Session`].
//! - **Graceful degradation**: an unreadable title or history file resolves
//!   to `"Unknown Project"`, and a failed tick is retried by the next one.
//! - **Seams at the OS and Discord**: [`ProcessTable`], [`WindowTitleSource`]
//!   and [`PresenceClient`] are traits; the binary supplies real ones.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use presence_core::*;
//!
//! let config = PresenceConfig::default();
//! let mut probe = ProcessProbe::new(
//!     SystemProcessTable::new(NoWindowTitles),
//!     config.host_process_names.clone(),
//! );
//! let session = connect(&mut probe, || MyClient::connect(&config.application_id))?;
//! let resolver = ProjectNameResolver::from_config(&config);
//! Reconciler::new(session, probe, resolver, ThreadSleeper, &config).run();
//! ```

pub mod activity;
pub mod config;
pub mod error;
pub mod presence;
pub mod probe;
pub mod project_name;
pub mod reconciler;
pub mod session;

pub use activity::build_activity;
pub use config::*;
pub use error::{PresenceError, Result, StartupError};
pub use presence::{ActivityResult, PresenceClient, ResultCallback};
pub use probe::{
    NoWindowTitles, ProcessEntry, ProcessHandle, ProcessProbe, ProcessTable, SystemProcessTable,
    WindowTitleSource,
};
pub use project_name::{
    extract_from_history, extract_from_title, resolve_project_name, NameSource, ProjectIdentity,
    ProjectNameResolver, ProjectNameSource,
};
pub use reconciler::{Reconciler, Sleeper, ThreadSleeper, TickOutcome};
pub use session::{connect, Session};

pub use presence_protocol::PresenceActivity;
