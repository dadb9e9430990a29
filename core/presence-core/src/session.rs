//! Startup: `Uninitialized -> Connected`, or a fatal error.

use chrono::Utc;
use tracing::info;

use crate::error::{PresenceError, StartupError};
use crate::presence::PresenceClient;
use crate::probe::{ProcessProbe, ProcessTable};

/// Process-wide context, built once at startup and owned by the reconciler.
pub struct Session<C> {
    client: C,
    /// Daemon launch time in Unix seconds; the "elapsed" origin shown on
    /// Discord for the whole run.
    start_timestamp: i64,
}

impl<C> Session<C> {
    pub fn new(client: C, start_timestamp: i64) -> Self {
        Self {
            client,
            start_timestamp,
        }
    }

    pub fn start_timestamp(&self) -> i64 {
        self.start_timestamp
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }
}

/// Checks that Discord is running, then builds the presence client.
///
/// The client constructor is not called when Discord is absent. Every error
/// returned here is fatal.
pub fn connect<T, C, F>(
    probe: &mut ProcessProbe<T>,
    connect_client: F,
) -> Result<Session<C>, StartupError>
where
    T: ProcessTable,
    C: PresenceClient,
    F: FnOnce() -> Result<C, PresenceError>,
{
    match probe.is_host_running() {
        Ok(true) => {}
        Ok(false) => return Err(StartupError::HostNotRunning),
        Err(err) => return Err(StartupError::HostCheck(err)),
    }

    let start_timestamp = Utc::now().timestamp();
    let client = connect_client().map_err(StartupError::Client)?;
    info!(start_timestamp, "Connected to Discord");

    Ok(Session::new(client, start_timestamp))
}
