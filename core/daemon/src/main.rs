//! Unity presence daemon entrypoint.
//!
//! Polls for a running Unity editor and mirrors the open project to Discord
//! rich presence. Startup either reaches the polling loop or exits with
//! status 1; once polling, nothing but an external kill stops the process.

use presence_core::{
    connect, PresenceClient, PresenceConfig, PresenceError, ProcessProbe, ProjectNameResolver,
    Reconciler, StartupError, SystemProcessTable, ThreadSleeper,
};
use tracing::{error, info};

#[cfg(any(unix, windows))]
mod discord;
#[cfg(any(unix, windows))]
mod ipc_pipe;
mod logging;
mod window_title;

fn main() {
    let logging_guard = logging::init();

    if let Err(err) = run() {
        error!(error = %err, "Startup failed");
        // Flush the file log before exiting; `exit` skips destructors.
        drop(logging_guard);
        std::process::exit(1);
    }
}

fn run() -> Result<(), StartupError> {
    info!(version = env!("CARGO_PKG_VERSION"), "Starting Unity Rich Presence");

    let config = PresenceConfig::default();
    let table = SystemProcessTable::new(window_title::system_titles());
    let mut probe = ProcessProbe::new(table, config.host_process_names.clone());

    let session = connect(&mut probe, || {
        connect_presence_client(&config.application_id)
    })?;

    let resolver = ProjectNameResolver::from_config(&config);
    Reconciler::new(session, probe, resolver, ThreadSleeper, &config).run()
}

fn connect_presence_client(
    application_id: &str,
) -> Result<Box<dyn PresenceClient>, PresenceError> {
    #[cfg(any(unix, windows))]
    {
        let client = discord::DiscordIpcClient::<ipc_pipe::SystemPipe>::connect(application_id)?;
        Ok(Box::new(client))
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = application_id;
        Err(PresenceError::UnsupportedPlatform(
            "Discord IPC needs a Unix socket or a Windows named pipe".to_string(),
        ))
    }
}
