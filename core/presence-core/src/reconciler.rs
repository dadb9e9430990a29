//! The polling loop that keeps Discord in step with the editor.
//!
//! Each tick re-derives everything from scratch: pump the client's callback
//! queue, probe for the editor, then either publish the resolved project or
//! clear the activity. Nothing but the session start timestamp survives
//! between ticks, so a failed tick is simply retried by the next one.
//!
//! Ticks are strictly sequential on one thread. The only waits are the tick
//! interval and a one-shot wait for an editor window that has no title yet,
//! both routed through [`Sleeper`] so tests run without real delays.

use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::activity::build_activity;
use crate::config::{ActivityTemplate, PresenceConfig};
use crate::error::{PresenceError, Result};
use crate::presence::{ActivityResult, PresenceClient};
use crate::probe::{ProcessProbe, ProcessTable};
use crate::project_name::{ProjectIdentity, ProjectNameSource};
use crate::session::Session;

pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

#[derive(Debug, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

#[derive(Debug)]
pub enum TickOutcome {
    Updated { project: ProjectIdentity },
    Cleared,
    Failed { error: PresenceError },
}

pub struct Reconciler<C, T, R, S> {
    session: Session<C>,
    probe: ProcessProbe<T>,
    resolver: R,
    sleeper: S,
    editor_process_names: Vec<String>,
    tick_interval: Duration,
    title_wait: Duration,
    activity: ActivityTemplate,
}

impl<C, T, R, S> Reconciler<C, T, R, S>
where
    C: PresenceClient,
    T: ProcessTable,
    R: ProjectNameSource,
    S: Sleeper,
{
    pub fn new(
        session: Session<C>,
        probe: ProcessProbe<T>,
        resolver: R,
        sleeper: S,
        config: &PresenceConfig,
    ) -> Self {
        Self {
            session,
            probe,
            resolver,
            sleeper,
            editor_process_names: config.editor_process_names.clone(),
            tick_interval: config.tick_interval,
            title_wait: config.title_wait,
            activity: config.activity.clone(),
        }
    }

    /// Polls forever. Only external termination ends the daemon.
    pub fn run(&mut self) -> ! {
        info!(
            interval_ms = self.tick_interval.as_millis() as u64,
            "Watching for Unity editor"
        );
        loop {
            self.step();
        }
    }

    /// One tick followed by the fixed interval, whatever the tick's outcome.
    pub fn step(&mut self) -> TickOutcome {
        let outcome = self.tick();
        self.sleeper.sleep(self.tick_interval);
        outcome
    }

    /// Runs one tick. Errors are logged and reported in the outcome, never
    /// propagated.
    pub fn tick(&mut self) -> TickOutcome {
        match self.try_tick() {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(error = %error, "Error updating presence");
                TickOutcome::Failed { error }
            }
        }
    }

    fn try_tick(&mut self) -> Result<TickOutcome> {
        self.session.client_mut().run_callbacks()?;

        let handle = match self.probe.find_process(&self.editor_process_names)? {
            Some(handle) => handle,
            None => {
                self.session
                    .client_mut()
                    .clear_activity(Box::new(log_clear_result))?;
                return Ok(TickOutcome::Cleared);
            }
        };
        debug!(process = %handle.name, pid = handle.pid, "Found Unity process");

        let mut title = handle.window_title;
        if title.trim().is_empty() {
            debug!(pid = handle.pid, "Waiting for Unity window title");
            self.sleeper.sleep(self.title_wait);
            title = self.probe.window_title(handle.pid)?;
        }

        let project = self.resolver.resolve(&title);
        debug!(
            title = %title,
            project = %project.name(),
            source = ?project.source(),
            "Resolved project name"
        );

        let activity = build_activity(&self.activity, &project, self.session.start_timestamp());
        let project_name = project.name().to_string();
        self.session.client_mut().update_activity(
            &activity,
            Box::new(move |result| log_update_result(&project_name, result)),
        )?;

        Ok(TickOutcome::Updated { project })
    }

    pub fn session(&self) -> &Session<C> {
        &self.session
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }
}

fn log_update_result(project: &str, result: ActivityResult) {
    if result.is_ok() {
        info!(project, "Updated rich presence");
    } else {
        warn!(project, result = %result, "Failed to update activity");
    }
}

fn log_clear_result(result: ActivityResult) {
    if result.is_ok() {
        info!("Unity Editor is not running");
    } else {
        warn!(result = %result, "Failed to clear activity");
    }
}
