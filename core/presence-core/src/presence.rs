//! The presence client seam.
//!
//! Discord answers activity commands asynchronously: a call only queues the
//! command, and its result reaches the callback during a later
//! [`PresenceClient::run_callbacks`]. Nothing waits on a result; callbacks
//! only log.

use std::fmt;

use presence_protocol::PresenceActivity;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityResult {
    Ok,
    Failed { code: String, message: String },
}

impl ActivityResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, ActivityResult::Ok)
    }
}

impl fmt::Display for ActivityResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityResult::Ok => write!(f, "ok"),
            ActivityResult::Failed { code, message } => write!(f, "{} ({})", code, message),
        }
    }
}

pub type ResultCallback = Box<dyn FnOnce(ActivityResult) + Send>;

pub trait PresenceClient {
    /// Drains whatever the client has received and fires completed callbacks.
    fn run_callbacks(&mut self) -> Result<()>;

    fn update_activity(
        &mut self,
        activity: &PresenceActivity,
        on_result: ResultCallback,
    ) -> Result<()>;

    fn clear_activity(&mut self, on_result: ResultCallback) -> Result<()>;
}

impl<C: PresenceClient + ?Sized> PresenceClient for Box<C> {
    fn run_callbacks(&mut self) -> Result<()> {
        (**self).run_callbacks()
    }

    fn update_activity(
        &mut self,
        activity: &PresenceActivity,
        on_result: ResultCallback,
    ) -> Result<()> {
        (**self).update_activity(activity, on_result)
    }

    fn clear_activity(&mut self, on_result: ResultCallback) -> Result<()> {
        (**self).clear_activity(on_result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_result_shows_code_and_message() {
        let failed = ActivityResult::Failed {
            code: "4000".to_string(),
            message: "bad activity".to_string(),
        };
        assert!(!failed.is_ok());
        assert_eq!(failed.to_string(), "4000 (bad activity)");
        assert!(ActivityResult::Ok.is_ok());
    }
}
