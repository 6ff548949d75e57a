//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::events::SessionEvent;
use crate::session::{Action, DurationOption, SessionError, SessionSnapshot};

/// Largest accepted message body
pub const MAX_MESSAGE_LEN: usize = 1024 * 1024;

/// Requests from UI to daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Request current daemon status
    GetStatus,

    /// List the selectable session lengths
    ListDurations,

    /// Start when stopped, pause when running
    StartPause,

    /// Stop the session and restore the full duration
    Reset,

    /// Select a session length in seconds
    SetDuration { seconds: u32 },

    /// Master audio switch
    SetSound { enabled: bool },

    /// Spoken breathing guidance
    SetBreathingGuidance { enabled: bool },

    /// Looping background noise
    SetAmbientSound { enabled: bool },

    /// Ping to check connectivity
    Ping,

    /// Subscribe to session event notifications
    Subscribe,
}

impl Request {
    /// The session action behind this request, if it has one
    pub fn action(&self) -> Option<Action> {
        match *self {
            Request::GetStatus => Some(Action::Snapshot),
            Request::StartPause => Some(Action::StartPause),
            Request::Reset => Some(Action::Reset),
            Request::SetDuration { seconds } => Some(Action::SetDuration(seconds)),
            Request::SetSound { enabled } => Some(Action::SetSound(enabled)),
            Request::SetBreathingGuidance { enabled } => {
                Some(Action::SetBreathingGuidance(enabled))
            }
            Request::SetAmbientSound { enabled } => Some(Action::SetAmbientSound(enabled)),
            Request::ListDurations | Request::Ping | Request::Subscribe => None,
        }
    }
}

/// Responses from daemon to UI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Current daemon status
    Status(DaemonStatus),

    /// Selectable session lengths
    Durations { options: Vec<DurationOption> },

    /// Pong response to ping
    Pong,

    /// Subscription confirmed
    Subscribed,

    /// Error response
    Error { code: String, message: String },
}

impl Response {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Response::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl From<&SessionError> for Response {
    fn from(e: &SessionError) -> Self {
        let code = match e {
            SessionError::InvalidDuration(_) => "invalid_duration",
            SessionError::Unavailable => "unavailable",
        };
        Response::error(code, e.to_string())
    }
}

/// Push notification from daemon to UI (for subscribed clients)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// Session event occurred
    Event { event: SessionEvent },

    /// Some events were dropped because the client fell behind
    Lagged { skipped: u64 },
}

/// Full daemon status snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Daemon version
    pub version: String,

    /// Uptime in seconds
    pub uptime_secs: u64,

    /// Current session state
    pub session: SessionSnapshot,
}

impl DaemonStatus {
    pub fn new(session: SessionSnapshot, uptime_secs: u64) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs,
            session,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let req = Request::SetDuration { seconds: 600 };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("set_duration"));
        assert!(json.contains("600"));
    }

    #[test]
    fn test_request_deserialization() {
        let req: Request =
            serde_json::from_str(r#"{"type":"set_breathing_guidance","enabled":false}"#).unwrap();
        assert_eq!(req.action(), Some(Action::SetBreathingGuidance(false)));

        let req: Request = serde_json::from_str(r#"{"type":"start_pause"}"#).unwrap();
        assert_eq!(req.action(), Some(Action::StartPause));
    }

    #[test]
    fn test_requests_without_action() {
        assert_eq!(Request::Ping.action(), None);
        assert_eq!(Request::Subscribe.action(), None);
        assert_eq!(Request::ListDurations.action(), None);
    }

    #[test]
    fn test_error_response_codes() {
        let err = SessionError::InvalidDuration(crate::session::DurationError::NotAllowed(7));
        let json = serde_json::to_string(&Response::from(&err)).unwrap();
        assert!(json.contains(r#""type":"error""#));
        assert!(json.contains("invalid_duration"));
    }

    #[test]
    fn test_durations_response() {
        let resp = Response::Durations {
            options: DurationOption::all(),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains(r#""label":"1 min","seconds":60"#));
        assert!(json.contains(r#""label":"20 min","seconds":1200"#));
    }
}
