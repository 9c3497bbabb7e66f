//! Error types shared across the adapter, controller, and wire layers.

use std::io;

use serde::{Deserialize, Serialize};

use crate::grid::AgentId;

#[derive(Debug, Clone, PartialEq)]
pub enum MazeError {
    /// A message referenced an agent id the controller never registered.
    UnknownAgent { agent_id: AgentId },
    /// A state snapshot is missing a field a feature or behavior requires.
    MalformedState { detail: String },
    /// A policy table referenced a behavior name the learner does not hold.
    UnknownBehavior { behavior: String },
    /// A policy table does not match the learner's behavior/feature shape.
    PolicyShapeMismatch { reason: String },
    /// The agent exists but owns no learned policy.
    PolicyUnavailable { agent_id: AgentId },
    /// The request/reply ordering invariant was violated on the client.
    RequestDiscipline { detail: String },
    /// The peer answered with a reply kind the request does not admit.
    UnexpectedReply { expected: &'static str, found: &'static str },
    /// The peer answered with an error reply.
    RequestFailed { code: ErrorCode, message: String },
    /// The underlying channel was closed by the peer.
    ChannelClosed,
    Serde(String),
    Io(String),
}

impl From<serde_cbor::Error> for MazeError {
    fn from(error: serde_cbor::Error) -> Self {
        MazeError::Serde(error.to_string())
    }
}

impl From<serde_json::Error> for MazeError {
    fn from(error: serde_json::Error) -> Self {
        MazeError::Serde(error.to_string())
    }
}

impl From<io::Error> for MazeError {
    fn from(error: io::Error) -> Self {
        MazeError::Io(error.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ErrUnknownAgent,
    ErrMalformedState,
    ErrUnknownBehavior,
    ErrPolicyShape,
    ErrPolicyUnavailable,
    ErrBadRequest,
    ErrInternal,
}

/// Wire carrier for controller-side faults, so a failed request surfaces at
/// the adapter as an error instead of a hang.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorReply {
    pub fn from_error(error: &MazeError) -> Self {
        let code = match error {
            MazeError::UnknownAgent { .. } => ErrorCode::ErrUnknownAgent,
            MazeError::MalformedState { .. } => ErrorCode::ErrMalformedState,
            MazeError::UnknownBehavior { .. } => ErrorCode::ErrUnknownBehavior,
            MazeError::PolicyShapeMismatch { .. } => ErrorCode::ErrPolicyShape,
            MazeError::PolicyUnavailable { .. } => ErrorCode::ErrPolicyUnavailable,
            MazeError::Serde(_) => ErrorCode::ErrBadRequest,
            _ => ErrorCode::ErrInternal,
        };
        Self {
            code,
            message: error.describe(),
        }
    }
}

impl From<ErrorReply> for MazeError {
    fn from(reply: ErrorReply) -> Self {
        MazeError::RequestFailed {
            code: reply.code,
            message: reply.message,
        }
    }
}

impl MazeError {
    pub fn describe(&self) -> String {
        match self {
            MazeError::UnknownAgent { agent_id } => {
                format!("unknown agent id {agent_id}")
            }
            MazeError::MalformedState { detail } => {
                format!("malformed state: {detail}")
            }
            MazeError::UnknownBehavior { behavior } => {
                format!("unknown behavior {behavior:?}")
            }
            MazeError::PolicyShapeMismatch { reason } => {
                format!("policy shape mismatch: {reason}")
            }
            MazeError::PolicyUnavailable { agent_id } => {
                format!("agent {agent_id} owns no policy")
            }
            MazeError::RequestDiscipline { detail } => {
                format!("request discipline violation: {detail}")
            }
            MazeError::UnexpectedReply { expected, found } => {
                format!("expected {expected} reply, got {found}")
            }
            MazeError::RequestFailed { code, message } => {
                format!("request failed ({code:?}): {message}")
            }
            MazeError::ChannelClosed => "channel closed by peer".to_string(),
            MazeError::Serde(detail) => format!("serde: {detail}"),
            MazeError::Io(detail) => format!("io: {detail}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_reply_maps_codes() {
        let reply = ErrorReply::from_error(&MazeError::UnknownAgent { agent_id: 7 });
        assert_eq!(reply.code, ErrorCode::ErrUnknownAgent);
        assert!(reply.message.contains('7'));
    }

    #[test]
    fn error_reply_round_trips_as_request_failed() {
        let reply = ErrorReply {
            code: ErrorCode::ErrPolicyUnavailable,
            message: "agent 1 owns no policy".to_string(),
        };
        let error = MazeError::from(reply.clone());
        assert_eq!(
            error,
            MazeError::RequestFailed {
                code: ErrorCode::ErrPolicyUnavailable,
                message: reply.message,
            }
        );
    }
}
