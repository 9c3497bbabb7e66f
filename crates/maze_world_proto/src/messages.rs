//! Message and reply taxonomy for the adapter/controller channel.
//!
//! The adapter is purely a requester: it sends one `Message` and blocks for
//! exactly one `Reply`. Every exchange on the channel is one such pair.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ErrorReply;
use crate::grid::{AgentId, Direction, Pos};
use crate::policy::PolicyTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentTeam {
    Pacman,
    Ghost,
}

/// Which controller implementation to bind at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Random,
    Eater,
    BehaviorLearning,
}

/// One turn's observation, built fresh by the adapter and discarded after
/// the round trip. Positions use the protocol's (row, col) convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatePayload {
    pub agent_id: AgentId,
    pub agent_positions: BTreeMap<AgentId, Pos>,
    pub food_positions: Vec<Pos>,
    pub fragile_agents: BTreeMap<AgentId, f64>,
    pub wall_positions: Vec<Pos>,
    pub legal_actions: Vec<Direction>,
    /// Reward for the previous transition.
    pub reward: f64,
    /// The action actually executed last turn, not merely requested.
    pub executed_action: Direction,
    pub test_mode: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Message {
    State(StatePayload),
    RequestRegister {
        agent_id: AgentId,
        team: AgentTeam,
        kind: AgentKind,
    },
    RequestGameStart {
        agent_id: AgentId,
        map_width: u32,
        map_height: u32,
    },
    RequestInitialization {
        agent_id: AgentId,
    },
    RequestPolicy {
        agent_id: AgentId,
    },
    Policy {
        agent_id: AgentId,
        table: PolicyTable,
    },
    RequestBehaviorCount {
        agent_id: AgentId,
    },
}

impl Message {
    /// The agent the message concerns; every kind carries one.
    pub fn agent_id(&self) -> AgentId {
        match self {
            Message::State(payload) => payload.agent_id,
            Message::RequestRegister { agent_id, .. }
            | Message::RequestGameStart { agent_id, .. }
            | Message::RequestInitialization { agent_id }
            | Message::RequestPolicy { agent_id }
            | Message::Policy { agent_id, .. }
            | Message::RequestBehaviorCount { agent_id } => *agent_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Reply {
    Action { direction: Direction },
    Ack,
    Policy { table: PolicyTable },
    BehaviorCount { counts: BTreeMap<String, u64> },
    Error(ErrorReply),
}

impl Reply {
    pub fn kind(&self) -> &'static str {
        match self {
            Reply::Action { .. } => "action",
            Reply::Ack => "ack",
            Reply::Policy { .. } => "policy",
            Reply::BehaviorCount { .. } => "behavior_count",
            Reply::Error(_) => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn sample_state() -> StatePayload {
        let mut agent_positions = BTreeMap::new();
        agent_positions.insert(0, Pos::new(1, 2));
        agent_positions.insert(1, Pos::new(4, 4));
        let mut fragile_agents = BTreeMap::new();
        fragile_agents.insert(0, 0.0);
        fragile_agents.insert(1, 1.0);
        StatePayload {
            agent_id: 0,
            agent_positions,
            food_positions: vec![Pos::new(2, 2)],
            fragile_agents,
            wall_positions: vec![Pos::new(0, 0)],
            legal_actions: vec![Direction::North, Direction::East],
            reward: -1.0,
            executed_action: Direction::North,
            test_mode: false,
        }
    }

    #[test]
    fn cbor_round_trip_state_message() {
        let message = Message::State(sample_state());
        let encoded = serde_cbor::to_vec(&message).expect("encode state message");
        let decoded: Message = serde_cbor::from_slice(&encoded).expect("decode state message");
        assert_eq!(decoded, message);
    }

    #[test]
    fn cbor_round_trip_register_message() {
        let message = Message::RequestRegister {
            agent_id: 2,
            team: AgentTeam::Ghost,
            kind: AgentKind::BehaviorLearning,
        };
        let encoded = serde_cbor::to_vec(&message).expect("encode register");
        let decoded: Message = serde_cbor::from_slice(&encoded).expect("decode register");
        assert_eq!(decoded, message);
    }

    #[test]
    fn cbor_round_trip_behavior_count_reply() {
        let mut counts = BTreeMap::new();
        counts.insert("eat".to_string(), 12u64);
        counts.insert("flee".to_string(), 3u64);
        let reply = Reply::BehaviorCount { counts };
        let encoded = serde_cbor::to_vec(&reply).expect("encode reply");
        let decoded: Reply = serde_cbor::from_slice(&encoded).expect("decode reply");
        assert_eq!(decoded, reply);
    }

    #[test]
    fn cbor_round_trip_error_reply() {
        let reply = Reply::Error(ErrorReply {
            code: ErrorCode::ErrUnknownAgent,
            message: "unknown agent id 9".to_string(),
        });
        let encoded = serde_cbor::to_vec(&reply).expect("encode error reply");
        let decoded: Reply = serde_cbor::from_slice(&encoded).expect("decode error reply");
        assert_eq!(decoded, reply);
    }

    #[test]
    fn message_agent_id_covers_every_kind() {
        assert_eq!(Message::State(sample_state()).agent_id(), 0);
        assert_eq!(Message::RequestInitialization { agent_id: 3 }.agent_id(), 3);
        assert_eq!(
            Message::Policy {
                agent_id: 1,
                table: PolicyTable::default(),
            }
            .agent_id(),
            1
        );
    }
}
