//! Controller-side message server.
//!
//! Owns the registry of controller agents, routes each incoming message to
//! the agent it names, and answers with exactly one reply per message.
//! Controller faults cross the wire as `Reply::Error`, so a requester never
//! hangs on a failed exchange.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use maze_world::controller::{
    BehaviorLearningAgent, ControllerAgent, EaterAgent, RandomAgent,
};
use maze_world::learning::LearningConfig;
use maze_world::rng::derive_seed;
use maze_world::state::GameState;
use maze_world_proto::{
    decode_message, encode_reply, AgentId, AgentKind, AgentTeam, Direction, ErrorReply,
    MazeError, Message, Reply, StatePayload, PACMAN_ID,
};

use crate::transport::BlockingChannel;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Fixes the team roster: Pacman is id 0, ghosts are 1..=num_ghosts.
    pub num_ghosts: u32,
    pub seed: u64,
    pub learning: LearningConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            num_ghosts: 4,
            seed: 0,
            learning: LearningConfig::default(),
        }
    }
}

struct ControllerSlot {
    agent: Box<dyn ControllerAgent + Send>,
    team: AgentTeam,
    ally_ids: Vec<AgentId>,
    enemy_ids: Vec<AgentId>,
    /// Turns handled this episode; reset on game start.
    iteration: u64,
}

pub struct ControllerServer {
    config: ServerConfig,
    slots: BTreeMap<AgentId, ControllerSlot>,
    log: Vec<SessionLogEntry>,
    messages_handled: u64,
    actions_chosen: u64,
    rejects: u64,
}

impl ControllerServer {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            slots: BTreeMap::new(),
            log: Vec::new(),
            messages_handled: 0,
            actions_chosen: 0,
            rejects: 0,
        }
    }

    fn team_of(&self, agent_id: AgentId) -> AgentTeam {
        if agent_id == PACMAN_ID {
            AgentTeam::Pacman
        } else {
            AgentTeam::Ghost
        }
    }

    /// Allies and enemies of an agent under the configured roster.
    fn roster(&self, agent_id: AgentId) -> (Vec<AgentId>, Vec<AgentId>) {
        let team = self.team_of(agent_id);
        let mut ally_ids = Vec::new();
        let mut enemy_ids = Vec::new();
        for id in 0..=self.config.num_ghosts {
            if id == agent_id {
                continue;
            }
            if self.team_of(id) == team {
                ally_ids.push(id);
            } else {
                enemy_ids.push(id);
            }
        }
        (ally_ids, enemy_ids)
    }

    fn slot_mut(&mut self, agent_id: AgentId) -> Result<&mut ControllerSlot, MazeError> {
        self.slots
            .get_mut(&agent_id)
            .ok_or(MazeError::UnknownAgent { agent_id })
    }

    fn bind_agent(
        &mut self,
        agent_id: AgentId,
        team: AgentTeam,
        kind: AgentKind,
    ) -> Result<(), MazeError> {
        if agent_id > self.config.num_ghosts {
            return Err(MazeError::UnknownAgent { agent_id });
        }
        if team != self.team_of(agent_id) {
            return Err(MazeError::MalformedState {
                detail: format!("agent {agent_id} registered with the wrong team"),
            });
        }
        let (ally_ids, enemy_ids) = self.roster(agent_id);
        let seed = derive_seed(self.config.seed, agent_id as u64);
        let agent: Box<dyn ControllerAgent + Send> = match kind {
            AgentKind::Random => Box::new(RandomAgent::new(agent_id, seed)),
            AgentKind::Eater => Box::new(EaterAgent::new(agent_id, seed)),
            AgentKind::BehaviorLearning => {
                let learning = LearningConfig {
                    seed,
                    ..self.config.learning.clone()
                };
                Box::new(BehaviorLearningAgent::for_team(
                    team, agent_id, &ally_ids, &enemy_ids, &learning,
                ))
            }
        };
        self.slots.insert(
            agent_id,
            ControllerSlot {
                agent,
                team,
                ally_ids,
                enemy_ids,
                iteration: 0,
            },
        );
        Ok(())
    }

    fn handle_state(&mut self, payload: &StatePayload) -> Result<Direction, MazeError> {
        let slot = self.slot_mut(payload.agent_id)?;
        let state = GameState::from_payload(
            payload,
            slot.iteration,
            &slot.ally_ids,
            &slot.enemy_ids,
        );
        let explore = !payload.test_mode;
        let direction = slot.agent.choose_action(
            &state,
            payload.executed_action,
            payload.reward,
            &payload.legal_actions,
            explore,
        )?;
        slot.iteration += 1;
        Ok(direction)
    }

    /// Routes one decoded message and produces its reply.
    pub fn handle(&mut self, message: &Message) -> Result<Reply, MazeError> {
        match message {
            Message::RequestRegister {
                agent_id,
                team,
                kind,
            } => {
                self.bind_agent(*agent_id, *team, *kind)?;
                self.push_log(SessionLogKind::AgentRegistered {
                    agent_id: *agent_id,
                    team: *team,
                    kind: *kind,
                });
                Ok(Reply::Ack)
            }
            Message::RequestGameStart {
                agent_id,
                map_width,
                map_height,
            } => {
                let slot = self.slot_mut(*agent_id)?;
                slot.iteration = 0;
                slot.agent.start_episode();
                self.push_log(SessionLogKind::GameStarted {
                    agent_id: *agent_id,
                    map_width: *map_width,
                    map_height: *map_height,
                });
                Ok(Reply::Ack)
            }
            Message::RequestInitialization { agent_id } => {
                self.slot_mut(*agent_id)?;
                Ok(Reply::Ack)
            }
            Message::State(payload) => {
                let direction = self.handle_state(payload)?;
                self.actions_chosen += 1;
                self.push_log(SessionLogKind::ActionChosen {
                    agent_id: payload.agent_id,
                    direction,
                });
                Ok(Reply::Action { direction })
            }
            Message::RequestPolicy { agent_id } => {
                let slot = self.slot_mut(*agent_id)?;
                let table = slot
                    .agent
                    .get_policy()
                    .ok_or(MazeError::PolicyUnavailable {
                        agent_id: *agent_id,
                    })?;
                self.push_log(SessionLogKind::PolicyExported {
                    agent_id: *agent_id,
                });
                Ok(Reply::Policy { table })
            }
            Message::Policy { agent_id, table } => {
                let slot = self.slot_mut(*agent_id)?;
                slot.agent.set_policy(table)?;
                self.push_log(SessionLogKind::PolicyImported {
                    agent_id: *agent_id,
                });
                Ok(Reply::Ack)
            }
            Message::RequestBehaviorCount { agent_id } => {
                let slot = self.slot_mut(*agent_id)?;
                let counts = slot.agent.behavior_count();
                Ok(Reply::BehaviorCount { counts })
            }
        }
    }

    /// Decodes one frame, routes it, and encodes the reply. Routing faults
    /// become `Reply::Error` frames; only an encoding failure is fatal.
    pub fn handle_frame(&mut self, frame: &[u8]) -> Result<Vec<u8>, MazeError> {
        self.messages_handled += 1;
        let reply = match decode_message(frame).and_then(|message| self.handle(&message)) {
            Ok(reply) => reply,
            Err(error) => {
                self.rejects += 1;
                let error_reply = ErrorReply::from_error(&error);
                self.push_log(SessionLogKind::MessageRejected {
                    code: format!("{:?}", error_reply.code),
                });
                Reply::Error(error_reply)
            }
        };
        encode_reply(&reply)
    }

    /// Serves a channel until the peer closes it: receive one frame, send
    /// one reply, repeat. No timeouts; a silent peer blocks indefinitely.
    pub fn serve<C: BlockingChannel>(&mut self, channel: &mut C) -> Result<(), MazeError> {
        loop {
            let frame = match channel.recv() {
                Ok(frame) => frame,
                Err(MazeError::ChannelClosed) => return Ok(()),
                Err(error) => return Err(error),
            };
            let reply = self.handle_frame(&frame)?;
            channel.send(reply)?;
        }
    }

    fn push_log(&mut self, kind: SessionLogKind) {
        let sequence = self.log.len() as u64;
        self.log.push(SessionLogEntry { sequence, kind });
    }

    pub fn log(&self) -> &[SessionLogEntry] {
        &self.log
    }

    pub fn registered_teams(&self) -> BTreeMap<AgentId, AgentTeam> {
        self.slots.iter().map(|(id, slot)| (*id, slot.team)).collect()
    }

    pub fn metrics(&self) -> ServerMetrics {
        ServerMetrics {
            registered_agents: self.slots.len(),
            messages_handled: self.messages_handled,
            actions_chosen: self.actions_chosen,
            rejects: self.rejects,
        }
    }
}

/// A structured log entry for one server-side event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionLogEntry {
    pub sequence: u64,
    pub kind: SessionLogKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SessionLogKind {
    AgentRegistered {
        agent_id: AgentId,
        team: AgentTeam,
        kind: AgentKind,
    },
    GameStarted {
        agent_id: AgentId,
        map_width: u32,
        map_height: u32,
    },
    ActionChosen {
        agent_id: AgentId,
        direction: Direction,
    },
    PolicyExported {
        agent_id: AgentId,
    },
    PolicyImported {
        agent_id: AgentId,
    },
    MessageRejected {
        code: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServerMetrics {
    pub registered_agents: usize,
    pub messages_handled: u64,
    pub actions_chosen: u64,
    pub rejects: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use maze_world_proto::Pos;
    use std::collections::BTreeMap as Map;

    fn server() -> ControllerServer {
        ControllerServer::new(ServerConfig {
            num_ghosts: 2,
            ..ServerConfig::default()
        })
    }

    fn register(server: &mut ControllerServer, agent_id: AgentId, kind: AgentKind) {
        let team = if agent_id == PACMAN_ID {
            AgentTeam::Pacman
        } else {
            AgentTeam::Ghost
        };
        let reply = server
            .handle(&Message::RequestRegister {
                agent_id,
                team,
                kind,
            })
            .expect("register");
        assert_eq!(reply, Reply::Ack);
    }

    fn state_payload(agent_id: AgentId) -> StatePayload {
        let mut agent_positions = Map::new();
        agent_positions.insert(0, Pos::new(1, 1));
        agent_positions.insert(1, Pos::new(4, 4));
        agent_positions.insert(2, Pos::new(6, 2));
        let mut fragile_agents = Map::new();
        for id in 0..3 {
            fragile_agents.insert(id, 0.0);
        }
        StatePayload {
            agent_id,
            agent_positions,
            food_positions: vec![Pos::new(1, 3)],
            fragile_agents,
            wall_positions: Vec::new(),
            legal_actions: vec![Direction::North, Direction::East],
            reward: 0.0,
            executed_action: Direction::Stop,
            test_mode: false,
        }
    }

    #[test]
    fn unregistered_agent_is_rejected_not_defaulted() {
        let mut server = server();
        let err = server
            .handle(&Message::State(state_payload(1)))
            .expect_err("agent 1 never registered");
        assert_eq!(err, MazeError::UnknownAgent { agent_id: 1 });
        assert!(server.registered_teams().is_empty());
    }

    #[test]
    fn register_binds_by_roster_position() {
        let mut server = server();
        register(&mut server, 0, AgentKind::BehaviorLearning);
        register(&mut server, 2, AgentKind::BehaviorLearning);
        let teams = server.registered_teams();
        assert_eq!(teams[&0], AgentTeam::Pacman);
        assert_eq!(teams[&2], AgentTeam::Ghost);
    }

    #[test]
    fn register_rejects_wrong_team() {
        let mut server = server();
        let err = server
            .handle(&Message::RequestRegister {
                agent_id: 1,
                team: AgentTeam::Pacman,
                kind: AgentKind::Random,
            })
            .expect_err("ghost slot cannot host pacman");
        assert!(matches!(err, MazeError::MalformedState { .. }));
    }

    #[test]
    fn register_rejects_id_outside_roster() {
        let mut server = server();
        let err = server
            .handle(&Message::RequestRegister {
                agent_id: 9,
                team: AgentTeam::Ghost,
                kind: AgentKind::Random,
            })
            .expect_err("roster has ids 0..=2");
        assert_eq!(err, MazeError::UnknownAgent { agent_id: 9 });
    }

    #[test]
    fn state_message_yields_a_legal_action() {
        let mut server = server();
        register(&mut server, 0, AgentKind::BehaviorLearning);
        for _ in 0..50 {
            let reply = server
                .handle(&Message::State(state_payload(0)))
                .expect("state");
            let Reply::Action { direction } = reply else {
                panic!("expected an action reply");
            };
            assert!([Direction::North, Direction::East].contains(&direction));
        }
    }

    #[test]
    fn empty_legal_actions_resolve_to_stop() {
        let mut server = server();
        register(&mut server, 0, AgentKind::BehaviorLearning);
        let mut payload = state_payload(0);
        payload.legal_actions = Vec::new();
        let reply = server.handle(&Message::State(payload)).expect("state");
        assert_eq!(
            reply,
            Reply::Action {
                direction: Direction::Stop
            }
        );
    }

    #[test]
    fn iteration_resets_on_game_start() {
        let mut server = server();
        register(&mut server, 0, AgentKind::BehaviorLearning);
        for _ in 0..5 {
            server
                .handle(&Message::State(state_payload(0)))
                .expect("state");
        }
        assert_eq!(server.slots[&0].iteration, 5);
        server
            .handle(&Message::RequestGameStart {
                agent_id: 0,
                map_width: 20,
                map_height: 11,
            })
            .expect("game start");
        assert_eq!(server.slots[&0].iteration, 0);
    }

    #[test]
    fn behavior_counts_accumulate_and_reset_with_episode() {
        let mut server = server();
        register(&mut server, 0, AgentKind::BehaviorLearning);
        let turns = 12u64;
        for _ in 0..turns {
            server
                .handle(&Message::State(state_payload(0)))
                .expect("state");
        }
        let reply = server
            .handle(&Message::RequestBehaviorCount { agent_id: 0 })
            .expect("count");
        let Reply::BehaviorCount { counts } = reply else {
            panic!("expected a behavior count reply");
        };
        assert_eq!(counts.values().sum::<u64>(), turns);

        server
            .handle(&Message::RequestGameStart {
                agent_id: 0,
                map_width: 20,
                map_height: 11,
            })
            .expect("game start");
        let reply = server
            .handle(&Message::RequestBehaviorCount { agent_id: 0 })
            .expect("count");
        let Reply::BehaviorCount { counts } = reply else {
            panic!("expected a behavior count reply");
        };
        assert!(counts.values().all(|count| *count == 0));
    }

    #[test]
    fn policy_export_import_round_trips_through_messages() {
        let mut server = server();
        register(&mut server, 0, AgentKind::BehaviorLearning);
        for _ in 0..10 {
            server
                .handle(&Message::State(state_payload(0)))
                .expect("state");
        }
        let reply = server
            .handle(&Message::RequestPolicy { agent_id: 0 })
            .expect("policy");
        let Reply::Policy { table } = reply else {
            panic!("expected a policy reply");
        };

        let mut fresh = server_with_pacman();
        let reply = fresh
            .handle(&Message::Policy {
                agent_id: 0,
                table: table.clone(),
            })
            .expect("import");
        assert_eq!(reply, Reply::Ack);
        let reply = fresh
            .handle(&Message::RequestPolicy { agent_id: 0 })
            .expect("policy");
        assert_eq!(reply, Reply::Policy { table });
    }

    fn server_with_pacman() -> ControllerServer {
        let mut server = server();
        register(&mut server, 0, AgentKind::BehaviorLearning);
        server
    }

    #[test]
    fn policy_request_for_random_agent_is_unavailable() {
        let mut server = server();
        register(&mut server, 1, AgentKind::Random);
        let err = server
            .handle(&Message::RequestPolicy { agent_id: 1 })
            .expect_err("random agent owns no policy");
        assert_eq!(err, MazeError::PolicyUnavailable { agent_id: 1 });
    }

    #[test]
    fn handle_frame_encodes_faults_as_error_replies() {
        let mut server = server();
        let frame = maze_world_proto::encode_message(&Message::RequestPolicy { agent_id: 3 })
            .expect("encode");
        let reply_frame = server.handle_frame(&frame).expect("handle frame");
        let reply = maze_world_proto::decode_reply(&reply_frame).expect("decode");
        assert!(matches!(reply, Reply::Error(_)));
        assert_eq!(server.metrics().rejects, 1);
    }

    #[test]
    fn metrics_count_messages_and_actions() {
        let mut server = server();
        register(&mut server, 0, AgentKind::Eater);
        let frame = maze_world_proto::encode_message(&Message::State(state_payload(0)))
            .expect("encode");
        server.handle_frame(&frame).expect("handle frame");
        let metrics = server.metrics();
        assert_eq!(metrics.registered_agents, 1);
        assert_eq!(metrics.messages_handled, 1);
        assert_eq!(metrics.actions_chosen, 1);
        assert_eq!(metrics.rejects, 0);
    }

    #[test]
    fn log_and_metrics_serialize_for_telemetry() {
        let mut server = server();
        register(&mut server, 0, AgentKind::BehaviorLearning);
        server
            .handle(&Message::State(state_payload(0)))
            .expect("state");
        let log_json = serde_json::to_string(server.log()).expect("log json");
        assert!(log_json.contains("AgentRegistered"));
        let metrics_json = serde_json::to_string(&server.metrics()).expect("metrics json");
        let decoded: ServerMetrics =
            serde_json::from_str(&metrics_json).expect("metrics round trip");
        assert_eq!(decoded, server.metrics());
    }

    #[test]
    fn session_log_records_lifecycle() {
        let mut server = server();
        register(&mut server, 0, AgentKind::BehaviorLearning);
        server
            .handle(&Message::RequestGameStart {
                agent_id: 0,
                map_width: 20,
                map_height: 11,
            })
            .expect("game start");
        server
            .handle(&Message::State(state_payload(0)))
            .expect("state");
        let kinds: Vec<&SessionLogKind> =
            server.log().iter().map(|entry| &entry.kind).collect();
        assert!(matches!(kinds[0], SessionLogKind::AgentRegistered { .. }));
        assert!(matches!(kinds[1], SessionLogKind::GameStarted { .. }));
        assert!(matches!(kinds[2], SessionLogKind::ActionChosen { .. }));
        assert_eq!(server.log()[2].sequence, 2);
    }
}
