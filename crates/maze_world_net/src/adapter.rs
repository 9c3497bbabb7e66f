//! In-simulation client adapter.
//!
//! The adapter runs embedded in the host game engine. Each turn it converts
//! the host's native state into a protocol `State` message, performs one
//! blocking round trip to the remote controller, and hands the returned
//! action back to the host. It never originates anything but requests.
//!
//! Coordinate normalization: the host is `(x, y)`-native; the wire is
//! `(row, col)`. Every emitted position goes through the same axis swap.
//! Observed ghost positions are perturbed by independent per-axis integer
//! noise in `[-noise, +noise]`; Pacman's own position is always exact, in
//! every adapter's view.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use maze_world::rng::Lcg;
use maze_world_proto::{
    AgentId, AgentKind, AgentTeam, Direction, MazeError, Message, PolicyTable, Pos, Reply,
    StatePayload, PACMAN_ID,
};

use crate::transport::{BlockingChannel, RequestClient};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Maximum absolute per-axis observation error for ghost positions.
    /// Zero disables noise (exact observation).
    pub noise: i32,
    pub seed: u64,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self { noise: 0, seed: 0 }
    }
}

/// One turn of host-engine state, in the host's native `(x, y)` coordinates.
/// Fragile flags are indexed by agent id (Pacman first, then ghosts).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostSnapshot {
    pub pacman_position: (i32, i32),
    pub ghost_positions: Vec<(i32, i32)>,
    pub food_positions: Vec<(i32, i32)>,
    pub wall_positions: Vec<(i32, i32)>,
    pub fragile_flags: Vec<f64>,
    pub legal_actions: Vec<Direction>,
    pub score: f64,
}

pub struct ClientAdapter<C: BlockingChannel> {
    client: RequestClient<C>,
    agent_id: AgentId,
    team: AgentTeam,
    kind: AgentKind,
    config: AdapterConfig,
    rng: Lcg,
    previous_action: Direction,
    previous_score: f64,
    test_mode: bool,
}

impl<C: BlockingChannel> ClientAdapter<C> {
    pub fn pacman(channel: C, kind: AgentKind, config: AdapterConfig) -> Self {
        Self::new(PACMAN_ID, AgentTeam::Pacman, channel, kind, config)
    }

    pub fn ghost(agent_id: AgentId, channel: C, kind: AgentKind, config: AdapterConfig) -> Self {
        Self::new(agent_id, AgentTeam::Ghost, channel, kind, config)
    }

    fn new(
        agent_id: AgentId,
        team: AgentTeam,
        channel: C,
        kind: AgentKind,
        config: AdapterConfig,
    ) -> Self {
        let rng = Lcg::new(config.seed);
        Self {
            client: RequestClient::new(channel),
            agent_id,
            team,
            kind,
            config,
            rng,
            previous_action: first_action(team),
            previous_score: 0.0,
            test_mode: false,
        }
    }

    pub fn agent_id(&self) -> AgentId {
        self.agent_id
    }

    pub fn enable_learn_mode(&mut self) {
        self.test_mode = false;
    }

    pub fn enable_test_mode(&mut self) {
        self.test_mode = true;
    }

    fn noise_offset(&mut self) -> i32 {
        if self.config.noise == 0 {
            0
        } else {
            self.rng.next_range_i32(-self.config.noise, self.config.noise)
        }
    }

    /// Pacman learns from the score delta; ghosts from its negation.
    fn calculate_reward(&self, current_score: f64) -> f64 {
        match self.team {
            AgentTeam::Pacman => current_score - self.previous_score,
            AgentTeam::Ghost => self.previous_score - current_score,
        }
    }

    /// Builds one turn's `State` payload: axis-swapped positions, noisy
    /// ghost observations, the reward delta, and the action actually
    /// executed on the previous turn.
    pub fn build_state_payload(&mut self, host: &HostSnapshot) -> StatePayload {
        let mut agent_positions = BTreeMap::new();
        let (pac_x, pac_y) = host.pacman_position;
        agent_positions.insert(PACMAN_ID, Pos::from_xy(pac_x, pac_y));
        for (index, (x, y)) in host.ghost_positions.iter().enumerate() {
            let exact = Pos::from_xy(*x, *y);
            let observed = Pos::new(
                exact.row + self.noise_offset(),
                exact.col + self.noise_offset(),
            );
            agent_positions.insert(index as AgentId + 1, observed);
        }

        let food_positions = host
            .food_positions
            .iter()
            .map(|(x, y)| Pos::from_xy(*x, *y))
            .collect();
        let wall_positions = host
            .wall_positions
            .iter()
            .map(|(x, y)| Pos::from_xy(*x, *y))
            .collect();
        let fragile_agents = host
            .fragile_flags
            .iter()
            .enumerate()
            .map(|(id, flag)| (id as AgentId, *flag))
            .collect();

        StatePayload {
            agent_id: self.agent_id,
            agent_positions,
            food_positions,
            fragile_agents,
            wall_positions,
            legal_actions: host.legal_actions.clone(),
            reward: self.calculate_reward(host.score),
            executed_action: self.previous_action,
            test_mode: self.test_mode,
        }
    }

    /// One game turn: relay state, block for the controller's action,
    /// return it for the host to execute.
    pub fn get_action(&mut self, host: &HostSnapshot) -> Result<Direction, MazeError> {
        let payload = self.build_state_payload(host);
        self.previous_score = host.score;
        match self.client.request(&Message::State(payload))? {
            Reply::Action { direction } => {
                self.previous_action = direction;
                Ok(direction)
            }
            other => Err(MazeError::UnexpectedReply {
                expected: "action",
                found: other.kind(),
            }),
        }
    }

    /// Binds a controller agent for this id on the remote side.
    pub fn register(&mut self) -> Result<(), MazeError> {
        let message = Message::RequestRegister {
            agent_id: self.agent_id,
            team: self.team,
            kind: self.kind,
        };
        self.expect_ack(&message)
    }

    /// Announces a fresh episode and resets per-episode tracking.
    pub fn start_game(&mut self, map_width: u32, map_height: u32) -> Result<(), MazeError> {
        self.previous_score = 0.0;
        self.previous_action = first_action(self.team);
        let message = Message::RequestGameStart {
            agent_id: self.agent_id,
            map_width,
            map_height,
        };
        self.expect_ack(&message)
    }

    pub fn initialize(&mut self) -> Result<(), MazeError> {
        let message = Message::RequestInitialization {
            agent_id: self.agent_id,
        };
        self.expect_ack(&message)
    }

    /// Fetches the trained policy for persistence.
    pub fn fetch_policy(&mut self) -> Result<PolicyTable, MazeError> {
        let message = Message::RequestPolicy {
            agent_id: self.agent_id,
        };
        match self.client.request(&message)? {
            Reply::Policy { table } => Ok(table),
            other => Err(MazeError::UnexpectedReply {
                expected: "policy",
                found: other.kind(),
            }),
        }
    }

    /// Pushes a previously saved policy into a fresh controller instance.
    pub fn push_policy(&mut self, table: PolicyTable) -> Result<(), MazeError> {
        let message = Message::Policy {
            agent_id: self.agent_id,
            table,
        };
        self.expect_ack(&message)
    }

    pub fn behavior_count(&mut self) -> Result<BTreeMap<String, u64>, MazeError> {
        let message = Message::RequestBehaviorCount {
            agent_id: self.agent_id,
        };
        match self.client.request(&message)? {
            Reply::BehaviorCount { counts } => Ok(counts),
            other => Err(MazeError::UnexpectedReply {
                expected: "behavior_count",
                found: other.kind(),
            }),
        }
    }

    fn expect_ack(&mut self, message: &Message) -> Result<(), MazeError> {
        match self.client.request(message)? {
            Reply::Ack => Ok(()),
            other => Err(MazeError::UnexpectedReply {
                expected: "ack",
                found: other.kind(),
            }),
        }
    }
}

fn first_action(team: AgentTeam) -> Direction {
    match team {
        AgentTeam::Pacman => Direction::Stop,
        AgentTeam::Ghost => Direction::North,
    }
}
