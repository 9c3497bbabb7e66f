//! Controller-side game-state snapshot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use maze_world_proto::{AgentId, Direction, MazeError, Pos, StatePayload};

/// One turn's view of the game from a single agent's perspective.
///
/// Built fresh from each incoming `StatePayload` plus controller-side
/// context (the per-episode iteration counter and the agent's team roster);
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// The observing agent.
    pub agent_id: AgentId,
    /// Turns handled so far this episode, before this one.
    pub iteration: u64,
    pub ally_ids: Vec<AgentId>,
    pub enemy_ids: Vec<AgentId>,
    pub agent_positions: BTreeMap<AgentId, Pos>,
    pub food_positions: Vec<Pos>,
    pub fragile_agents: BTreeMap<AgentId, f64>,
    pub wall_positions: Vec<Pos>,
    pub legal_actions: Vec<Direction>,
    pub reward: f64,
    pub executed_action: Direction,
    pub test_mode: bool,
}

impl GameState {
    pub fn from_payload(
        payload: &StatePayload,
        iteration: u64,
        ally_ids: &[AgentId],
        enemy_ids: &[AgentId],
    ) -> Self {
        Self {
            agent_id: payload.agent_id,
            iteration,
            ally_ids: ally_ids.to_vec(),
            enemy_ids: enemy_ids.to_vec(),
            agent_positions: payload.agent_positions.clone(),
            food_positions: payload.food_positions.clone(),
            fragile_agents: payload.fragile_agents.clone(),
            wall_positions: payload.wall_positions.clone(),
            legal_actions: payload.legal_actions.clone(),
            reward: payload.reward,
            executed_action: payload.executed_action,
            test_mode: payload.test_mode,
        }
    }

    pub fn own_position(&self) -> Result<Pos, MazeError> {
        self.position_of(self.agent_id)
    }

    pub fn position_of(&self, agent_id: AgentId) -> Result<Pos, MazeError> {
        self.agent_positions
            .get(&agent_id)
            .copied()
            .ok_or(MazeError::MalformedState {
                detail: format!("no position for agent {agent_id}"),
            })
    }

    pub fn fragile_flag(&self, agent_id: AgentId) -> Result<f64, MazeError> {
        self.fragile_agents
            .get(&agent_id)
            .copied()
            .ok_or(MazeError::MalformedState {
                detail: format!("no fragile flag for agent {agent_id}"),
            })
    }

    pub fn has_wall(&self, pos: Pos) -> bool {
        self.wall_positions.contains(&pos)
    }
}
