//! Scalar predictors over game state for the linear value approximation.
//!
//! The feature set is a closed enum fixed at learner construction. Proximity
//! features map a manhattan distance d to 1/(1+d), so nearer targets score
//! higher and the value stays in (0, 1]; a state with no applicable target
//! scores 0.

use maze_world_proto::{AgentId, MazeError};

use crate::state::GameState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    /// Proximity to the nearest food pellet.
    FoodProximity,
    /// Proximity to one tracked enemy.
    EnemyProximity { enemy_id: AgentId },
    /// The fragile (vulnerable) flag of one tracked agent.
    FragileAgent { agent_id: AgentId },
}

impl Feature {
    pub fn evaluate(&self, state: &GameState) -> Result<f64, MazeError> {
        match self {
            Feature::FoodProximity => {
                let own = state.own_position()?;
                Ok(state
                    .food_positions
                    .iter()
                    .map(|food| own.manhattan_distance(*food))
                    .min()
                    .map(proximity)
                    .unwrap_or(0.0))
            }
            Feature::EnemyProximity { enemy_id } => {
                let own = state.own_position()?;
                let enemy = state.position_of(*enemy_id)?;
                Ok(proximity(own.manhattan_distance(enemy)))
            }
            Feature::FragileAgent { agent_id } => state.fragile_flag(*agent_id),
        }
    }
}

fn proximity(distance: i32) -> f64 {
    1.0 / (1.0 + distance as f64)
}

/// The feature set used by the behavior-learning agents: food proximity,
/// one proximity per enemy, and the fragile flag of the agent itself, its
/// allies, and its enemies, in that order.
pub fn default_feature_set(
    agent_id: AgentId,
    ally_ids: &[AgentId],
    enemy_ids: &[AgentId],
) -> Vec<Feature> {
    let mut features = vec![Feature::FoodProximity];
    for enemy_id in enemy_ids {
        features.push(Feature::EnemyProximity {
            enemy_id: *enemy_id,
        });
    }
    for id in std::iter::once(&agent_id).chain(ally_ids).chain(enemy_ids) {
        features.push(Feature::FragileAgent { agent_id: *id });
    }
    features
}
