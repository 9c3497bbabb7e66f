//! Hand-coded tactical behaviors.
//!
//! Each behavior picks a target from the current state and suggests the
//! legal action whose destination cell is best for that target (greedy
//! single-step chase). A behavior with no applicable target suggests
//! nothing; the controller resolves that per its legality policy.

use maze_world_proto::{AgentId, Direction, MazeError, Pos};

use crate::state::GameState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Behavior {
    /// Move toward the nearest food pellet.
    Eat,
    /// Move away from the nearest enemy.
    Flee,
    /// Move toward the nearest fragile enemy.
    Seek,
    /// Move toward the nearest enemy.
    Pursue,
}

impl Behavior {
    /// Stable identifier used for bookkeeping and the wire policy table.
    pub fn name(self) -> &'static str {
        match self {
            Behavior::Eat => "eat",
            Behavior::Flee => "flee",
            Behavior::Seek => "seek",
            Behavior::Pursue => "pursue",
        }
    }

    pub fn from_name(name: &str) -> Option<Behavior> {
        match name {
            "eat" => Some(Behavior::Eat),
            "flee" => Some(Behavior::Flee),
            "seek" => Some(Behavior::Seek),
            "pursue" => Some(Behavior::Pursue),
            _ => None,
        }
    }

    pub fn suggest(
        self,
        state: &GameState,
        legal_actions: &[Direction],
    ) -> Result<Option<Direction>, MazeError> {
        let own = state.own_position()?;
        match self {
            Behavior::Eat => {
                let target = nearest(own, state.food_positions.iter().copied());
                Ok(target.and_then(|t| step_toward(own, t, legal_actions)))
            }
            Behavior::Flee => {
                let target = nearest(own, enemy_positions(state)?);
                Ok(target.and_then(|t| step_away(own, t, legal_actions)))
            }
            Behavior::Seek => {
                let target = nearest(own, fragile_enemy_positions(state)?);
                Ok(target.and_then(|t| step_toward(own, t, legal_actions)))
            }
            Behavior::Pursue => {
                let target = nearest(own, enemy_positions(state)?);
                Ok(target.and_then(|t| step_toward(own, t, legal_actions)))
            }
        }
    }
}

fn enemy_positions(state: &GameState) -> Result<Vec<Pos>, MazeError> {
    state
        .enemy_ids
        .iter()
        .map(|id| state.position_of(*id))
        .collect()
}

fn fragile_enemy_positions(state: &GameState) -> Result<Vec<Pos>, MazeError> {
    let mut positions = Vec::new();
    for id in &state.enemy_ids {
        if state.fragile_flag(*id)? > 0.0 {
            positions.push(state.position_of(*id)?);
        }
    }
    Ok(positions)
}

fn nearest(own: Pos, candidates: impl IntoIterator<Item = Pos>) -> Option<Pos> {
    candidates
        .into_iter()
        .min_by_key(|candidate| own.manhattan_distance(*candidate))
}

/// The legal move (Stop excluded) whose destination is nearest the target.
/// Ties break on legal-action order, so the choice is deterministic.
fn step_toward(own: Pos, target: Pos, legal_actions: &[Direction]) -> Option<Direction> {
    legal_actions
        .iter()
        .copied()
        .filter(|action| *action != Direction::Stop)
        .min_by_key(|action| action.step(own).manhattan_distance(target))
}

/// The legal move (Stop excluded) whose destination is farthest from the
/// target.
fn step_away(own: Pos, target: Pos, legal_actions: &[Direction]) -> Option<Direction> {
    legal_actions
        .iter()
        .copied()
        .filter(|action| *action != Direction::Stop)
        .max_by_key(|action| action.step(own).manhattan_distance(target))
}
