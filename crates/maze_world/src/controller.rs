//! Controller-side agents.
//!
//! A controller agent owns the per-episode decision loop for one game
//! agent: it receives a state snapshot, the previous transition's reward,
//! and the legal actions, and returns exactly one action. The
//! behavior-learning agent arbitrates between tactical behaviors with the
//! linear Q-learner; the random and eater agents are non-learning
//! baselines.

use std::collections::BTreeMap;

use maze_world_proto::{AgentId, AgentTeam, Direction, MazeError, PolicyTable};

use crate::behaviors::Behavior;
use crate::features::{default_feature_set, Feature};
use crate::learning::{LearningConfig, LinearQLearner};
use crate::rng::Lcg;
use crate::state::GameState;

pub trait ControllerAgent {
    fn agent_id(&self) -> AgentId;

    /// Returns an action to execute. The returned action is always in
    /// `legal_actions` when that list is non-empty, and `Stop` otherwise.
    fn choose_action(
        &mut self,
        state: &GameState,
        last_action: Direction,
        reward: f64,
        legal_actions: &[Direction],
        explore: bool,
    ) -> Result<Direction, MazeError>;

    /// Resets per-episode bookkeeping at an episode boundary.
    fn start_episode(&mut self) {}

    fn get_policy(&self) -> Option<PolicyTable> {
        None
    }

    fn set_policy(&mut self, _table: &PolicyTable) -> Result<(), MazeError> {
        Err(MazeError::PolicyUnavailable {
            agent_id: self.agent_id(),
        })
    }

    fn behavior_count(&self) -> BTreeMap<String, u64> {
        BTreeMap::new()
    }

    fn reset_behavior_count(&mut self) {}
}

/// Applies the legality resolution policy to a behavior's suggestion.
fn resolve_action(
    suggested: Option<Direction>,
    legal_actions: &[Direction],
    rng: &mut Lcg,
) -> Direction {
    match suggested {
        Some(action) if legal_actions.contains(&action) => action,
        _ if legal_actions.is_empty() => Direction::Stop,
        _ => legal_actions[rng.next_index(legal_actions.len())],
    }
}

// ============================================================================
// Non-learning baselines
// ============================================================================

/// Picks a uniformly random legal action each turn.
pub struct RandomAgent {
    agent_id: AgentId,
    rng: Lcg,
}

impl RandomAgent {
    pub fn new(agent_id: AgentId, seed: u64) -> Self {
        Self {
            agent_id,
            rng: Lcg::new(seed),
        }
    }
}

impl ControllerAgent for RandomAgent {
    fn agent_id(&self) -> AgentId {
        self.agent_id
    }

    fn choose_action(
        &mut self,
        _state: &GameState,
        _last_action: Direction,
        _reward: f64,
        legal_actions: &[Direction],
        _explore: bool,
    ) -> Result<Direction, MazeError> {
        Ok(resolve_action(None, legal_actions, &mut self.rng))
    }
}

/// Always runs the eat behavior; no learning.
pub struct EaterAgent {
    agent_id: AgentId,
    rng: Lcg,
}

impl EaterAgent {
    pub fn new(agent_id: AgentId, seed: u64) -> Self {
        Self {
            agent_id,
            rng: Lcg::new(seed),
        }
    }
}

impl ControllerAgent for EaterAgent {
    fn agent_id(&self) -> AgentId {
        self.agent_id
    }

    fn choose_action(
        &mut self,
        state: &GameState,
        _last_action: Direction,
        _reward: f64,
        legal_actions: &[Direction],
        _explore: bool,
    ) -> Result<Direction, MazeError> {
        let suggested = Behavior::Eat.suggest(state, legal_actions)?;
        Ok(resolve_action(suggested, legal_actions, &mut self.rng))
    }
}

// ============================================================================
// Behavior-learning agent
// ============================================================================

/// Arbitrates between tactical behaviors with a linear Q-learner.
///
/// Two modes: Learn (default) updates weights and explores; Test forces
/// pure exploitation and suppresses updates. The per-turn learning rate
/// anneals as K / (K + iteration) while learning.
pub struct BehaviorLearningAgent {
    agent_id: AgentId,
    behaviors: Vec<Behavior>,
    learner: LinearQLearner,
    previous_behavior: Behavior,
    behavior_count: BTreeMap<Behavior, u64>,
    test_mode: bool,
    exploration_rate: f64,
    annealing_k: f64,
    rng: Lcg,
}

impl BehaviorLearningAgent {
    /// Pacman arbitrates over eat, flee, seek, and pursue.
    pub fn pacman(
        agent_id: AgentId,
        ally_ids: &[AgentId],
        enemy_ids: &[AgentId],
        config: &LearningConfig,
    ) -> Self {
        let behaviors = vec![
            Behavior::Eat,
            Behavior::Flee,
            Behavior::Seek,
            Behavior::Pursue,
        ];
        let features = default_feature_set(agent_id, ally_ids, enemy_ids);
        Self::with_behaviors(agent_id, behaviors, features, config)
    }

    /// Ghosts arbitrate over flee, seek, and pursue; they never eat.
    pub fn ghost(
        agent_id: AgentId,
        ally_ids: &[AgentId],
        enemy_ids: &[AgentId],
        config: &LearningConfig,
    ) -> Self {
        let behaviors = vec![Behavior::Flee, Behavior::Seek, Behavior::Pursue];
        let features = default_feature_set(agent_id, ally_ids, enemy_ids);
        Self::with_behaviors(agent_id, behaviors, features, config)
    }

    pub fn for_team(
        team: AgentTeam,
        agent_id: AgentId,
        ally_ids: &[AgentId],
        enemy_ids: &[AgentId],
        config: &LearningConfig,
    ) -> Self {
        match team {
            AgentTeam::Pacman => Self::pacman(agent_id, ally_ids, enemy_ids, config),
            AgentTeam::Ghost => Self::ghost(agent_id, ally_ids, enemy_ids, config),
        }
    }

    fn with_behaviors(
        agent_id: AgentId,
        behaviors: Vec<Behavior>,
        features: Vec<Feature>,
        config: &LearningConfig,
    ) -> Self {
        let learner = LinearQLearner::new(behaviors.clone(), features, config);
        let behavior_count = behaviors.iter().map(|b| (*b, 0u64)).collect();
        let previous_behavior = behaviors[0];
        Self {
            agent_id,
            behaviors,
            learner,
            previous_behavior,
            behavior_count,
            test_mode: false,
            exploration_rate: config.exploration_rate,
            annealing_k: config.annealing_k,
            rng: Lcg::new(config.seed.wrapping_add(1)),
        }
    }

    pub fn test_mode(&self) -> bool {
        self.test_mode
    }

    pub fn learning_rate(&self) -> f64 {
        self.learner.learning_rate
    }

    /// Idempotent; restores the configured exploration rate and re-enables
    /// weight updates.
    pub fn enable_learn_mode(&mut self) {
        self.test_mode = false;
        self.learner.exploration_rate = self.exploration_rate;
    }

    /// Idempotent; forces pure exploitation and suppresses weight updates.
    pub fn enable_test_mode(&mut self) {
        self.test_mode = true;
        self.learner.exploration_rate = 0.0;
    }
}

impl ControllerAgent for BehaviorLearningAgent {
    fn agent_id(&self) -> AgentId {
        self.agent_id
    }

    fn choose_action(
        &mut self,
        state: &GameState,
        _last_action: Direction,
        reward: f64,
        legal_actions: &[Direction],
        explore: bool,
    ) -> Result<Direction, MazeError> {
        if explore {
            self.enable_learn_mode();
        } else {
            self.enable_test_mode();
        }

        if !self.test_mode {
            self.learner.learning_rate =
                self.annealing_k / (self.annealing_k + state.iteration as f64);
            self.learner.learn(state, self.previous_behavior, reward)?;
        }

        let behavior = self.learner.act(state)?;
        self.previous_behavior = behavior;
        *self.behavior_count.entry(behavior).or_insert(0) += 1;

        let suggested = behavior.suggest(state, legal_actions)?;
        Ok(resolve_action(suggested, legal_actions, &mut self.rng))
    }

    fn start_episode(&mut self) {
        self.previous_behavior = self.behaviors[0];
        self.reset_behavior_count();
    }

    fn get_policy(&self) -> Option<PolicyTable> {
        Some(self.learner.get_weights())
    }

    fn set_policy(&mut self, table: &PolicyTable) -> Result<(), MazeError> {
        self.learner.set_weights(table)
    }

    fn behavior_count(&self) -> BTreeMap<String, u64> {
        self.behavior_count
            .iter()
            .map(|(behavior, count)| (behavior.name().to_string(), *count))
            .collect()
    }

    fn reset_behavior_count(&mut self) {
        for count in self.behavior_count.values_mut() {
            *count = 0;
        }
    }
}
