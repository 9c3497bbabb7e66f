//! Q-learning with linear function approximation.
//!
//! Q(s, b) = Σ weight[b][i] · feature_i(s). Weights update by the
//! semi-gradient temporal-difference rule; no clamping is applied, so
//! divergence under an unlucky feature scaling is possible and accepted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use maze_world_proto::{MazeError, PolicyTable};

use crate::behaviors::Behavior;
use crate::features::Feature;
use crate::rng::Lcg;
use crate::state::GameState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningConfig {
    pub learning_rate: f64,
    pub discount_factor: f64,
    pub exploration_rate: f64,
    /// Annealing constant: per-turn learning rate is K / (K + iteration).
    pub annealing_k: f64,
    pub seed: u64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            discount_factor: 0.9,
            exploration_rate: 0.1,
            annealing_k: 1.0,
            seed: 0,
        }
    }
}

pub struct LinearQLearner {
    behaviors: Vec<Behavior>,
    features: Vec<Feature>,
    weights: BTreeMap<Behavior, Vec<f64>>,
    pub learning_rate: f64,
    pub discount_factor: f64,
    pub exploration_rate: f64,
    rng: Lcg,
}

impl LinearQLearner {
    /// Both sets are fixed for the learner's lifetime; every weight starts
    /// at 0.0.
    pub fn new(behaviors: Vec<Behavior>, features: Vec<Feature>, config: &LearningConfig) -> Self {
        let weights = behaviors
            .iter()
            .map(|behavior| (*behavior, vec![0.0; features.len()]))
            .collect();
        Self {
            behaviors,
            features,
            weights,
            learning_rate: config.learning_rate,
            discount_factor: config.discount_factor,
            exploration_rate: config.exploration_rate,
            rng: Lcg::new(config.seed),
        }
    }

    pub fn behaviors(&self) -> &[Behavior] {
        &self.behaviors
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    fn feature_values(&self, state: &GameState) -> Result<Vec<f64>, MazeError> {
        self.features
            .iter()
            .map(|feature| feature.evaluate(state))
            .collect()
    }

    fn q_from_values(&self, values: &[f64], behavior: Behavior) -> f64 {
        let row = &self.weights[&behavior];
        row.iter().zip(values).map(|(w, f)| w * f).sum()
    }

    pub fn q_value(&self, state: &GameState, behavior: Behavior) -> Result<f64, MazeError> {
        let values = self.feature_values(state)?;
        Ok(self.q_from_values(&values, behavior))
    }

    /// Greedy argmax in behavior order; the first maximum wins, so the
    /// choice is deterministic for fixed weights.
    fn greedy_behavior(&self, values: &[f64]) -> Behavior {
        let mut best = self.behaviors[0];
        let mut best_q = self.q_from_values(values, best);
        for behavior in &self.behaviors[1..] {
            let q = self.q_from_values(values, *behavior);
            if q > best_q {
                best = *behavior;
                best_q = q;
            }
        }
        best
    }

    fn max_q(&self, values: &[f64]) -> f64 {
        self.behaviors
            .iter()
            .map(|behavior| self.q_from_values(values, *behavior))
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Epsilon-greedy behavior selection.
    pub fn act(&mut self, state: &GameState) -> Result<Behavior, MazeError> {
        let values = self.feature_values(state)?;
        if self.exploration_rate > 0.0 && self.rng.next_f64() < self.exploration_rate {
            let index = self.rng.next_index(self.behaviors.len());
            return Ok(self.behaviors[index]);
        }
        Ok(self.greedy_behavior(&values))
    }

    /// Semi-gradient TD update toward `reward + γ·max_b' Q(s, b')`.
    pub fn learn(
        &mut self,
        state: &GameState,
        behavior: Behavior,
        reward: f64,
    ) -> Result<(), MazeError> {
        let values = self.feature_values(state)?;
        let predicted = self.q_from_values(&values, behavior);
        let delta = reward + self.discount_factor * self.max_q(&values) - predicted;
        let row = self
            .weights
            .get_mut(&behavior)
            .ok_or(MazeError::UnknownBehavior {
                behavior: behavior.name().to_string(),
            })?;
        for (weight, value) in row.iter_mut().zip(&values) {
            *weight += self.learning_rate * delta * value;
        }
        Ok(())
    }

    /// Exports the full weight table under the canonical behavior-name →
    /// feature-index → weight layout.
    pub fn get_weights(&self) -> PolicyTable {
        let mut table = PolicyTable::new();
        for (behavior, row) in &self.weights {
            table.insert(behavior.name(), row.clone());
        }
        table
    }

    /// Imports a weight table exported by `get_weights`. The table must
    /// cover exactly this learner's behaviors with one weight per feature.
    pub fn set_weights(&mut self, table: &PolicyTable) -> Result<(), MazeError> {
        if table.weights.len() != self.behaviors.len() {
            return Err(MazeError::PolicyShapeMismatch {
                reason: format!(
                    "table has {} behaviors, learner has {}",
                    table.weights.len(),
                    self.behaviors.len()
                ),
            });
        }
        let mut imported = BTreeMap::new();
        for (name, row) in &table.weights {
            let behavior =
                Behavior::from_name(name).ok_or_else(|| MazeError::UnknownBehavior {
                    behavior: name.clone(),
                })?;
            if !self.behaviors.contains(&behavior) {
                return Err(MazeError::UnknownBehavior {
                    behavior: name.clone(),
                });
            }
            if row.len() != self.features.len() {
                return Err(MazeError::PolicyShapeMismatch {
                    reason: format!(
                        "behavior {name} has {} weights, learner has {} features",
                        row.len(),
                        self.features.len()
                    ),
                });
            }
            imported.insert(behavior, row.clone());
        }
        self.weights = imported;
        Ok(())
    }
}
