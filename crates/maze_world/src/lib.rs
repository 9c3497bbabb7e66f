//! Learning core for the maze arena: game-state snapshots, hand-coded
//! tactical behaviors, feature extraction, the linear-approximation
//! Q-learner, and the controller agents that arbitrate between behaviors.

pub mod behaviors;
pub mod controller;
pub mod features;
pub mod learning;
pub mod rng;
pub mod state;

pub use behaviors::Behavior;
pub use controller::{
    BehaviorLearningAgent, ControllerAgent, EaterAgent, RandomAgent,
};
pub use features::{default_feature_set, Feature};
pub use learning::{LearningConfig, LinearQLearner};
pub use rng::{derive_seed, splitmix64, Lcg};
pub use state::GameState;
