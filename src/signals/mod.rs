// =============================================================================
// Signals Module
// =============================================================================
//
// - Stateless crossover classifier over a (prev, curr) indicator pair
// - Caller-side cooldown that keeps one crossover from firing repeatedly

pub mod classifier;
pub mod cooldown;

pub use classifier::{classify, last_pair, OscillatorSnapshot};
pub use cooldown::SignalCooldown;
