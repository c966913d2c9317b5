//! Health classification and snapshot trend detection.

pub mod classifier;
pub mod trends;

pub use classifier::classify;
pub use trends::{
    detect_transition, portfolio_trend, transitions_in_sequence, windowed_trend, Transition,
    TrendLabel,
};
