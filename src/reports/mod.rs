//! Read-only report generators: churn-risk ranking and expansion scoring.
//! Both reuse the classifier's output plus raw signals; neither mutates
//! account state (the expansion job persists opportunities separately).

pub mod churn;
pub mod expansion;

pub use churn::{rank_accounts, ChurnInput, ChurnRiskAccount};
pub use expansion::{score_expansion, ExpansionCandidate, SignalStrength};
