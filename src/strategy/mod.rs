//! Decision Strategy
//!
//! ## Estimation
//! - `rug_risk` - Additive rug-risk heuristic with hard-fail and crash flags
//!
//! ## Decision
//! - `tiers` - Per-tier threshold records
//! - `engine` - Tier-aware state machine (WAIT / ARM / READY / ENTER / RUG_WARNING)
//! - `evaluator` - Stateful facade wiring convergence, pool history and velocity into the engine

// Shared types
pub mod types;

pub mod rug_risk;
pub mod tiers;

pub mod engine;
pub mod evaluator;

// Re-exports
pub use engine::{decide_normalized, evaluate, DecisionEngine};
pub use evaluator::{Evaluator, PairDecision};
pub use rug_risk::{compute_rug_risk, RiskLevel, RugReading, RugRiskResult};
pub use tiers::{Tier, TierTable, TierThresholds};
pub use types::{Action, Decision, DecisionSignals};
