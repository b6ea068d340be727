//! Auxiliary signal estimators
//!
//! Each estimator is a pure function of a normalized overlay (plus tier
//! thresholds for the leading indicators). They run independently of the
//! rug-risk estimator and feed the confidence aggregator.

pub mod breakout;
pub mod entry_zone;
pub mod leading;
pub mod liquidity_trap;

pub use breakout::{Breakout, BreakoutTrigger};
pub use entry_zone::{EntryZone, Zone};
pub use leading::LeadingIndicators;
pub use liquidity_trap::{LiquidityTrap, TrapSeverity, RATIO_SENTINEL};
