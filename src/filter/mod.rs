//! Signal estimation module
//!
//! Pure estimators over a normalized overlay plus the small shared stores
//! they read from (wallet convergence, pool history, social velocity).

pub mod cache;
pub mod scoring;
pub mod signals;
pub mod smart_money;
pub mod velocity;

pub use cache::{pool_key, PoolDelta, PoolHistoryCache, PoolSnapshot};
pub use scoring::{aggregate, Aggregate, Signals};
pub use signals::{Breakout, EntryZone, LeadingIndicators, LiquidityTrap, TrapSeverity, Zone};
pub use smart_money::{
    ConvergenceReading, ConvergenceState, ConvergenceStatus, ConvergenceTracker, WalletTier,
};
pub use velocity::{VelocityStore, VelocityStoreConfig, VelocityTracker};
