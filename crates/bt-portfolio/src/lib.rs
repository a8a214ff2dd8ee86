//! bt-portfolio
//!
//! Account cash/equity accounting (C3) and position lifecycle tracking (C4).
//! Both stores are plain owned collections: a backtest run is
//! single-threaded, so there is no synchronization here, only bookkeeping.

mod account;
mod position;

pub use account::{Account, AccountError, AccountStore};
pub use position::{Position, PositionError, PositionStatus, PositionStore};
