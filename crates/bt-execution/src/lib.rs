//! bt-execution
//!
//! Order execution (C6): fetch the account, price the order off today's
//! close, run it through C5 validation, then mutate the account/position
//! stores on success. A provider fault is an engine fault and propagates;
//! a validation or funding failure becomes a non-fatal `OrderResult`.

mod commission;
mod engine;

pub use bt_risk::{RejectReason, Side};
pub use commission::{CommissionModel, FlatFee};
pub use engine::{execute, Order, OrderResult};
