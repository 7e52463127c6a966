//! Ledger module containing account setup, move processing and reconciliation

pub mod account;
pub mod core;
pub mod moves;
pub mod reconcile;

pub use account::*;
pub use self::core::*;
pub use moves::*;
pub use reconcile::*;
