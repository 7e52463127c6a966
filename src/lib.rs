//! # Bank Statement Counterpart
//!
//! Reconciles bank statement lines against user-chosen "counterpart" ledger
//! lines by generating, posting and reconciling balancing moves, and undoes
//! all of it when the statement line is canceled.
//!
//! ## Features
//!
//! - **Counterpart selection**: attach open, posted, reconcilable move lines to a statement line
//! - **Automatic matching**: pick the single open line matching the unexplained amount
//! - **Move generation**: one balanced two-line move per counterpart, posted and reconciled
//! - **Teardown**: cancel removes bank links, reconciliations and moves in dependency order
//! - **Guards**: generated records cannot be deleted outside the teardown path
//! - **Storage abstraction**: database-agnostic design with trait-based storage
//!
//! ## Quick Start
//!
//! ```rust
//! use bank_statement_counterpart::{CounterpartConfig, CounterpartReconciler, MemoryStorage, RateTable};
//! use std::sync::Arc;
//!
//! let reconciler = CounterpartReconciler::new(
//!     MemoryStorage::new(),
//!     Arc::new(RateTable::new()),
//!     CounterpartConfig::default(),
//! )
//! .unwrap();
//! assert!(reconciler.config().auto_match);
//! ```

pub mod config;
pub mod ledger;
pub mod reconciliation;
pub mod statement;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::*;
pub use ledger::*;
pub use reconciliation::*;
pub use statement::*;
pub use traits::*;
pub use types::*;
pub use utils::{MemoryStorage, RateTable};
