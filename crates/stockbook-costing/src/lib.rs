//! FIFO costing and reconciliation engines.
//!
//! This crate provides the pure computations behind every stockbook business
//! event:
//!
//! - Sale costing ([`cost_sale`]): FIFO-consume a sale's units and produce a
//!   [`SaleCostRecord`](stockbook_core::SaleCostRecord), with profit deferred
//!   when stock runs short
//! - Reconciliation ([`reconcile`]): absorb new supply into pending sales,
//!   unwind an amended or deleted purchase lot, re-source already-sold units
//!   and rebuild the affected cost records
//! - Transfers ([`transfer()`]): move lots FIFO between two independent
//!   ledgers
//! - Manual adjustments ([`adjust()`]): synthetic purchases and uncosted
//!   subtractions
//!
//! Every function here operates on owned, in-memory state
//! ([`ItemState`](stockbook_core::ItemState) and slices of records) and
//! performs no I/O; atomicity and per-item serialization are the caller's
//! concern.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod adjust;
pub mod reconcile;
pub mod sale;
pub mod transfer;

pub use adjust::{adjust, Adjustment};
pub use reconcile::{
    absorb_new_supply, reassign_cost_lines, substitute_price, unwind_lot, unwind_sale,
    LotAmendment, LotTerms, LotUnwind,
};
pub use sale::cost_sale;
pub use transfer::transfer;

use thiserror::Error;

/// Error produced by an engine operation.
///
/// Engine errors are local and non-retryable: the surrounding unit of work
/// must abort without persisting any partial result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CostingError {
    /// A subtract adjustment or transfer requested more units than are on
    /// hand. Sales are exempt: overselling is permitted and tracked as
    /// deferred profit.
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock {
        /// Units requested.
        requested: u64,
        /// Units currently on hand.
        available: u64,
    },
}
