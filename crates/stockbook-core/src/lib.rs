//! Core types for stockbook
//!
//! This crate provides the fundamental types used throughout the stockbook
//! project:
//!
//! - [`Lot`] - A batch of stock at a single unit cost, with [`LotOrigin`]
//! - [`LotQueue`] - The FIFO queue of lots backing one item's stock
//! - [`CostLine`] - One `{lot, units, unit cost}` consumption segment
//! - [`SaleCostRecord`] - The costing result for one sale line
//! - [`ItemState`] - An item's stock total and lot queue
//!
//! # Example
//!
//! ```
//! use stockbook_core::{ItemState, Lot, PurchaseId};
//! use rust_decimal_macros::dec;
//!
//! let mut item = ItemState::new();
//! item.total_stock = 10;
//! item.queue.append(Lot::purchased(PurchaseId(1), dec!(2.00), 10));
//!
//! // Sell 4 units FIFO
//! let taken = item.queue.consume(4);
//! item.total_stock -= 4;
//!
//! assert_eq!(taken.shortfall, 0);
//! assert_eq!(taken.lines[0].unit_cost, dec!(2.00));
//! item.check_conservation().unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod item;
pub mod lot;
pub mod queue;
pub mod record;

pub use item::{ConservationError, ItemState};
pub use lot::{CompanyId, ItemId, Lot, LotOrigin, PurchaseId, SaleId};
pub use queue::{Consumption, LotQueue};
pub use record::{CostLine, SaleCostRecord};

// Re-export the decimal type used for all money values
pub use rust_decimal::Decimal;
