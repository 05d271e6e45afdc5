//! Per-item stock state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use rust_decimal::Decimal;

use crate::{Lot, LotQueue};

/// The stock total does not agree with the lot queue.
///
/// This is a defect, never a recoverable condition: the unit of work that
/// detects it must abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("stock total {total_stock} does not match queued units {queued}")]
pub struct ConservationError {
    /// The item's recorded stock total.
    pub total_stock: i64,
    /// Units actually held in the lot queue.
    pub queued: u64,
}

/// One item's mutable stock state: the running total and its lot queue.
///
/// `total_stock` may transiently go negative, representing oversold inventory
/// awaiting reconciling purchases; in that state the queue is empty and the
/// shortfall lives on the pending sale cost records instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemState {
    /// Units owned. Negative means oversold.
    pub total_stock: i64,
    /// The purchase lots backing the stock, oldest first.
    pub queue: LotQueue,
}

impl ItemState {
    /// Create an item with no stock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an item seeded with opening stock at the given unit cost.
    ///
    /// The opening units are entered as a regular lot so the conservation
    /// invariant holds from the start.
    #[must_use]
    pub fn with_opening_stock(quantity: u64, unit_cost: Decimal) -> Self {
        let mut state = Self::new();
        state.total_stock = quantity as i64;
        state.queue.append(Lot::opening(unit_cost, quantity));
        state
    }

    /// Check whether the item is currently oversold.
    #[must_use]
    pub const fn is_oversold(&self) -> bool {
        self.total_stock < 0
    }

    /// Units sold beyond recorded stock; 0 when not oversold.
    #[must_use]
    pub const fn oversold_units(&self) -> u64 {
        if self.total_stock < 0 {
            self.total_stock.unsigned_abs()
        } else {
            0
        }
    }

    /// Verify quantity conservation: `sum(lot.quantity) == total_stock`
    /// whenever `total_stock >= 0`. An oversold item must have an empty
    /// queue.
    pub fn check_conservation(&self) -> Result<(), ConservationError> {
        let queued = self.queue.total_units();
        let consistent = if self.total_stock >= 0 {
            queued == self.total_stock as u64
        } else {
            queued == 0
        };
        if consistent {
            Ok(())
        } else {
            Err(ConservationError {
                total_stock: self.total_stock,
                queued,
            })
        }
    }
}
