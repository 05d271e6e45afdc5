//! FIFO lot queue.
//!
//! A [`LotQueue`] holds the lots of one stock-keeping item in insertion
//! order, which is also consumption order: the oldest lot is consumed first.
//! Every engine that walks lots FIFO (sale costing, purchase unwinding,
//! transfers, subtract adjustments) does so through [`LotQueue::consume`],
//! so the walk-and-splice logic exists exactly once.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use rust_decimal::Decimal;

use crate::{CostLine, Lot, LotOrigin, PurchaseId};

/// Result of a FIFO consumption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consumption {
    /// The segments actually removed, in consumption order.
    pub lines: Vec<CostLine>,
    /// Requested units minus units actually removed; 0 when fully satisfied.
    pub shortfall: u64,
}

impl Consumption {
    /// Units actually removed from the queue.
    #[must_use]
    pub fn consumed_units(&self) -> u64 {
        self.lines.iter().map(|line| line.units).sum()
    }

    /// Check whether the full requested quantity was available.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.shortfall == 0
    }
}

/// Ordered sequence of lots for one item, oldest first.
///
/// # Examples
///
/// ```
/// use stockbook_core::{Lot, LotQueue, PurchaseId};
/// use rust_decimal_macros::dec;
///
/// let mut queue = LotQueue::new();
/// queue.append(Lot::purchased(PurchaseId(1), dec!(1), 5));
/// queue.append(Lot::purchased(PurchaseId(2), dec!(2), 5));
///
/// let taken = queue.consume(7);
/// assert_eq!(taken.shortfall, 0);
/// assert_eq!(taken.lines.len(), 2);
/// assert_eq!(taken.lines[1].units, 2);
/// assert_eq!(queue.total_units(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotQueue {
    lots: VecDeque<Lot>,
}

impl LotQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterate over the lots, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Lot> {
        self.lots.iter()
    }

    /// Check if the queue holds no lots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lots.is_empty()
    }

    /// Number of lots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lots.len()
    }

    /// Total units across all lots.
    #[must_use]
    pub fn total_units(&self) -> u64 {
        self.lots.iter().map(|lot| lot.quantity).sum()
    }

    /// Total cost basis across all lots.
    #[must_use]
    pub fn book_value(&self) -> Decimal {
        self.lots.iter().map(Lot::book_value).sum()
    }

    /// Push a lot at the tail. Empty lots are not appended.
    pub fn append(&mut self, lot: Lot) {
        if !lot.is_empty() {
            self.lots.push_back(lot);
        }
    }

    /// Push a lot at the head, making it the next to be consumed.
    ///
    /// Used when an amended lot has to be reinserted: a fully consumed lot is
    /// by FIFO order older than every surviving lot.
    pub fn push_front(&mut self, lot: Lot) {
        if !lot.is_empty() {
            self.lots.push_front(lot);
        }
    }

    /// Remove up to `quantity` units FIFO.
    ///
    /// Pops a lot entirely when its full quantity is used, otherwise
    /// decrements it in place. Never removes more than available and never
    /// leaves a zero-quantity lot behind.
    pub fn consume(&mut self, quantity: u64) -> Consumption {
        let mut remaining = quantity;
        let mut lines = Vec::new();

        while remaining > 0 {
            let Some(front) = self.lots.front_mut() else {
                break;
            };
            if front.quantity > remaining {
                front.quantity -= remaining;
                lines.push(CostLine::new(front.origin, remaining, front.unit_cost));
                remaining = 0;
            } else {
                remaining -= front.quantity;
                lines.push(CostLine::new(front.origin, front.quantity, front.unit_cost));
                self.lots.pop_front();
            }
        }

        Consumption {
            lines,
            shortfall: remaining,
        }
    }

    /// Return units to the queue.
    ///
    /// When the origin is a purchase whose lot is still in the queue, the
    /// units are merged into that lot (its recorded unit cost wins);
    /// otherwise a new lot is appended at the tail.
    pub fn return_units(&mut self, origin: LotOrigin, unit_cost: Decimal, units: u64) {
        if units == 0 {
            return;
        }
        if let Some(id) = origin.purchase_id() {
            if let Some(lot) = self.lot_mut(id) {
                lot.quantity += units;
                return;
            }
        }
        self.append(Lot::new(origin, unit_cost, units));
    }

    /// Units currently held for `purchase`, or `None` if no lot of that
    /// purchase survives.
    #[must_use]
    pub fn quantity_of(&self, purchase: PurchaseId) -> Option<u64> {
        self.lots
            .iter()
            .find(|lot| lot.origin.purchase_id() == Some(purchase))
            .map(|lot| lot.quantity)
    }

    /// Update the lot of `purchase` in place. A zero quantity removes the
    /// lot. Returns `false` when no lot of that purchase is present.
    pub fn set_lot(&mut self, purchase: PurchaseId, unit_cost: Decimal, quantity: u64) -> bool {
        let Some(index) = self.position_of(purchase) else {
            return false;
        };
        if quantity == 0 {
            self.lots.remove(index);
        } else {
            let lot = &mut self.lots[index];
            lot.unit_cost = unit_cost;
            lot.quantity = quantity;
        }
        true
    }

    /// Remove and return the lot of `purchase`, if present.
    pub fn remove_lot(&mut self, purchase: PurchaseId) -> Option<Lot> {
        let index = self.position_of(purchase)?;
        self.lots.remove(index)
    }

    fn position_of(&self, purchase: PurchaseId) -> Option<usize> {
        self.lots
            .iter()
            .position(|lot| lot.origin.purchase_id() == Some(purchase))
    }

    fn lot_mut(&mut self, purchase: PurchaseId) -> Option<&mut Lot> {
        self.lots
            .iter_mut()
            .find(|lot| lot.origin.purchase_id() == Some(purchase))
    }
}

impl fmt::Display for LotQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.lots.is_empty() {
            return write!(f, "(empty)");
        }
        for (i, lot) in self.lots.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{lot}")?;
        }
        Ok(())
    }
}

impl FromIterator<Lot> for LotQueue {
    fn from_iter<I: IntoIterator<Item = Lot>>(iter: I) -> Self {
        let mut queue = Self::new();
        for lot in iter {
            queue.append(lot);
        }
        queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn queue(lots: &[(u64, Decimal, u64)]) -> LotQueue {
        lots.iter()
            .map(|&(id, cost, qty)| Lot::purchased(PurchaseId(id), cost, qty))
            .collect()
    }

    #[test]
    fn consume_fifo_order() {
        let mut q = queue(&[(1, dec!(1), 5), (2, dec!(2), 5)]);
        let taken = q.consume(7);

        assert_eq!(taken.shortfall, 0);
        assert_eq!(
            taken.lines,
            vec![
                CostLine::new(LotOrigin::Purchased(PurchaseId(1)), 5, dec!(1)),
                CostLine::new(LotOrigin::Purchased(PurchaseId(2)), 2, dec!(2)),
            ]
        );
        assert_eq!(q.total_units(), 3);
        assert_eq!(q.quantity_of(PurchaseId(1)), None);
        assert_eq!(q.quantity_of(PurchaseId(2)), Some(3));
    }

    #[test]
    fn consume_reports_shortfall() {
        let mut q = queue(&[(1, dec!(1), 4)]);
        let taken = q.consume(10);
        assert_eq!(taken.shortfall, 6);
        assert_eq!(taken.consumed_units(), 4);
        assert!(q.is_empty());
    }

    #[test]
    fn consume_from_empty() {
        let mut q = LotQueue::new();
        let taken = q.consume(3);
        assert!(taken.lines.is_empty());
        assert_eq!(taken.shortfall, 3);
    }

    #[test]
    fn append_ignores_empty_lots() {
        let mut q = LotQueue::new();
        q.append(Lot::opening(dec!(1), 0));
        assert!(q.is_empty());
    }

    #[test]
    fn return_units_merges_into_surviving_lot() {
        let mut q = queue(&[(1, dec!(2), 3)]);
        q.return_units(LotOrigin::Purchased(PurchaseId(1)), dec!(9), 4);
        // Merged into the existing lot; the recorded cost wins.
        assert_eq!(q.len(), 1);
        assert_eq!(q.quantity_of(PurchaseId(1)), Some(7));
        assert_eq!(q.iter().next().unwrap().unit_cost, dec!(2));
    }

    #[test]
    fn return_units_appends_when_lot_gone() {
        let mut q = LotQueue::new();
        q.return_units(LotOrigin::Purchased(PurchaseId(1)), dec!(2), 4);
        q.return_units(LotOrigin::Returned, dec!(3), 2);
        assert_eq!(q.len(), 2);
        assert_eq!(q.total_units(), 6);
    }

    #[test]
    fn set_lot_updates_in_place() {
        let mut q = queue(&[(1, dec!(1), 5), (2, dec!(2), 5)]);
        assert!(q.set_lot(PurchaseId(1), dec!(4), 8));
        assert_eq!(q.quantity_of(PurchaseId(1)), Some(8));
        // Zero quantity removes the lot.
        assert!(q.set_lot(PurchaseId(2), dec!(2), 0));
        assert_eq!(q.quantity_of(PurchaseId(2)), None);
        assert!(!q.set_lot(PurchaseId(3), dec!(1), 1));
    }

    #[test]
    fn push_front_consumed_first() {
        let mut q = queue(&[(2, dec!(2), 5)]);
        q.push_front(Lot::purchased(PurchaseId(1), dec!(1), 3));
        let taken = q.consume(4);
        assert_eq!(taken.lines[0].origin, LotOrigin::Purchased(PurchaseId(1)));
        assert_eq!(taken.lines[0].units, 3);
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", LotQueue::new()), "(empty)");
        let q = queue(&[(1, dec!(2), 3)]);
        assert_eq!(format!("{q}"), "3 @ 2 (purchase:1)");
    }
}
