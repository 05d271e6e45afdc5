//! Sale cost records.
//!
//! A [`SaleCostRecord`] is the costing result for one sale line (one item
//! within one sale transaction): the lots consumed to cost it, the units
//! still unmatched, and the realized profit once every unit has a cost basis.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::{LotOrigin, PurchaseId, SaleId};

/// One consumption segment: `units` taken from a lot at `unit_cost`.
///
/// Cost lines appear in consumption order inside a [`SaleCostRecord`] and in
/// transfer manifests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostLine {
    /// Origin of the lot the units were taken from.
    pub origin: LotOrigin,
    /// Units taken.
    pub units: u64,
    /// Cost per unit at the time of consumption.
    pub unit_cost: Decimal,
}

impl CostLine {
    /// Create a cost line.
    #[must_use]
    pub const fn new(origin: LotOrigin, units: u64, unit_cost: Decimal) -> Self {
        Self {
            origin,
            units,
            unit_cost,
        }
    }

    /// Total cost of this line.
    #[must_use]
    pub fn total_cost(&self) -> Decimal {
        Decimal::from(self.units) * self.unit_cost
    }
}

impl fmt::Display for CostLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {} ({})", self.units, self.unit_cost, self.origin)
    }
}

/// The costing result for one sale line.
///
/// Created when the sale is recorded; mutated in place by reconciliation when
/// new supply arrives (reducing [`units_pending_cost`](Self::units_pending_cost))
/// or when an amended purchase forces re-costing (rebuilding
/// [`cost_lines`](Self::cost_lines)); deleted when its owning sale is deleted.
///
/// `total_profit` is all-or-nothing: it is `Some` exactly when every sold
/// unit has been matched to a lot. Profit is never reported on a partial
/// cost basis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleCostRecord {
    /// The owning sale transaction.
    pub sale_id: SaleId,
    /// Units sold by this line.
    pub units_sold: u64,
    /// Selling price per unit.
    pub selling_price_per_unit: Decimal,
    /// Lots consumed to cost this sale, in consumption order.
    pub cost_lines: Vec<CostLine>,
    /// Purchase ids referenced by `cost_lines`. Kept denormalized so
    /// reconciliation can find "which sales touched purchase X" without
    /// walking every line.
    pub consumed_purchases: BTreeSet<PurchaseId>,
    /// Units sold but not yet matched to any lot.
    pub units_pending_cost: u64,
    /// Realized profit, present iff `units_pending_cost == 0`.
    pub total_profit: Option<Decimal>,
}

impl SaleCostRecord {
    /// Build a record from the consumption of a sale.
    ///
    /// `cost_lines` are the segments actually consumed and `pending` is the
    /// shortfall. Profit is computed immediately when nothing is pending.
    #[must_use]
    pub fn new(
        sale_id: SaleId,
        units_sold: u64,
        selling_price_per_unit: Decimal,
        cost_lines: Vec<CostLine>,
        pending: u64,
    ) -> Self {
        let consumed_purchases = cost_lines
            .iter()
            .filter_map(|line| line.origin.purchase_id())
            .collect();
        let mut record = Self {
            sale_id,
            units_sold,
            selling_price_per_unit,
            cost_lines,
            consumed_purchases,
            units_pending_cost: pending,
            total_profit: None,
        };
        record.recompute_profit();
        record
    }

    /// Check whether any sold units still lack a cost basis.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.units_pending_cost > 0
    }

    /// Units already matched to lots.
    #[must_use]
    pub fn costed_units(&self) -> u64 {
        self.cost_lines.iter().map(|line| line.units).sum()
    }

    /// Total cost of goods sold across all cost lines.
    #[must_use]
    pub fn total_cost(&self) -> Decimal {
        self.cost_lines.iter().map(CostLine::total_cost).sum()
    }

    /// Recompute `total_profit` from the current cost lines.
    ///
    /// Sets `Some(revenue - cost)` when no units are pending, `None`
    /// otherwise.
    pub fn recompute_profit(&mut self) {
        self.total_profit = if self.units_pending_cost == 0 {
            let revenue = Decimal::from(self.units_sold) * self.selling_price_per_unit;
            Some(revenue - self.total_cost())
        } else {
            None
        };
    }

    /// Append a cost line, merging the purchase id into
    /// [`consumed_purchases`](Self::consumed_purchases).
    pub fn push_cost_line(&mut self, line: CostLine) {
        if let Some(id) = line.origin.purchase_id() {
            self.consumed_purchases.insert(id);
        }
        self.cost_lines.push(line);
    }

    /// Remove every cost line referencing `purchase`, returning the number of
    /// units those lines covered. The id is dropped from
    /// [`consumed_purchases`](Self::consumed_purchases).
    pub fn remove_purchase_lines(&mut self, purchase: PurchaseId) -> u64 {
        let mut recovered = 0;
        self.cost_lines.retain(|line| {
            if line.origin.purchase_id() == Some(purchase) {
                recovered += line.units;
                false
            } else {
                true
            }
        });
        self.consumed_purchases.remove(&purchase);
        recovered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn purchased(id: u64, units: u64, cost: Decimal) -> CostLine {
        CostLine::new(LotOrigin::Purchased(PurchaseId(id)), units, cost)
    }

    #[test]
    fn profit_present_when_fully_costed() {
        let record = SaleCostRecord::new(
            SaleId(1),
            10,
            dec!(5),
            vec![purchased(1, 4, dec!(2)), purchased(2, 6, dec!(3))],
            0,
        );
        // 10 * 5 - (4*2 + 6*3) = 50 - 26
        assert_eq!(record.total_profit, Some(dec!(24)));
        assert!(!record.is_pending());
    }

    #[test]
    fn profit_withheld_while_pending() {
        let record = SaleCostRecord::new(SaleId(1), 10, dec!(5), vec![purchased(1, 4, dec!(2))], 6);
        assert_eq!(record.total_profit, None);
        assert!(record.is_pending());
        assert_eq!(record.costed_units(), 4);
    }

    #[test]
    fn consumed_purchases_denormalized() {
        let record = SaleCostRecord::new(
            SaleId(2),
            5,
            dec!(4),
            vec![
                purchased(7, 2, dec!(1)),
                CostLine::new(LotOrigin::Opening, 3, dec!(1)),
            ],
            0,
        );
        assert!(record.consumed_purchases.contains(&PurchaseId(7)));
        assert_eq!(record.consumed_purchases.len(), 1);
    }

    #[test]
    fn remove_purchase_lines_recovers_units() {
        let mut record = SaleCostRecord::new(
            SaleId(3),
            10,
            dec!(5),
            vec![purchased(1, 4, dec!(2)), purchased(2, 6, dec!(3))],
            0,
        );
        let recovered = record.remove_purchase_lines(PurchaseId(1));
        assert_eq!(recovered, 4);
        assert_eq!(record.cost_lines.len(), 1);
        assert!(!record.consumed_purchases.contains(&PurchaseId(1)));
    }
}
