//! Sale costing.

use rust_decimal::Decimal;
use stockbook_core::{ItemState, SaleCostRecord, SaleId};

/// Cost one sale line against an item's lot queue.
///
/// Decrements `total_stock` by `units_sold` (selling more than recorded
/// stock is permitted and the stock total goes negative), then FIFO-consumes
/// the queue. Units the queue could not cover become
/// `units_pending_cost` on the returned record, and `total_profit` is
/// withheld until reconciliation matches every unit: profit is all-or-nothing
/// per sale line, never reported on a partial cost basis.
pub fn cost_sale(
    item: &mut ItemState,
    sale_id: SaleId,
    units_sold: u64,
    selling_price_per_unit: Decimal,
) -> SaleCostRecord {
    item.total_stock -= units_sold as i64;
    let taken = item.queue.consume(units_sold);
    SaleCostRecord::new(
        sale_id,
        units_sold,
        selling_price_per_unit,
        taken.lines,
        taken.shortfall,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use stockbook_core::{Lot, LotOrigin, PurchaseId};

    fn item(lots: &[(u64, Decimal, u64)]) -> ItemState {
        let mut state = ItemState::new();
        for &(id, cost, qty) in lots {
            state.total_stock += qty as i64;
            state.queue.append(Lot::purchased(PurchaseId(id), cost, qty));
        }
        state
    }

    #[test]
    fn costs_fifo_across_lots() {
        let mut state = item(&[(1, dec!(1), 5), (2, dec!(2), 5)]);
        let record = cost_sale(&mut state, SaleId(1), 7, dec!(4));

        assert_eq!(record.units_pending_cost, 0);
        assert_eq!(record.cost_lines.len(), 2);
        assert_eq!(record.cost_lines[0].units, 5);
        assert_eq!(record.cost_lines[1].units, 2);
        // 7*4 - (5*1 + 2*2) = 28 - 9
        assert_eq!(record.total_profit, Some(dec!(19)));
        assert_eq!(state.total_stock, 3);
        state.check_conservation().unwrap();
    }

    #[test]
    fn oversell_defers_profit() {
        let mut state = ItemState::new();
        let record = cost_sale(&mut state, SaleId(1), 10, dec!(5));

        assert_eq!(record.units_pending_cost, 10);
        assert_eq!(record.total_profit, None);
        assert!(record.cost_lines.is_empty());
        assert_eq!(state.total_stock, -10);
        state.check_conservation().unwrap();
    }

    #[test]
    fn partial_cover_withholds_profit_entirely() {
        let mut state = item(&[(1, dec!(2), 4)]);
        let record = cost_sale(&mut state, SaleId(1), 10, dec!(5));

        assert_eq!(record.units_pending_cost, 6);
        assert_eq!(record.costed_units(), 4);
        // No partial profit even though 4 units have a cost basis.
        assert_eq!(record.total_profit, None);
        assert_eq!(state.total_stock, -6);
        assert!(state.queue.is_empty());
    }

    #[test]
    fn opening_lots_have_no_purchase_linkage() {
        let mut state = ItemState::with_opening_stock(5, dec!(1));
        let record = cost_sale(&mut state, SaleId(1), 3, dec!(2));

        assert_eq!(record.cost_lines[0].origin, LotOrigin::Opening);
        assert!(record.consumed_purchases.is_empty());
    }
}
