//! Manual stock adjustments.

use rust_decimal::Decimal;
use stockbook_core::{ItemState, LotOrigin, SaleCostRecord};

use crate::CostingError;

/// A manual correction to an item's stock, outside any purchase or sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    /// Add units at a stated cost basis. Behaves like a purchase with no
    /// transaction behind it: the units feed pending sales first and enter
    /// the queue as [`LotOrigin::Opening`] stock.
    Add {
        /// Cost basis per added unit.
        unit_cost: Decimal,
        /// Units added.
        quantity: u64,
    },
    /// Remove units without producing a cost record (spoilage, shrinkage,
    /// stocktake corrections). Draws FIFO and the drawn cost basis is simply
    /// written off.
    Subtract {
        /// Units removed.
        quantity: u64,
    },
}

/// Apply a manual adjustment to an item.
///
/// Subtractions may not overdraw: unlike a sale there is no later event that
/// could supply a cost basis for the missing units, so an insufficient ledger
/// fails with [`CostingError::InsufficientStock`] and nothing changes.
pub fn adjust(
    item: &mut ItemState,
    pending: &mut [SaleCostRecord],
    adjustment: Adjustment,
) -> Result<(), CostingError> {
    match adjustment {
        Adjustment::Add {
            unit_cost,
            quantity,
        } => {
            crate::absorb_new_supply(
                item,
                LotOrigin::Opening,
                unit_cost,
                quantity,
                pending.iter_mut(),
            );
            Ok(())
        }
        Adjustment::Subtract { quantity } => {
            let available = item.total_stock.max(0) as u64;
            if quantity > available {
                return Err(CostingError::InsufficientStock {
                    requested: quantity,
                    available,
                });
            }
            item.queue.consume(quantity);
            item.total_stock -= quantity as i64;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost_sale;
    use rust_decimal_macros::dec;
    use stockbook_core::{Lot, PurchaseId, SaleId};

    #[test]
    fn add_feeds_pending_then_queue() {
        let mut item = ItemState::new();
        let mut pending = vec![cost_sale(&mut item, SaleId(1), 3, dec!(9))];

        adjust(
            &mut item,
            &mut pending,
            Adjustment::Add {
                unit_cost: dec!(4),
                quantity: 5,
            },
        )
        .unwrap();

        assert_eq!(pending[0].total_profit, Some(dec!(15)));
        assert_eq!(item.total_stock, 2);
        assert_eq!(item.queue.total_units(), 2);
        assert_eq!(item.queue.iter().next().unwrap().origin, LotOrigin::Opening);
        item.check_conservation().unwrap();
    }

    #[test]
    fn subtract_draws_fifo_without_a_record() {
        let mut item = ItemState::new();
        item.total_stock = 10;
        item.queue.append(Lot::purchased(PurchaseId(1), dec!(2), 4));
        item.queue.append(Lot::purchased(PurchaseId(2), dec!(3), 6));

        adjust(&mut item, &mut [], Adjustment::Subtract { quantity: 5 }).unwrap();

        assert_eq!(item.total_stock, 5);
        assert_eq!(item.queue.quantity_of(PurchaseId(1)), None);
        assert_eq!(item.queue.quantity_of(PurchaseId(2)), Some(5));
        item.check_conservation().unwrap();
    }

    #[test]
    fn subtract_rejects_overdraw() {
        let mut item = ItemState::new();
        item.total_stock = 2;
        item.queue.append(Lot::purchased(PurchaseId(1), dec!(2), 2));

        let err = adjust(&mut item, &mut [], Adjustment::Subtract { quantity: 3 }).unwrap_err();
        assert_eq!(
            err,
            CostingError::InsufficientStock {
                requested: 3,
                available: 2
            }
        );
        assert_eq!(item.total_stock, 2);
        assert_eq!(item.queue.total_units(), 2);
    }
}
