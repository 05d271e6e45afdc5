//! Property tests over random event sequences.
//!
//! Whatever order purchases, sales, adjustments and amendments arrive in,
//! the ledger must keep its books balanced: queued units equal the stock
//! total whenever it is non-negative, pending units exist only when the
//! queue is empty, and profit is defined exactly when nothing is pending.

use proptest::prelude::*;
use rust_decimal::Decimal;
use stockbook_core::{ItemState, LotOrigin, PurchaseId, SaleCostRecord, SaleId};
use stockbook_costing::{
    absorb_new_supply, adjust, cost_sale, reassign_cost_lines, unwind_lot, Adjustment,
    LotAmendment, LotTerms, LotUnwind,
};

#[derive(Debug, Clone)]
enum Event {
    Purchase { unit_cost: Decimal, quantity: u64 },
    Sale { price: Decimal, quantity: u64 },
    Add { unit_cost: Decimal, quantity: u64 },
    Subtract { quantity: u64 },
    Amend { unit_cost: Decimal, quantity: u64 },
    DeleteOldestPurchase,
}

fn arb_cost() -> impl Strategy<Value = Decimal> {
    (1u64..=500).prop_map(|cents| Decimal::new(cents as i64, 2))
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        3 => (arb_cost(), 1u64..=50).prop_map(|(unit_cost, quantity)| Event::Purchase {
            unit_cost,
            quantity
        }),
        3 => (arb_cost(), 1u64..=50).prop_map(|(price, quantity)| Event::Sale {
            price,
            quantity
        }),
        1 => (arb_cost(), 1u64..=20).prop_map(|(unit_cost, quantity)| Event::Add {
            unit_cost,
            quantity
        }),
        1 => (1u64..=20).prop_map(|quantity| Event::Subtract { quantity }),
        2 => (arb_cost(), 0u64..=50).prop_map(|(unit_cost, quantity)| Event::Amend {
            unit_cost,
            quantity
        }),
        1 => Just(Event::DeleteOldestPurchase),
    ]
}

/// A single-item ledger driven the way the store drives the engines.
#[derive(Debug, Default)]
struct Ledger {
    item: ItemState,
    records: Vec<SaleCostRecord>,
    // (id, unit_cost, quantity) of every live purchase, recorded order.
    purchases: Vec<(u64, Decimal, u64)>,
    next_id: u64,
}

impl Ledger {
    fn apply(&mut self, event: &Event) {
        match *event {
            Event::Purchase {
                unit_cost,
                quantity,
            } => {
                self.next_id += 1;
                self.purchases.push((self.next_id, unit_cost, quantity));
                absorb_new_supply(
                    &mut self.item,
                    LotOrigin::Purchased(PurchaseId(self.next_id)),
                    unit_cost,
                    quantity,
                    self.records.iter_mut(),
                );
            }
            Event::Sale { price, quantity } => {
                self.next_id += 1;
                let record = cost_sale(&mut self.item, SaleId(self.next_id), quantity, price);
                self.records.push(record);
            }
            Event::Add {
                unit_cost,
                quantity,
            } => {
                adjust(
                    &mut self.item,
                    &mut self.records,
                    Adjustment::Add {
                        unit_cost,
                        quantity,
                    },
                )
                .unwrap();
            }
            Event::Subtract { quantity } => {
                // Overdraws are rejected without touching state; both
                // outcomes are legal here.
                let _ = adjust(
                    &mut self.item,
                    &mut self.records,
                    Adjustment::Subtract { quantity },
                );
            }
            Event::Amend {
                unit_cost,
                quantity,
            } => {
                let Some(target) = self.purchases.last_mut() else {
                    return;
                };
                let amendment = LotAmendment {
                    purchase: PurchaseId(target.0),
                    old_unit_cost: target.1,
                    old_quantity: target.2,
                    new: Some(LotTerms {
                        unit_cost,
                        quantity: quantity.min(target.2),
                    }),
                };
                let added = quantity.saturating_sub(target.2);
                target.1 = unit_cost;
                target.2 = quantity;
                self.amend(amendment, added);
            }
            Event::DeleteOldestPurchase => {
                if self.purchases.is_empty() {
                    return;
                }
                let (id, unit_cost, old_quantity) = self.purchases.remove(0);
                self.amend(
                    LotAmendment {
                        purchase: PurchaseId(id),
                        old_unit_cost: unit_cost,
                        old_quantity,
                        new: None,
                    },
                    0,
                );
            }
        }
    }

    /// Amend at (or below) the old quantity, then absorb any added units,
    /// mirroring how quantity increases are decomposed.
    fn amend(&mut self, amendment: LotAmendment, added: u64) {
        match unwind_lot(&mut self.item, &amendment) {
            LotUnwind::Unchanged => {}
            LotUnwind::PriceOnly { new_unit_cost } => {
                stockbook_costing::substitute_price(
                    &mut self.records,
                    amendment.purchase,
                    new_unit_cost,
                );
            }
            LotUnwind::Resourced { manifest } => {
                reassign_cost_lines(&mut self.records, amendment.purchase, manifest);
            }
        }
        if added > 0 {
            if let Some(new) = amendment.new {
                absorb_new_supply(
                    &mut self.item,
                    LotOrigin::Purchased(amendment.purchase),
                    new.unit_cost,
                    added,
                    self.records.iter_mut(),
                );
            }
        }
    }

    fn check(&self) {
        self.item.check_conservation().unwrap();

        // Pending cost can exist only when there is nothing left to draw.
        if self.records.iter().any(SaleCostRecord::is_pending) {
            assert!(
                self.item.queue.is_empty(),
                "pending sales coexist with queued lots: {}",
                self.item.queue
            );
        }

        for record in &self.records {
            assert_eq!(record.costed_units() + record.units_pending_cost, record.units_sold);
            assert_eq!(record.total_profit.is_some(), !record.is_pending());
        }
    }
}

proptest! {
    #[test]
    fn ledger_stays_balanced_under_any_event_sequence(
        events in proptest::collection::vec(arb_event(), 1..40)
    ) {
        let mut ledger = Ledger::default();
        for event in &events {
            ledger.apply(event);
            ledger.check();
        }
    }

    #[test]
    fn reapplying_absorption_never_changes_resolved_records(
        events in proptest::collection::vec(arb_event(), 1..20),
        unit_cost in arb_cost(),
    ) {
        let mut ledger = Ledger::default();
        for event in &events {
            ledger.apply(event);
        }
        prop_assume!(ledger.records.iter().all(|r| !r.is_pending()));

        let before = ledger.records.clone();
        absorb_new_supply(
            &mut ledger.item,
            LotOrigin::Purchased(PurchaseId(ledger.next_id + 1)),
            unit_cost,
            10,
            ledger.records.iter_mut(),
        );
        prop_assert_eq!(&ledger.records, &before);
        ledger.check();
    }
}
