//! Retroactive reconciliation.
//!
//! Two symmetric concerns live here:
//!
//! - **Absorbing new supply** ([`absorb_new_supply`]): whenever an operation
//!   increases available stock (a purchase, a manual add, a
//!   quantity-increasing purchase amendment, the reversal of a sale), the new
//!   units are first offered to sale cost records still waiting for a cost
//!   basis, oldest recorded first. Only the remainder enters the lot queue.
//! - **Unwinding a lot** ([`unwind_lot`] + [`reassign_cost_lines`]): when a
//!   purchase that already participated in FIFO matching is edited or
//!   deleted, the units it had supplied to sales must be re-sourced from the
//!   lots that remain, and every affected cost record rebuilt. Units that
//!   cannot be re-sourced revert to pending; profit reverts to undefined.

use rust_decimal::Decimal;
use std::collections::VecDeque;

use stockbook_core::{CostLine, ItemState, Lot, LotOrigin, PurchaseId, SaleCostRecord};

/// Apply newly available supply to pending sale records, oldest first.
///
/// Increments `total_stock` by the full `quantity`: both the absorbed and the
/// queued portion count as owned stock. Each pending record takes
/// `min(pending, available)` units at `unit_cost`; a record whose pending
/// count reaches zero gets its profit computed. Whatever remains enters the
/// queue, merged into the surviving lot of the same purchase if one exists
/// and appended as a new lot otherwise. Records with nothing pending are
/// untouched, so re-running absorption against resolved records is a no-op.
///
/// An item can be oversold beyond what its records account for: a purchase
/// deleted after its units already left through a transfer or a subtract
/// adjustment leaves `total_stock` negative with nothing pending. New supply
/// backfills those retroactively unsourced departures without reaching the
/// queue, so the queue intake is capped at what the stock total can carry.
///
/// This is why a purchase's recorded lot quantity may be smaller than its
/// purchased quantity: the portion absorbed by pending sales or by backfill
/// never reaches the queue.
pub fn absorb_new_supply<'a, I>(
    item: &mut ItemState,
    origin: LotOrigin,
    unit_cost: Decimal,
    quantity: u64,
    pending: I,
) where
    I: IntoIterator<Item = &'a mut SaleCostRecord>,
{
    item.total_stock += quantity as i64;

    let mut available = quantity;
    for record in pending {
        if available == 0 {
            break;
        }
        if !record.is_pending() {
            continue;
        }
        let take = record.units_pending_cost.min(available);
        record.push_cost_line(CostLine::new(origin, take, unit_cost));
        record.units_pending_cost -= take;
        available -= take;
        if record.units_pending_cost == 0 {
            record.recompute_profit();
        }
    }

    // Queue only what the stock total can carry; the rest backfills
    // oversell that no record tracks.
    let capacity = item.total_stock.max(0) as u64;
    let to_queue = available.min(capacity.saturating_sub(item.queue.total_units()));
    item.queue.return_units(origin, unit_cost, to_queue);
}

/// The replacement terms of an amended purchase lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LotTerms {
    /// New cost per unit.
    pub unit_cost: Decimal,
    /// New purchased quantity.
    pub quantity: u64,
}

/// An amendment to (or deletion of) a previously recorded purchase lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LotAmendment {
    /// The purchase being amended.
    pub purchase: PurchaseId,
    /// Cost per unit as originally recorded.
    pub old_unit_cost: Decimal,
    /// Quantity as originally purchased.
    pub old_quantity: u64,
    /// Replacement terms, or `None` when the purchase line is deleted.
    pub new: Option<LotTerms>,
}

/// What [`unwind_lot`] decided, telling the caller how to fix up the
/// affected sale cost records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LotUnwind {
    /// Price and quantity are unchanged; nothing to do.
    Unchanged,
    /// Only the price changed and the lot is fully intact: substitute the new
    /// unit cost into referencing cost lines via [`substitute_price`], no
    /// manifest walk needed.
    PriceOnly {
        /// The lot's new cost per unit.
        new_unit_cost: Decimal,
    },
    /// Already-consumed units were re-sourced from the queue. Hand the
    /// manifest to [`reassign_cost_lines`].
    Resourced {
        /// What the already-sold units now actually cost, in FIFO order.
        manifest: Vec<CostLine>,
    },
}

/// Unwind an amended or deleted purchase lot from an item's queue.
///
/// `consumed_already = old_quantity - remaining + oversold` is the number of
/// units of this purchase that sales (or prior reconciliation) have already
/// used; when the item is oversold those units are implicitly attributed to
/// the lot chain as well. The queue entry is rewritten to the new terms (a
/// fully consumed lot is reinserted at the *front*, since it is older than
/// every surviving lot) or removed on deletion, and `consumed_already` units
/// are then drawn FIFO to build the re-sourcing manifest.
///
/// `total_stock` moves only by the purchased-quantity delta; the manifest
/// walk itself never touches it (those units already left stock when they
/// were sold).
///
/// Quantity *increases* must be handled by the caller as an amendment to the
/// old quantity followed by [`absorb_new_supply`] of the delta, so that the
/// added units reach still-pending sales.
pub fn unwind_lot(item: &mut ItemState, amendment: &LotAmendment) -> LotUnwind {
    let remaining = item.queue.quantity_of(amendment.purchase);

    if let Some(new) = amendment.new {
        if new.quantity == amendment.old_quantity {
            if new.unit_cost == amendment.old_unit_cost {
                return LotUnwind::Unchanged;
            }
            if remaining == Some(amendment.old_quantity) {
                // Fully intact: no units to re-source, just reprice.
                item.queue
                    .set_lot(amendment.purchase, new.unit_cost, new.quantity);
                return LotUnwind::PriceOnly {
                    new_unit_cost: new.unit_cost,
                };
            }
        }
    }

    let consumed_already =
        amendment.old_quantity.saturating_sub(remaining.unwrap_or(0)) + item.oversold_units();

    match amendment.new {
        Some(new) => {
            if !item
                .queue
                .set_lot(amendment.purchase, new.unit_cost, new.quantity)
            {
                item.queue
                    .push_front(Lot::purchased(amendment.purchase, new.unit_cost, new.quantity));
            }
            item.total_stock += new.quantity as i64 - amendment.old_quantity as i64;
        }
        None => {
            item.queue.remove_lot(amendment.purchase);
            item.total_stock -= amendment.old_quantity as i64;
        }
    }

    let manifest = item.queue.consume(consumed_already).lines;
    LotUnwind::Resourced { manifest }
}

/// Rebuild the cost records that reference an unwound purchase.
///
/// For every record whose `consumed_purchases` contains `purchase`, in
/// recorded order: the lines referencing it are removed and exactly those
/// units are re-drawn from `manifest` in order. The manifest is shared
/// across records and consumed as it goes. A remainder the manifest cannot
/// cover is added to `units_pending_cost` (profit reverts to undefined,
/// awaiting a later [`absorb_new_supply`]); records left with nothing
/// pending get their profit recomputed.
///
/// Units that were already pending before the amendment never draw from the
/// manifest: the manifest re-sources units that previously had a cost, while
/// pending units are still waiting for their first. Letting them draw would
/// hand them segments belonging to units that left the ledger without a cost
/// record (transfers, subtract adjustments) and unbalance the stock total.
/// Such leftover segments are dropped instead.
pub fn reassign_cost_lines(
    records: &mut [SaleCostRecord],
    purchase: PurchaseId,
    manifest: Vec<CostLine>,
) {
    let mut manifest: VecDeque<CostLine> = manifest.into();

    for record in records
        .iter_mut()
        .filter(|r| r.consumed_purchases.contains(&purchase))
    {
        let mut pool = record.remove_purchase_lines(purchase);

        while pool > 0 {
            let Some(front) = manifest.front_mut() else {
                break;
            };
            if front.units > pool {
                record.push_cost_line(CostLine::new(front.origin, pool, front.unit_cost));
                front.units -= pool;
                pool = 0;
            } else {
                pool -= front.units;
                if let Some(line) = manifest.pop_front() {
                    record.push_cost_line(line);
                }
            }
        }

        record.units_pending_cost += pool;
        record.recompute_profit();
    }
}

/// Substitute a repriced lot's unit cost into every referencing cost line.
///
/// The fast path for a price-only amendment of a fully intact lot: no units
/// moved, so no manifest walk: rewrite the price and recompute the affected
/// profits.
pub fn substitute_price(
    records: &mut [SaleCostRecord],
    purchase: PurchaseId,
    new_unit_cost: Decimal,
) {
    for record in records
        .iter_mut()
        .filter(|r| r.consumed_purchases.contains(&purchase))
    {
        for line in &mut record.cost_lines {
            if line.origin.purchase_id() == Some(purchase) {
                line.unit_cost = new_unit_cost;
            }
        }
        record.recompute_profit();
    }
}

/// Unwind a sale's cost allocation back into the item.
///
/// Restores the full `units_sold` to `total_stock` (the pending portion never
/// reached the queue, but it did leave the stock total when the sale was
/// recorded). Each old cost line is treated as newly available supply:
/// offered to `other_pending` records first, with the remainder returned to
/// the queue, merged back into the surviving lot of the originating purchase
/// where possible and re-entering as a [`LotOrigin::Returned`] lot otherwise.
pub fn unwind_sale(
    item: &mut ItemState,
    record: &SaleCostRecord,
    other_pending: &mut [SaleCostRecord],
) {
    // The pending units were subtracted from stock at sale time without ever
    // touching the queue; give them straight back to the total before the
    // costed lines are offered as supply, so the queue intake cap sees the
    // restored stock level.
    item.total_stock += record.units_pending_cost as i64;
    for line in &record.cost_lines {
        let origin = match line.origin {
            LotOrigin::Purchased(id) => LotOrigin::Purchased(id),
            _ => LotOrigin::Returned,
        };
        absorb_new_supply(
            item,
            origin,
            line.unit_cost,
            line.units,
            other_pending.iter_mut(),
        );
    }
}
