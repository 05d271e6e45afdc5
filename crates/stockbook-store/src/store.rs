//! Concurrent item registry and unit-of-work execution.
//!
//! The store serializes work per item, not globally: every item lives behind
//! its own mutex, and a business event locks exactly the items its lines
//! touch, in ascending key order. The event then runs against *clones* of
//! the locked entries; only when every engine call succeeded and every
//! touched item passes its balance check are the clones written back. An
//! error anywhere leaves all entries exactly as they were.

use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex, RwLock};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info};

use stockbook_core::{
    CompanyId, CostLine, ItemId, ItemState, LotOrigin, PurchaseId, SaleCostRecord, SaleId,
};
use stockbook_costing::{
    absorb_new_supply, adjust, cost_sale, reassign_cost_lines, substitute_price, transfer,
    unwind_lot, unwind_sale, Adjustment, LotAmendment, LotTerms, LotUnwind,
};

use crate::StoreError;

type ItemKey = (CompanyId, ItemId);
type EntryGuard = ArcMutexGuard<RawMutex, ItemEntry>;

/// Descriptive fields of a stock-keeping item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMeta {
    /// Display name, unique within a company (case-insensitively).
    pub name: String,
    /// Unit of measure, one of the company's registered units.
    pub unit: String,
    /// Stock level at or below which the item is reported as low.
    pub min_stock: u64,
}

/// Opening balance carried by a newly registered item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpeningStock {
    /// Units on hand at registration.
    pub quantity: u64,
    /// Cost basis per opening unit.
    pub unit_cost: Decimal,
}

/// One item line of a purchase transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseLine {
    /// Item purchased.
    pub item: ItemId,
    /// Cost per unit.
    pub unit_cost: Decimal,
    /// Units purchased.
    pub quantity: u64,
}

/// One item line of a sale transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleLine {
    /// Item sold.
    pub item: ItemId,
    /// Units sold.
    pub quantity: u64,
    /// Revenue per unit.
    pub selling_price_per_unit: Decimal,
}

/// One item line of an inter-company transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferLine {
    /// Item moved.
    pub item: ItemId,
    /// Units moved.
    pub quantity: u64,
}

/// Line-level edit of a recorded purchase: replaced lines and dropped items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurchaseUpdate {
    /// Lines whose terms change.
    pub updated: Vec<PurchaseLine>,
    /// Items whose line is removed from the purchase entirely.
    pub removed: Vec<ItemId>,
}

/// Line-level edit of a recorded sale: replaced lines and dropped items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaleUpdate {
    /// Lines whose terms change.
    pub updated: Vec<SaleLine>,
    /// Items whose line is removed from the sale entirely.
    pub removed: Vec<ItemId>,
}

/// Point-in-time copy of one item's ledger, for reporting and audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    /// Descriptive fields.
    pub meta: ItemMeta,
    /// Stock total and lot queue.
    pub state: ItemState,
    /// Sale cost records in recorded order.
    pub records: Vec<SaleCostRecord>,
}

/// An item at or below its minimum stock level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockAlert {
    /// Item concerned.
    pub item: ItemId,
    /// Its display name.
    pub name: String,
    /// Current stock total (may be negative when oversold).
    pub total_stock: i64,
    /// The configured threshold.
    pub min_stock: u64,
}

/// Everything held for one item in one company's ledger.
#[derive(Debug, Clone)]
struct ItemEntry {
    meta: ItemMeta,
    state: ItemState,
    records: Vec<SaleCostRecord>,
    // Live purchase lines by id, so amendments know the recorded terms.
    purchases: BTreeMap<PurchaseId, LotTerms>,
}

/// The cloned working set of one unit of work, keyed and sorted like the
/// registry.
struct Staged {
    entries: Vec<(ItemKey, ItemEntry)>,
}

impl Staged {
    fn index_of(&self, key: ItemKey) -> Result<usize, StoreError> {
        self.entries
            .binary_search_by_key(&key, |(k, _)| *k)
            .map_err(|_| StoreError::UnknownItem {
                company: key.0,
                item: key.1,
            })
    }

    fn entry_mut(&mut self, key: ItemKey) -> Result<&mut ItemEntry, StoreError> {
        let index = self.index_of(key)?;
        Ok(&mut self.entries[index].1)
    }

    /// Two distinct entries at once, for transfers.
    fn pair_mut(
        &mut self,
        a: ItemKey,
        b: ItemKey,
    ) -> Result<(&mut ItemEntry, &mut ItemEntry), StoreError> {
        let i = self.index_of(a)?;
        let j = self.index_of(b)?;
        if i < j {
            let (left, right) = self.entries.split_at_mut(j);
            Ok((&mut left[i].1, &mut right[0].1))
        } else {
            let (left, right) = self.entries.split_at_mut(i);
            Ok((&mut right[0].1, &mut left[j].1))
        }
    }
}

/// In-memory multi-company inventory ledger.
///
/// Clone-free sharing across threads goes through `&Store` (it is `Sync`);
/// all methods take `&self`.
#[derive(Default)]
pub struct Store {
    items: RwLock<BTreeMap<ItemKey, Arc<Mutex<ItemEntry>>>>,
    units: RwLock<BTreeMap<CompanyId, Vec<String>>>,
}

impl Store {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a unit of measure for a company.
    ///
    /// Rejects a name already registered for the company, compared
    /// case-insensitively.
    pub fn add_unit(&self, company: CompanyId, name: &str) -> Result<(), StoreError> {
        let mut units = self.units.write();
        let registered = units.entry(company).or_default();
        if registered
            .iter()
            .any(|u| u.eq_ignore_ascii_case(name))
        {
            return Err(StoreError::UnitExists {
                company,
                unit: name.to_owned(),
            });
        }
        info!(%company, unit = %name, "unit registered");
        registered.push(name.to_owned());
        Ok(())
    }

    /// A company's registered units of measure, in registration order.
    #[must_use]
    pub fn units(&self, company: CompanyId) -> Vec<String> {
        self.units
            .read()
            .get(&company)
            .cloned()
            .unwrap_or_default()
    }

    fn check_unit(&self, company: CompanyId, unit: &str) -> Result<(), StoreError> {
        let units = self.units.read();
        let known = units
            .get(&company)
            .is_some_and(|registered| registered.iter().any(|u| u.eq_ignore_ascii_case(unit)));
        if known {
            Ok(())
        } else {
            Err(StoreError::UnknownUnit {
                company,
                unit: unit.to_owned(),
            })
        }
    }

    /// Register an item in a company's ledger, optionally seeded with
    /// opening stock.
    ///
    /// The item's unit must be registered via [`Store::add_unit`] first.
    /// Rejects a duplicate item id and a duplicate name within the company;
    /// names compare case-insensitively.
    pub fn create_item(
        &self,
        company: CompanyId,
        item: ItemId,
        meta: ItemMeta,
        opening: Option<OpeningStock>,
    ) -> Result<(), StoreError> {
        self.check_unit(company, &meta.unit)?;
        let mut items = self.items.write();
        if items.contains_key(&(company, item)) {
            return Err(StoreError::ItemExists { company, item });
        }
        let wanted = meta.name.to_lowercase();
        for (key, entry) in items.range((company, ItemId(0))..) {
            if key.0 != company {
                break;
            }
            if entry.lock().meta.name.to_lowercase() == wanted {
                return Err(StoreError::DuplicateName {
                    company,
                    name: meta.name,
                });
            }
        }

        let state = opening.map_or_else(ItemState::new, |o| {
            ItemState::with_opening_stock(o.quantity, o.unit_cost)
        });
        info!(%company, %item, name = %meta.name, stock = state.total_stock, "item created");
        items.insert(
            (company, item),
            Arc::new(Mutex::new(ItemEntry {
                meta,
                state,
                records: Vec::new(),
                purchases: BTreeMap::new(),
            })),
        );
        Ok(())
    }

    /// Replace an item's descriptive fields.
    ///
    /// Subject to the same unit and name checks as [`Store::create_item`].
    pub fn update_item(
        &self,
        company: CompanyId,
        item: ItemId,
        meta: ItemMeta,
    ) -> Result<(), StoreError> {
        self.check_unit(company, &meta.unit)?;
        let items = self.items.read();
        let wanted = meta.name.to_lowercase();
        for (key, entry) in items.range((company, ItemId(0))..) {
            if key.0 != company {
                break;
            }
            if key.1 != item && entry.lock().meta.name.to_lowercase() == wanted {
                return Err(StoreError::DuplicateName {
                    company,
                    name: meta.name,
                });
            }
        }
        let entry = items
            .get(&(company, item))
            .ok_or(StoreError::UnknownItem { company, item })?;
        entry.lock().meta = meta;
        Ok(())
    }

    /// Point-in-time copy of an item's ledger.
    pub fn item(&self, company: CompanyId, item: ItemId) -> Result<ItemSnapshot, StoreError> {
        let entry = self.entry(company, item)?;
        let entry = entry.lock();
        Ok(ItemSnapshot {
            meta: entry.meta.clone(),
            state: entry.state.clone(),
            records: entry.records.clone(),
        })
    }

    /// All items of a company at or below their minimum stock level,
    /// ordered by shortfall (threshold minus stock), largest first.
    pub fn low_stock_items(&self, company: CompanyId) -> Vec<LowStockAlert> {
        let items = self.items.read();
        let mut alerts = Vec::new();
        for (key, entry) in items.range((company, ItemId(0))..) {
            if key.0 != company {
                break;
            }
            let entry = entry.lock();
            if entry.state.total_stock <= entry.meta.min_stock as i64 {
                alerts.push(LowStockAlert {
                    item: key.1,
                    name: entry.meta.name.clone(),
                    total_stock: entry.state.total_stock,
                    min_stock: entry.meta.min_stock,
                });
            }
        }
        alerts.sort_by_key(|a| (Reverse(a.min_stock as i64 - a.total_stock), a.item));
        alerts
    }

    /// Record a purchase transaction.
    ///
    /// Each line's units are offered to that item's pending sales before the
    /// remainder joins its lot queue.
    pub fn record_purchase(
        &self,
        company: CompanyId,
        purchase: PurchaseId,
        lines: &[PurchaseLine],
    ) -> Result<(), StoreError> {
        let keys: Vec<ItemKey> = lines.iter().map(|line| (company, line.item)).collect();
        self.unit_of_work("record_purchase", &keys, |staged| {
            for line in lines {
                let entry = staged.entry_mut((company, line.item))?;
                if entry.purchases.contains_key(&purchase) {
                    return Err(StoreError::PurchaseExists(purchase));
                }
                entry.purchases.insert(
                    purchase,
                    LotTerms {
                        unit_cost: line.unit_cost,
                        quantity: line.quantity,
                    },
                );
                absorb_new_supply(
                    &mut entry.state,
                    LotOrigin::Purchased(purchase),
                    line.unit_cost,
                    line.quantity,
                    entry.records.iter_mut(),
                );
            }
            Ok(())
        })
    }

    /// Record a sale transaction and return one cost record per line.
    ///
    /// Never fails for lack of stock: an overdrawn line produces a record
    /// with deferred profit.
    pub fn record_sale(
        &self,
        company: CompanyId,
        sale: SaleId,
        lines: &[SaleLine],
    ) -> Result<Vec<SaleCostRecord>, StoreError> {
        let keys: Vec<ItemKey> = lines.iter().map(|line| (company, line.item)).collect();
        self.unit_of_work("record_sale", &keys, |staged| {
            let mut out = Vec::with_capacity(lines.len());
            for line in lines {
                let entry = staged.entry_mut((company, line.item))?;
                if entry.records.iter().any(|r| r.sale_id == sale) {
                    return Err(StoreError::SaleExists(sale));
                }
                let record = cost_sale(
                    &mut entry.state,
                    sale,
                    line.quantity,
                    line.selling_price_per_unit,
                );
                entry.records.push(record.clone());
                out.push(record);
            }
            Ok(out)
        })
    }

    /// Amend or partially delete a recorded purchase.
    ///
    /// Updated lines are unwound to their new terms; already-sold units are
    /// re-sourced FIFO from the surviving lots and the affected cost records
    /// rebuilt. A quantity increase is decomposed into an unwind at the old
    /// quantity plus an absorption of the added units, so the new units reach
    /// still-pending sales. Removed lines are unwound completely.
    pub fn update_purchase(
        &self,
        company: CompanyId,
        purchase: PurchaseId,
        update: &PurchaseUpdate,
    ) -> Result<(), StoreError> {
        let keys: Vec<ItemKey> = update
            .updated
            .iter()
            .map(|line| line.item)
            .chain(update.removed.iter().copied())
            .map(|item| (company, item))
            .collect();
        self.unit_of_work("update_purchase", &keys, |staged| {
            for line in &update.updated {
                let entry = staged.entry_mut((company, line.item))?;
                let old = *entry
                    .purchases
                    .get(&purchase)
                    .ok_or(StoreError::UnknownPurchase(purchase))?;
                let new = LotTerms {
                    unit_cost: line.unit_cost,
                    quantity: line.quantity,
                };
                entry.purchases.insert(purchase, new);
                amend_lot(entry, purchase, old, Some(new));
            }
            for &item in &update.removed {
                let entry = staged.entry_mut((company, item))?;
                let old = entry
                    .purchases
                    .remove(&purchase)
                    .ok_or(StoreError::UnknownPurchase(purchase))?;
                amend_lot(entry, purchase, old, None);
            }
            Ok(())
        })
    }

    /// Amend or partially delete a recorded sale.
    ///
    /// Each touched line's old allocation is unwound first: the full sold
    /// quantity returns to stock, its cost lines are offered to the item's
    /// other pending sales, and the remainder rejoins the queue. Updated
    /// lines are then re-costed in place, keeping their position in the
    /// record order.
    pub fn update_sale(
        &self,
        company: CompanyId,
        sale: SaleId,
        update: &SaleUpdate,
    ) -> Result<(), StoreError> {
        let keys: Vec<ItemKey> = update
            .updated
            .iter()
            .map(|line| line.item)
            .chain(update.removed.iter().copied())
            .map(|item| (company, item))
            .collect();
        self.unit_of_work("update_sale", &keys, |staged| {
            for line in &update.updated {
                let entry = staged.entry_mut((company, line.item))?;
                let index = take_sale(entry, sale)?;
                let record = cost_sale(
                    &mut entry.state,
                    sale,
                    line.quantity,
                    line.selling_price_per_unit,
                );
                entry.records.insert(index, record);
            }
            for &item in &update.removed {
                let entry = staged.entry_mut((company, item))?;
                take_sale(entry, sale)?;
            }
            Ok(())
        })
    }

    /// Move stock between two companies' ledgers.
    ///
    /// Both sides must hold the item; the source must fully cover every
    /// line. Returns the moved segments per line.
    pub fn transfer(
        &self,
        from: CompanyId,
        to: CompanyId,
        lines: &[TransferLine],
    ) -> Result<Vec<Vec<CostLine>>, StoreError> {
        if from == to {
            return Err(StoreError::SelfTransfer);
        }
        let keys: Vec<ItemKey> = lines
            .iter()
            .flat_map(|line| [(from, line.item), (to, line.item)])
            .collect();
        self.unit_of_work("transfer", &keys, |staged| {
            let mut manifests = Vec::with_capacity(lines.len());
            for line in lines {
                let (source, dest) = staged.pair_mut((from, line.item), (to, line.item))?;
                let moved = transfer(
                    &mut source.state,
                    &mut dest.state,
                    &mut dest.records,
                    line.quantity,
                )?;
                manifests.push(moved);
            }
            Ok(manifests)
        })
    }

    /// Apply a manual adjustment to one item.
    pub fn adjust(
        &self,
        company: CompanyId,
        item: ItemId,
        adjustment: Adjustment,
    ) -> Result<(), StoreError> {
        self.unit_of_work("adjust", &[(company, item)], |staged| {
            let entry = staged.entry_mut((company, item))?;
            adjust(&mut entry.state, &mut entry.records, adjustment)?;
            Ok(())
        })
    }

    /// Audit lookup: the cost record of one sale line.
    pub fn sale_record(
        &self,
        company: CompanyId,
        item: ItemId,
        sale: SaleId,
    ) -> Result<SaleCostRecord, StoreError> {
        let entry = self.entry(company, item)?;
        let entry = entry.lock();
        entry
            .records
            .iter()
            .find(|r| r.sale_id == sale)
            .cloned()
            .ok_or(StoreError::UnknownSale(sale))
    }

    fn entry(
        &self,
        company: CompanyId,
        item: ItemId,
    ) -> Result<Arc<Mutex<ItemEntry>>, StoreError> {
        self.items
            .read()
            .get(&(company, item))
            .cloned()
            .ok_or(StoreError::UnknownItem { company, item })
    }

    /// Run one business event against clones of the touched entries.
    ///
    /// Locks are taken in ascending key order, which makes two concurrent
    /// events that touch the same items acquire them in the same sequence.
    /// On success every touched item is balance-checked before the clones
    /// replace the originals; any error discards the clones.
    fn unit_of_work<T>(
        &self,
        op: &'static str,
        keys: &[ItemKey],
        run: impl FnOnce(&mut Staged) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut sorted = keys.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let arcs: Vec<(ItemKey, Arc<Mutex<ItemEntry>>)> = {
            let items = self.items.read();
            sorted
                .iter()
                .map(|&key| {
                    items
                        .get(&key)
                        .cloned()
                        .map(|arc| (key, arc))
                        .ok_or(StoreError::UnknownItem {
                            company: key.0,
                            item: key.1,
                        })
                })
                .collect::<Result<_, _>>()?
        };

        let mut guards: Vec<(ItemKey, EntryGuard)> = arcs
            .into_iter()
            .map(|(key, arc)| (key, arc.lock_arc()))
            .collect();

        let mut staged = Staged {
            entries: guards
                .iter()
                .map(|(key, guard)| (*key, ItemEntry::clone(guard)))
                .collect(),
        };

        let out = run(&mut staged)?;

        for ((company, item), entry) in &staged.entries {
            if let Err(imbalance) = entry.state.check_conservation() {
                error!(%op, %company, %item, %imbalance, "unit of work aborted");
                return Err(StoreError::Unbalanced(imbalance));
            }
        }

        for ((_, guard), (_, entry)) in guards.iter_mut().zip(staged.entries) {
            **guard = entry;
        }
        debug!(%op, items = sorted.len(), "unit of work committed");
        Ok(out)
    }
}

/// Unwind one purchase line to its new terms and rebuild the affected
/// records. Quantity increases are decomposed so the added units flow
/// through absorption.
fn amend_lot(entry: &mut ItemEntry, purchase: PurchaseId, old: LotTerms, new: Option<LotTerms>) {
    let capped = new.map(|terms| LotTerms {
        unit_cost: terms.unit_cost,
        quantity: terms.quantity.min(old.quantity),
    });
    let amendment = LotAmendment {
        purchase,
        old_unit_cost: old.unit_cost,
        old_quantity: old.quantity,
        new: capped,
    };
    match unwind_lot(&mut entry.state, &amendment) {
        LotUnwind::Unchanged => {}
        LotUnwind::PriceOnly { new_unit_cost } => {
            substitute_price(&mut entry.records, purchase, new_unit_cost);
        }
        LotUnwind::Resourced { manifest } => {
            reassign_cost_lines(&mut entry.records, purchase, manifest);
        }
    }

    if let Some(terms) = new {
        let added = terms.quantity.saturating_sub(old.quantity);
        if added > 0 {
            absorb_new_supply(
                &mut entry.state,
                LotOrigin::Purchased(purchase),
                terms.unit_cost,
                added,
                entry.records.iter_mut(),
            );
        }
    }
}

/// Remove the record of `sale` from an entry, unwinding its allocation into
/// the item. Returns the record's position so an update can reinsert there.
fn take_sale(entry: &mut ItemEntry, sale: SaleId) -> Result<usize, StoreError> {
    let index = entry
        .records
        .iter()
        .position(|r| r.sale_id == sale)
        .ok_or(StoreError::UnknownSale(sale))?;
    let record = entry.records.remove(index);
    unwind_sale(&mut entry.state, &record, &mut entry.records);
    Ok(index)
}
