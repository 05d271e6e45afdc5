//! Concurrent in-memory inventory ledger.
//!
//! [`Store`] holds every item of every company behind per-item locks and
//! exposes the business events as atomic units of work: record and amend
//! purchases and sales, transfer stock between companies, apply manual
//! adjustments, and read back snapshots, cost records and low-stock alerts.
//! The costing semantics live in `stockbook-costing`; this crate contributes
//! addressing, locking, staging and the all-or-nothing commit.
//!
//! # Examples
//!
//! ```
//! use rust_decimal_macros::dec;
//! use stockbook_core::{CompanyId, ItemId, PurchaseId, SaleId};
//! use stockbook_store::{ItemMeta, PurchaseLine, SaleLine, Store};
//!
//! let store = Store::new();
//! let acme = CompanyId(1);
//! let widget = ItemId(1);
//! store.add_unit(acme, "pcs")?;
//! store.create_item(
//!     acme,
//!     widget,
//!     ItemMeta { name: "widget".into(), unit: "pcs".into(), min_stock: 5 },
//!     None,
//! )?;
//!
//! store.record_purchase(acme, PurchaseId(1), &[PurchaseLine {
//!     item: widget,
//!     unit_cost: dec!(2),
//!     quantity: 10,
//! }])?;
//! let records = store.record_sale(acme, SaleId(1), &[SaleLine {
//!     item: widget,
//!     quantity: 4,
//!     selling_price_per_unit: dec!(5),
//! }])?;
//! assert_eq!(records[0].total_profit, Some(dec!(12)));
//! # Ok::<(), stockbook_store::StoreError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod store;

pub use error::StoreError;
pub use store::{
    ItemMeta, ItemSnapshot, LowStockAlert, OpeningStock, PurchaseLine, PurchaseUpdate, SaleLine,
    SaleUpdate, Store, TransferLine,
};

pub use stockbook_costing::Adjustment;
