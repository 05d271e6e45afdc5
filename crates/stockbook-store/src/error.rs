//! Store-level errors.

use stockbook_core::{CompanyId, ConservationError, ItemId, PurchaseId, SaleId};
use stockbook_costing::CostingError;
use thiserror::Error;

/// Error returned by a store operation.
///
/// Every operation is atomic: on error, no state of any touched item has
/// changed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The addressed item does not exist in the addressed company's ledger.
    #[error("no item {item} in company {company}")]
    UnknownItem {
        /// Ledger addressed.
        company: CompanyId,
        /// Item addressed.
        item: ItemId,
    },

    /// An item with this id already exists in the company's ledger.
    #[error("item {item} already exists in company {company}")]
    ItemExists {
        /// Ledger addressed.
        company: CompanyId,
        /// Item addressed.
        item: ItemId,
    },

    /// Another item in the company already carries this display name.
    #[error("an item named {name:?} already exists in company {company}")]
    DuplicateName {
        /// Ledger addressed.
        company: CompanyId,
        /// The conflicting name.
        name: String,
    },

    /// The company already registered this unit of measure (names compare
    /// case-insensitively).
    #[error("unit {unit:?} already registered in company {company}")]
    UnitExists {
        /// Ledger addressed.
        company: CompanyId,
        /// The conflicting unit name.
        unit: String,
    },

    /// The item references a unit of measure the company never registered.
    #[error("no unit {unit:?} registered in company {company}")]
    UnknownUnit {
        /// Ledger addressed.
        company: CompanyId,
        /// The unit referenced.
        unit: String,
    },

    /// A transfer addressed the same company on both sides.
    #[error("transfer source and destination company must differ")]
    SelfTransfer,

    /// The addressed purchase was never recorded against this item.
    #[error("no purchase {0} recorded against this item")]
    UnknownPurchase(PurchaseId),

    /// A purchase with this id was already recorded against this item.
    #[error("purchase {0} already recorded against this item")]
    PurchaseExists(PurchaseId),

    /// The addressed sale was never recorded against this item.
    #[error("no sale {0} recorded against this item")]
    UnknownSale(SaleId),

    /// A sale with this id was already recorded against this item.
    #[error("sale {0} already recorded against this item")]
    SaleExists(SaleId),

    /// An engine rejected the operation.
    #[error(transparent)]
    Costing(#[from] CostingError),

    /// The staged result of a unit of work failed its balance check and was
    /// discarded.
    #[error("aborted unbalanced unit of work: {0}")]
    Unbalanced(#[from] ConservationError),
}
