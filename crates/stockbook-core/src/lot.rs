//! Lot and identifier types.
//!
//! A [`Lot`] is one purchased (or opening) batch of stock still on hand, in
//! part or whole: a remaining quantity at a single unit cost, tagged with its
//! [`LotOrigin`]. Lots are held in FIFO order by
//! [`LotQueue`](crate::LotQueue).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a recorded purchase transaction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchaseId(pub u64);

/// Identifier of a recorded sale transaction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SaleId(pub u64);

/// Identifier of a stock-keeping item within a company.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

/// Identifier of a company (one independent stock ledger).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyId(pub u64);

impl fmt::Display for PurchaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "purchase:{}", self.0)
    }
}

impl fmt::Display for SaleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sale:{}", self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item:{}", self.0)
    }
}

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "company:{}", self.0)
    }
}

/// Where a lot's units came from.
///
/// Only [`Purchased`](Self::Purchased) lots carry a linkage back to a
/// purchase transaction and participate in purchase-amendment reconciliation.
/// All other origins are terminal: amending or deleting the event that
/// produced them is not supported, so they need no back-reference.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotOrigin {
    /// Units from a recorded purchase transaction.
    Purchased(PurchaseId),
    /// Opening stock, or a manual "add" adjustment.
    Opening,
    /// Units returned to stock by an amended or deleted sale.
    Returned,
    /// Units received from another company's ledger. The cost basis is
    /// preserved but the purchase linkage is not.
    Transferred,
}

impl LotOrigin {
    /// The originating purchase id, if any.
    #[must_use]
    pub const fn purchase_id(&self) -> Option<PurchaseId> {
        match self {
            Self::Purchased(id) => Some(*id),
            Self::Opening | Self::Returned | Self::Transferred => None,
        }
    }
}

impl fmt::Display for LotOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Purchased(id) => write!(f, "{id}"),
            Self::Opening => write!(f, "opening"),
            Self::Returned => write!(f, "returned"),
            Self::Transferred => write!(f, "transferred"),
        }
    }
}

/// One batch of stock at a single unit cost.
///
/// # Examples
///
/// ```
/// use stockbook_core::{Lot, LotOrigin, PurchaseId};
/// use rust_decimal_macros::dec;
///
/// let lot = Lot::purchased(PurchaseId(7), dec!(2.50), 10);
/// assert_eq!(lot.quantity, 10);
/// assert_eq!(lot.origin.purchase_id(), Some(PurchaseId(7)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lot {
    /// Where these units came from.
    pub origin: LotOrigin,
    /// Cost per unit for this lot.
    pub unit_cost: Decimal,
    /// Units remaining in this lot.
    pub quantity: u64,
}

impl Lot {
    /// Create a lot with an explicit origin.
    #[must_use]
    pub const fn new(origin: LotOrigin, unit_cost: Decimal, quantity: u64) -> Self {
        Self {
            origin,
            unit_cost,
            quantity,
        }
    }

    /// Create a lot backed by a purchase transaction.
    #[must_use]
    pub const fn purchased(id: PurchaseId, unit_cost: Decimal, quantity: u64) -> Self {
        Self::new(LotOrigin::Purchased(id), unit_cost, quantity)
    }

    /// Create an opening-stock lot with no purchase linkage.
    #[must_use]
    pub const fn opening(unit_cost: Decimal, quantity: u64) -> Self {
        Self::new(LotOrigin::Opening, unit_cost, quantity)
    }

    /// Check if this lot is exhausted. Empty lots are never retained in a
    /// queue.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.quantity == 0
    }

    /// Total cost basis of the remaining units.
    #[must_use]
    pub fn book_value(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_cost
    }
}

impl fmt::Display for Lot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {} ({})", self.quantity, self.unit_cost, self.origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn purchase_linkage() {
        let lot = Lot::purchased(PurchaseId(3), dec!(1.25), 8);
        assert_eq!(lot.origin.purchase_id(), Some(PurchaseId(3)));
        assert_eq!(Lot::opening(dec!(1), 5).origin.purchase_id(), None);
    }

    #[test]
    fn book_value() {
        let lot = Lot::opening(dec!(2.50), 4);
        assert_eq!(lot.book_value(), dec!(10.00));
    }

    #[test]
    fn display() {
        let lot = Lot::purchased(PurchaseId(1), dec!(3), 2);
        assert_eq!(format!("{lot}"), "2 @ 3 (purchase:1)");
    }

    #[test]
    fn serde_round_trip() {
        let lot = Lot::purchased(PurchaseId(9), dec!(4.20), 12);
        let json = serde_json::to_string(&lot).unwrap();
        assert_eq!(serde_json::from_str::<Lot>(&json).unwrap(), lot);
    }
}
