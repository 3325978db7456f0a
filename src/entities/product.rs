//! Product entity - Represents one stocked item in the `inventory` collection.
//!
//! Products carry a lot (`batch`), a quantity and an expiry date from which `days_remaining`
//! and `status` are derived at write time. A product whose batch is [`CATALOG_BATCH`] is a
//! catalog reference: it maps an EAN to a name and holds no real stock.

use super::ExpiryStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Batch marker for catalog reference entries
pub const CATALOG_BATCH: &str = "CATÁLOGO";

/// Product database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Store-assigned identifier, immutable once created
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Product description, upper-cased on write
    pub name: String,
    /// Lot identifier, upper-cased on write
    pub batch: String,
    /// Units in stock, never negative
    pub quantity: i64,
    /// Calendar expiry date; absent for non-perishable and catalog entries
    pub expiry_date: Option<Date>,
    /// Days between the write date and the expiry date (negative once expired)
    pub days_remaining: i64,
    /// Status derived from `days_remaining`
    pub status: ExpiryStatus,
    /// Barcode, used as a natural dedup key
    pub ean: Option<String>,
    /// Seller / owner registration number
    pub registration: Option<String>,
    /// Shelf section tag
    pub section: Option<String>,
    /// Transfer location tag
    pub transfer: Option<String>,
    /// Free-form notes
    pub notes: Option<String>,
    /// Identifier the record had in the local snapshot it was migrated from
    pub old_id: Option<String>,
    /// When the product was created
    pub created_at: DateTime,
    /// When the product was last modified
    pub updated_at: DateTime,
}

impl Model {
    /// Whether this entry is an EAN reference rather than real stock.
    #[must_use]
    pub fn is_catalog_entry(&self) -> bool {
        self.batch == CATALOG_BATCH
    }

    /// Sold-out products stay listed but cannot be sold again.
    #[must_use]
    pub const fn is_sold_out(&self) -> bool {
        self.quantity <= 0
    }

    /// Whether a sale can be recorded against this product.
    #[must_use]
    pub fn is_available_for_sale(&self) -> bool {
        !self.is_catalog_entry() && !self.is_sold_out()
    }
}

/// Products are not linked to other entities; sale records keep their own snapshot.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
