//! Sale entity - An immutable record in the `sales` collection.
//!
//! Each record is a full copy of the product as it was at sale time plus the sale metadata.
//! There is no foreign key back to the inventory: deleting a product keeps its sales history.

use super::ExpiryStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sale database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the sale
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Id of the product this sale was taken from, kept for reference only
    pub product_id: Option<i64>,
    /// Product name at sale time
    pub name: String,
    /// Product batch at sale time
    pub batch: String,
    /// Stock on hand just before the sale
    pub quantity: i64,
    /// Product expiry date at sale time
    pub expiry_date: Option<Date>,
    /// Product `days_remaining` at sale time
    pub days_remaining: i64,
    /// Product status at sale time
    pub status: ExpiryStatus,
    /// Product barcode
    pub ean: Option<String>,
    /// Product registration tag
    pub registration: Option<String>,
    /// Product section tag
    pub section: Option<String>,
    /// Product transfer tag
    pub transfer: Option<String>,
    /// Product notes
    pub notes: Option<String>,
    /// Units sold, always positive
    pub quantity_sold: i64,
    /// Identifier typed in by the seller
    pub seller_id: String,
    /// Store-generated timestamp of the sale
    pub sale_date: DateTimeUtc,
    /// Identifier the record had in the local snapshot it was migrated from
    pub old_id: Option<String>,
}

/// `Sale` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
