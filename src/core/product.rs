//! Product business logic - Handles creating, editing and deleting inventory documents.
//!
//! Every write path goes through [`normalize`], which upper-cases the text tags, validates the
//! required fields and recomputes `days_remaining` / `status` from the expiry date. Values
//! supplied by the caller for the derived fields are never trusted.

use super::status::{self, StatusReading};
use crate::{
    entities::{product, product::CATALOG_BATCH},
    errors::{Error, Result},
    store::{BatchOp, DocumentStore},
};
use chrono::NaiveDate;
use sea_orm::Set;
use serde::Deserialize;
use tracing::info;

/// Raw product form input, as typed by the user or read from a backup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProductDraft {
    /// Product description
    pub name: String,
    /// Lot identifier
    pub batch: String,
    /// Units in stock
    pub quantity: i64,
    /// Expiry date as `YYYY-MM-DD`
    pub expiry_date: String,
    /// Barcode
    pub ean: String,
    /// Seller / owner registration
    pub registration: String,
    /// Shelf section
    pub section: String,
    /// Transfer location
    pub transfer: String,
    /// Free-form notes
    pub notes: String,
}

/// Validated product fields ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedProduct {
    /// Upper-cased, trimmed name
    pub name: String,
    /// Upper-cased, trimmed batch
    pub batch: String,
    /// Non-negative quantity
    pub quantity: i64,
    /// Parsed expiry date
    pub expiry_date: Option<NaiveDate>,
    /// Status derived from `expiry_date`
    pub reading: StatusReading,
    /// Trimmed barcode
    pub ean: Option<String>,
    /// Upper-cased registration tag
    pub registration: Option<String>,
    /// Upper-cased section tag
    pub section: Option<String>,
    /// Upper-cased transfer tag
    pub transfer: Option<String>,
    /// Notes as entered
    pub notes: Option<String>,
}

fn upper_tag(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_uppercase())
}

fn non_empty(value: &str) -> Option<String> {
    (!value.trim().is_empty()).then(|| value.to_string())
}

/// Validates a draft and derives its status relative to `today`.
///
/// # Errors
/// Returns an error if:
/// - The name is empty or whitespace-only
/// - The expiry date is missing (catalog entries excepted) or malformed
/// - The quantity is negative
pub fn normalize(draft: &ProductDraft, today: NaiveDate) -> Result<NormalizedProduct> {
    let name = draft.name.trim().to_uppercase();
    if name.is_empty() {
        return Err(Error::Validation {
            field: "name",
            message: "Product name cannot be empty".to_string(),
        });
    }

    let batch = draft.batch.trim().to_uppercase();
    let expiry_date = status::parse_expiry_date(&draft.expiry_date)?;
    if expiry_date.is_none() && batch != CATALOG_BATCH {
        return Err(Error::Validation {
            field: "expiry_date",
            message: "Expiry date is required".to_string(),
        });
    }

    if draft.quantity < 0 {
        return Err(Error::InvalidQuantity {
            quantity: draft.quantity,
        });
    }

    Ok(NormalizedProduct {
        name,
        batch,
        quantity: draft.quantity,
        expiry_date,
        reading: status::evaluate(expiry_date, today),
        ean: non_empty(draft.ean.trim()),
        registration: upper_tag(&draft.registration),
        section: upper_tag(&draft.section),
        transfer: upper_tag(&draft.transfer),
        notes: non_empty(&draft.notes),
    })
}

impl NormalizedProduct {
    /// Active model with every field set, for inserts and full-form edits.
    #[must_use]
    pub fn to_active_model(&self) -> product::ActiveModel {
        let now = chrono::Utc::now().naive_utc();
        product::ActiveModel {
            name: Set(self.name.clone()),
            batch: Set(self.batch.clone()),
            quantity: Set(self.quantity),
            expiry_date: Set(self.expiry_date),
            days_remaining: Set(self.reading.days_remaining),
            status: Set(self.reading.status),
            ean: Set(self.ean.clone()),
            registration: Set(self.registration.clone()),
            section: Set(self.section.clone()),
            transfer: Set(self.transfer.clone()),
            notes: Set(self.notes.clone()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
    }

    /// The catalog reference this product would register for its EAN, if it has one.
    ///
    /// Catalog references hold no stock and no expiry date.
    #[must_use]
    pub fn catalog_reference(&self) -> Option<product::ActiveModel> {
        if self.batch == CATALOG_BATCH {
            return None;
        }
        let ean = self.ean.clone()?;
        let reference = Self {
            batch: CATALOG_BATCH.to_string(),
            quantity: 0,
            expiry_date: None,
            reading: status::evaluate(None, status::today()),
            ean: Some(ean),
            ..self.clone()
        };
        Some(reference.to_active_model())
    }
}

/// Result of [`create_product`].
#[derive(Debug, Clone)]
pub struct CreatedProduct {
    /// The stocked product
    pub product: product::Model,
    /// Catalog reference registered alongside it, when its EAN was new
    pub catalog_entry: Option<product::Model>,
}

/// Whether a catalog reference already exists for `ean`.
#[must_use]
pub fn catalog_entry_exists(products: &[product::Model], ean: &str) -> bool {
    products
        .iter()
        .any(|p| p.is_catalog_entry() && p.ean.as_deref() == Some(ean))
}

/// Creates a product in two named steps committed together:
/// 1. insert the product;
/// 2. register a catalog reference for its EAN if none exists yet.
///
/// # Errors
/// Returns a validation error for bad input, or the store's error if the batch is rejected.
pub async fn create_product(store: &DocumentStore, draft: &ProductDraft) -> Result<CreatedProduct> {
    let normalized = normalize(draft, status::today())?;

    let mut batch = store.open_batch();
    batch.push(BatchOp::InsertProduct(normalized.to_active_model()));
    if let Some(reference) = normalized.catalog_reference() {
        batch.push(BatchOp::EnsureCatalogEntry(reference));
    }
    let mut written = batch.commit().await?.products.into_iter();

    let product = written.next().ok_or_else(|| Error::Validation {
        field: "product",
        message: "store returned no document for the insert".to_string(),
    })?;
    let catalog_entry = written.next();
    if let Some(entry) = &catalog_entry {
        info!("Catalog reference {} registered for EAN {:?}", entry.id, entry.ean);
    }
    info!("Saved {} ({})", product.name, product.id);

    Ok(CreatedProduct {
        product,
        catalog_entry,
    })
}

/// Replaces every editable field of a product and recomputes its status.
///
/// # Errors
/// Returns a validation error for bad input or [`Error::ProductNotFound`].
pub async fn update_product(
    store: &DocumentStore,
    product_id: i64,
    draft: &ProductDraft,
) -> Result<product::Model> {
    let normalized = normalize(draft, status::today())?;
    let mut active = normalized.to_active_model();
    active.created_at = sea_orm::ActiveValue::NotSet;
    let updated = store.update_product(product_id, active).await?;
    info!("Updated {} ({})", updated.name, updated.id);
    Ok(updated)
}

/// Deletes one product. Its sales history is left untouched.
///
/// # Errors
/// Returns [`Error::ProductNotFound`] if there is no such product.
pub async fn delete_product(store: &DocumentStore, product_id: i64) -> Result<()> {
    store.delete_product(product_id).await?;
    info!("Removed product {}", product_id);
    Ok(())
}
