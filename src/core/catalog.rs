//! Catalog registry - EAN to name references used to prefill the product form.

use super::product::{ProductDraft, normalize};
use super::status;
use crate::{
    entities::{product, product::CATALOG_BATCH},
    errors::{Error, Result},
    store::{BatchOp, DocumentStore},
};
use tracing::info;

/// Barcodes this short are still being typed and are not looked up.
const MIN_LOOKUP_EAN_LEN: usize = 4;

/// Fields copied into the product form when a scanned EAN is recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogMatch {
    /// Known product name
    pub name: String,
    /// Known section tag
    pub section: Option<String>,
    /// Known transfer tag
    pub transfer: Option<String>,
}

/// Catalog references in `products`, in input order.
#[must_use]
pub fn catalog_entries(products: &[product::Model]) -> Vec<&product::Model> {
    products.iter().filter(|p| p.is_catalog_entry()).collect()
}

/// Looks up a scanned EAN, preferring catalog references over stocked products.
///
/// Registration and batch are never prefilled; they vary per unit.
#[must_use]
pub fn find_catalog_match(products: &[product::Model], ean: &str) -> Option<CatalogMatch> {
    let ean = ean.trim();
    if ean.chars().count() < MIN_LOOKUP_EAN_LEN {
        return None;
    }
    let same_ean = |p: &&product::Model| p.ean.as_deref() == Some(ean);
    products
        .iter()
        .filter(|p| p.is_catalog_entry())
        .find(same_ean)
        .or_else(|| products.iter().find(same_ean))
        .map(|p| CatalogMatch {
            name: p.name.clone(),
            section: p.section.clone(),
            transfer: p.transfer.clone(),
        })
}

/// Registers a bare EAN reference.
///
/// The EAN check and the insert commit together, so two concurrent registrations of the
/// same code cannot both succeed.
///
/// # Errors
/// Returns an error if:
/// - The EAN or the name is blank
/// - Any product already carries this EAN
/// - The store rejects the write
pub async fn register_catalog_entry(
    store: &DocumentStore,
    ean: &str,
    name: &str,
) -> Result<product::Model> {
    let ean = ean.trim();
    if ean.is_empty() {
        return Err(Error::Validation {
            field: "ean",
            message: "EAN cannot be empty".to_string(),
        });
    }

    let draft = ProductDraft {
        name: name.to_string(),
        batch: CATALOG_BATCH.to_string(),
        ean: ean.to_string(),
        ..Default::default()
    };
    let normalized = normalize(&draft, status::today())?;

    let mut batch = store.open_batch();
    batch
        .push(BatchOp::RequireUnusedEan(ean.to_string()))
        .push(BatchOp::InsertProduct(normalized.to_active_model()));
    let entry = batch
        .commit()
        .await?
        .products
        .into_iter()
        .next()
        .ok_or_else(|| Error::Validation {
            field: "ean",
            message: "catalog entry was not written".to_string(),
        })?;
    info!("Catalog entry {} registered for EAN {}", entry.name, ean);
    Ok(entry)
}
