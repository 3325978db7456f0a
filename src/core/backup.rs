//! JSON backup export and import.
//!
//! Export writes `{ "products": [...], "salesHistory": [...] }`. Import accepts either that
//! object or a bare array of products, validates every record up front and writes them all in
//! one batch; a single bad record rejects the whole file.

use super::product::{NormalizedProduct, ProductDraft, normalize};
use super::status;
use crate::{
    entities::{ExpiryStatus, product, sale},
    errors::{Error, Result},
    store::{BatchOp, DocumentStore},
};
use chrono::{DateTime, Local, NaiveDate, Utc};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Identifier a record carried before it reached the store; either a string or a number.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LegacyId {
    /// Text identifier
    Text(String),
    /// Numeric identifier
    Number(i64),
}

impl std::fmt::Display for LegacyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(id) => f.write_str(id),
            Self::Number(id) => write!(f, "{id}"),
        }
    }
}

/// Product as found in a backup file or a local snapshot.
///
/// Unknown fields (timestamps, store ids) are ignored. Derived fields are accepted so
/// exported files parse, but they are always recomputed on write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProductRecord {
    /// Identity in the source, stripped on write
    pub id: Option<LegacyId>,
    /// Product name
    pub name: String,
    /// Lot identifier
    pub batch: String,
    /// Units in stock
    pub quantity: i64,
    /// Expiry date as `YYYY-MM-DD`
    pub expiry_date: Option<String>,
    /// Recorded days remaining
    pub days_remaining: Option<i64>,
    /// Recorded status
    pub status: Option<ExpiryStatus>,
    /// Barcode
    pub ean: Option<String>,
    /// Registration tag
    pub registration: Option<String>,
    /// Section tag
    pub section: Option<String>,
    /// Transfer tag
    pub transfer: Option<String>,
    /// Notes
    pub notes: Option<String>,
}

impl ProductRecord {
    /// Form-shaped copy, fed through the same validation as manual entry.
    #[must_use]
    pub fn to_draft(&self) -> ProductDraft {
        ProductDraft {
            name: self.name.clone(),
            batch: self.batch.clone(),
            quantity: self.quantity,
            expiry_date: self.expiry_date.clone().unwrap_or_default(),
            ean: self.ean.clone().unwrap_or_default(),
            registration: self.registration.clone().unwrap_or_default(),
            section: self.section.clone().unwrap_or_default(),
            transfer: self.transfer.clone().unwrap_or_default(),
            notes: self.notes.clone().unwrap_or_default(),
        }
    }
}

/// Sale record as found in a local snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRecord {
    /// Product fields copied at sale time
    #[serde(flatten)]
    pub product: ProductRecord,
    /// Units sold
    pub quantity_sold: i64,
    /// Seller identifier
    pub seller_id: String,
    /// When the sale happened
    pub sale_date: DateTime<Utc>,
}

impl SaleRecord {
    /// Validates the record and converts it into a sale document tagged with its old id.
    ///
    /// Status and days remaining are recomputed from the expiry date as of the local day of
    /// the sale, so the record keeps describing the product when it was sold.
    ///
    /// # Errors
    /// Returns a validation error for a non-positive quantity, a blank seller or name, or a
    /// malformed expiry date.
    pub fn to_active_model(&self) -> Result<sale::ActiveModel> {
        if self.quantity_sold <= 0 {
            return Err(Error::InvalidQuantity {
                quantity: self.quantity_sold,
            });
        }
        if self.seller_id.trim().is_empty() {
            return Err(Error::Validation {
                field: "seller_id",
                message: "Seller registration is required".to_string(),
            });
        }
        if self.product.name.trim().is_empty() {
            return Err(Error::Validation {
                field: "name",
                message: "Product name cannot be empty".to_string(),
            });
        }

        let p = &self.product;
        let expiry_date = status::parse_expiry_date(p.expiry_date.as_deref().unwrap_or_default())?;
        let sold_on = self.sale_date.with_timezone(&Local).date_naive();
        let reading = status::evaluate(expiry_date, sold_on);
        Ok(sale::ActiveModel {
            product_id: Set(None),
            name: Set(p.name.trim().to_uppercase()),
            batch: Set(p.batch.trim().to_uppercase()),
            quantity: Set(p.quantity.max(0)),
            expiry_date: Set(expiry_date),
            days_remaining: Set(reading.days_remaining),
            status: Set(reading.status),
            ean: Set(p.ean.clone().filter(|v| !v.trim().is_empty())),
            registration: Set(p.registration.clone().filter(|v| !v.trim().is_empty())),
            section: Set(p.section.clone().filter(|v| !v.trim().is_empty())),
            transfer: Set(p.transfer.clone().filter(|v| !v.trim().is_empty())),
            notes: Set(p.notes.clone().filter(|v| !v.trim().is_empty())),
            quantity_sold: Set(self.quantity_sold),
            seller_id: Set(self.seller_id.trim().to_string()),
            sale_date: Set(self.sale_date),
            old_id: Set(p.id.as_ref().map(ToString::to_string)),
            ..Default::default()
        })
    }
}

/// Serialized backup document.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument<'a> {
    /// Every inventory document, catalog references included
    pub products: &'a [product::Model],
    /// Every sale record
    pub sales_history: &'a [sale::Model],
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ImportPayload {
    Bare(Vec<ProductRecord>),
    Wrapped { products: Vec<ProductRecord> },
}

/// Download name for a backup taken on `date`.
#[must_use]
pub fn backup_file_name(date: NaiveDate) -> String {
    format!("pex_cloud_backup_{}.json", status::format_date(date))
}

/// Serializes the current collections as a pretty-printed backup.
///
/// # Errors
/// Returns a validation error when there are no products to export.
pub fn export_backup(products: &[product::Model], sales: &[sale::Model]) -> Result<String> {
    if products.is_empty() {
        return Err(Error::Validation {
            field: "products",
            message: "There is no data to export".to_string(),
        });
    }
    let document = BackupDocument {
        products,
        sales_history: sales,
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Parses and validates a backup file into products ready to be written.
///
/// # Errors
/// Returns [`Error::Import`] for malformed JSON, an unexpected shape, an empty product list or
/// any record that fails validation.
pub fn parse_import(json: &str, today: NaiveDate) -> Result<Vec<NormalizedProduct>> {
    let payload: ImportPayload = serde_json::from_str(json).map_err(|e| Error::Import {
        message: format!("file is not a product list or backup: {e}"),
    })?;
    let records = match payload {
        ImportPayload::Bare(records) | ImportPayload::Wrapped { products: records } => records,
    };
    if records.is_empty() {
        return Err(Error::Import {
            message: "file contains no products".to_string(),
        });
    }

    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            normalize(&record.to_draft(), today).map_err(|e| Error::Import {
                message: format!("record {}: {e}", index + 1),
            })
        })
        .collect()
}

/// Imports every product of a backup file in one batch. Returns how many were written.
///
/// # Errors
/// Returns an import error if the file is rejected, or the store's error if the batch fails.
pub async fn import_products(store: &DocumentStore, json: &str) -> Result<usize> {
    let products = parse_import(json, status::today())?;
    let mut batch = store.open_batch();
    for normalized in &products {
        batch.push(BatchOp::InsertProduct(normalized.to_active_model()));
    }
    let written = batch.commit().await?.products.len();
    info!("Imported {} products", written);
    Ok(written)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_backup_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 9).unwrap();
        assert_eq!(backup_file_name(date), "pex_cloud_backup_2024-02-09.json");
    }

    #[test]
    fn test_export_refuses_empty_inventory() {
        let result = export_backup(&[], &[]);
        assert!(matches!(
            result,
            Err(Error::Validation {
                field: "products",
                ..
            })
        ));
    }

    #[test]
    fn test_parse_import_accepts_both_shapes() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bare = r#"[{"id": "abc", "name": "gaze", "batch": "g1", "quantity": 3,
                        "expiryDate": "2024-01-11", "status": "safe", "daysRemaining": 999}]"#;
        let parsed = parse_import(bare, today).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].name, "GAZE");
        assert_eq!(parsed[0].reading.days_remaining, 10);
        assert_eq!(parsed[0].reading.status, ExpiryStatus::Critical);

        let wrapped = r#"{"products": [{"name": "luva", "quantity": 1, "expiryDate": "2023-12-01"}],
                          "salesHistory": []}"#;
        let parsed = parse_import(wrapped, today).unwrap();
        assert_eq!(parsed[0].reading.status, ExpiryStatus::Expired);
    }

    #[test]
    fn test_parse_import_rejections() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        for bad in [
            "not json",
            "{}",
            r#"{"products": []}"#,
            "[]",
            r#"[{"name": "x", "quantity": "five", "expiryDate": "2024-02-01"}]"#,
            r#"[{"name": "ok", "expiryDate": "2024-02-01"}, {"name": "", "expiryDate": "2024-02-01"}]"#,
            r#"[{"name": "x", "expiryDate": "02/01/2024"}]"#,
        ] {
            let result = parse_import(bad, today);
            assert!(
                matches!(result, Err(Error::Import { message: _ })),
                "{bad} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_export_import_round_trip() -> Result<()> {
        let source = setup_test_store().await?;
        create_test_product(&source, "AAS", 10, 5).await?;
        create_test_product(&source, "BEPANTOL", 0, 400).await?;
        crate::core::catalog::register_catalog_entry(&source, "78955", "CATALOGADO").await?;
        let exported_products = source.subscribe_inventory().current();
        let json = export_backup(exported_products.documents(), &[])?;

        let target = setup_test_store().await?;
        let written = import_products(&target, &json).await?;
        assert_eq!(written, 3);

        let imported = target.subscribe_inventory().current();
        for (before, after) in exported_products.documents().iter().zip(imported.documents()) {
            assert_eq!(before.name, after.name);
            assert_eq!(before.batch, after.batch);
            assert_eq!(before.quantity, after.quantity);
            assert_eq!(before.expiry_date, after.expiry_date);
            assert_eq!(before.days_remaining, after.days_remaining);
            assert_eq!(before.status, after.status);
            assert_eq!(before.ean, after.ean);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_import_writes_nothing() -> Result<()> {
        let store = setup_test_store().await?;
        let json = r#"[{"name": "good", "expiryDate": "2030-01-01"}, {"expiryDate": "2030-01-01"}]"#;
        let result = import_products(&store, json).await;
        assert!(matches!(result, Err(Error::Import { message: _ })));
        assert!(store.subscribe_inventory().current().is_empty());
        Ok(())
    }

    #[test]
    fn test_sale_record_conversion() {
        let json = r#"{"id": 17, "name": "gaze", "batch": "g1", "quantity": 4,
                       "expiryDate": "2024-01-10", "status": "safe", "daysRemaining": 90,
                       "quantitySold": 2, "sellerId": " M-5 ", "saleDate": "2023-12-20T12:00:00.000Z"}"#;
        let record: SaleRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.product.id, Some(LegacyId::Number(17)));

        let model = record.to_active_model().unwrap();
        assert_eq!(model.old_id.clone().unwrap(), Some("17".to_string()));
        assert_eq!(model.seller_id.clone().unwrap(), "M-5");
        // Recorded derived fields are not trusted; the sale day is the reference
        assert_eq!(model.status.clone().unwrap(), ExpiryStatus::Critical);
        assert!((20..=21).contains(&model.days_remaining.clone().unwrap()));
        assert_eq!(model.product_id.clone().unwrap(), None);

        let mut zero = record;
        zero.quantity_sold = 0;
        assert!(matches!(
            zero.to_active_model(),
            Err(Error::InvalidQuantity { quantity: 0 })
        ));
    }
}
