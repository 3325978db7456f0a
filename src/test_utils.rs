//! Shared test utilities for the inventory core.
//!
//! This module provides helpers for setting up an in-memory store and creating products
//! with sensible defaults.

use crate::{
    core::{product, status},
    entities::{self, ExpiryStatus},
    errors::Result,
    store::DocumentStore,
};
use chrono::{Duration, NaiveDate};
use sea_orm::ConnectionTrait;

/// Opens a store over an in-memory `SQLite` database with all tables created and both
/// collections loaded. This is the standard setup for store-backed tests.
pub async fn setup_test_store() -> Result<DocumentStore> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    DocumentStore::open(db).await
}

/// Creates a stocked product through the normal write path.
///
/// # Arguments
/// * `store` - Store to write to
/// * `name` - Product name
/// * `quantity` - Units in stock
/// * `days_from_today` - Expiry date offset; negative for already expired stock
///
/// # Defaults
/// * `batch`: "L001"
/// * no EAN, so no catalog reference is registered
pub async fn create_test_product(
    store: &DocumentStore,
    name: &str,
    quantity: i64,
    days_from_today: i64,
) -> Result<entities::product::Model> {
    let expiry = status::today() + Duration::days(days_from_today);
    let draft = product::ProductDraft {
        name: name.to_string(),
        batch: "L001".to_string(),
        quantity,
        expiry_date: status::format_date(expiry),
        ..Default::default()
    };
    Ok(product::create_product(store, &draft).await?.product)
}

/// Writes an inventory row whose status no client can decode, so every later full read of
/// the collection fails while lookups of other ids keep working.
pub async fn insert_unreadable_product(store: &DocumentStore) -> Result<()> {
    store
        .connection()
        .execute_unprepared(
            "INSERT INTO inventory (name, batch, quantity, expiry_date, days_remaining, status, \
             created_at, updated_at) VALUES ('BROKEN', 'X', 1, NULL, 0, 'bogus', \
             '2024-01-01 00:00:00', '2024-01-01 00:00:00')",
        )
        .await?;
    Ok(())
}

/// In-memory product for pure functions (stats, filters, reports). Nothing is written.
///
/// The expiry date is left empty; `days_remaining` is picked to agree with `status`.
#[must_use]
pub fn product_fixture(id: i64, name: &str, status: ExpiryStatus) -> entities::product::Model {
    let days_remaining = match status {
        ExpiryStatus::Expired => -1,
        ExpiryStatus::Critical => 15,
        ExpiryStatus::Safe => 90,
    };
    let timestamp = NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default();
    entities::product::Model {
        id,
        name: name.to_string(),
        batch: "L001".to_string(),
        quantity: 10,
        expiry_date: None,
        days_remaining,
        status,
        ean: None,
        registration: None,
        section: None,
        transfer: None,
        notes: None,
        old_id: None,
        created_at: timestamp,
        updated_at: timestamp,
    }
}
