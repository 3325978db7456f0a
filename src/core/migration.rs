//! One-shot migration of local snapshots into the store.
//!
//! Runs after the inventory feed has delivered its first snapshot. Local data is only copied
//! when the remote collection is empty, and each collection is written in a single batch that
//! also claims a `system_state` marker, so two instances racing on the same store cannot both
//! succeed. Local keys are erased only after their batch commits.

use super::backup::{ProductRecord, SaleRecord};
use super::product::normalize;
use super::status;
use crate::{
    config::settings::MigrationSettings,
    errors::{Error, Result},
    local::{LocalSnapshotStore, SnapshotKey},
    store::{BatchOp, Collection, DocumentStore},
};
use sea_orm::Set;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, info, warn};

const INVENTORY_CLAIM_KEY: &str = "migration.inventory";
const SALES_CLAIM_KEY: &str = "migration.sales";

/// What happened to one collection during a migration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionOutcome {
    /// Local records were written and the local key erased
    Migrated {
        /// Number of documents written
        count: usize,
    },
    /// No local data for this collection
    NothingLocal,
    /// The store already holds documents; local data was left untouched
    RemoteNotEmpty,
    /// Another run already migrated this collection
    AlreadyClaimed,
    /// Skipped because the run stopped earlier
    NotAttempted,
    /// The migration failed; local data was left untouched
    Failed {
        /// Error description
        message: String,
    },
}

impl CollectionOutcome {
    fn from_error(collection: Collection, err: &Error) -> Self {
        match err {
            Error::CollectionNotEmpty { .. } => {
                info!("{} already populated, skipping migration", collection);
                Self::RemoteNotEmpty
            }
            Error::AlreadyClaimed { key } => {
                warn!("{} migration already claimed ({})", collection, key);
                Self::AlreadyClaimed
            }
            _ => {
                error!("{} migration failed: {}", collection, err);
                Self::Failed {
                    message: err.to_string(),
                }
            }
        }
    }
}

/// Outcome of a [`MigrationReconciler::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// Inventory outcome
    pub products: CollectionOutcome,
    /// Sales history outcome
    pub sales: CollectionOutcome,
}

impl MigrationReport {
    /// Whether either collection failed.
    #[must_use]
    pub const fn has_failures(&self) -> bool {
        matches!(self.products, CollectionOutcome::Failed { .. })
            || matches!(self.sales, CollectionOutcome::Failed { .. })
    }
}

/// Coordinates the local to remote migration.
#[derive(Debug)]
pub struct MigrationReconciler {
    in_progress: AtomicBool,
    grace_period: Duration,
}

struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl MigrationReconciler {
    /// Creates a reconciler that waits `grace_period` before writing.
    #[must_use]
    pub const fn new(grace_period: Duration) -> Self {
        Self {
            in_progress: AtomicBool::new(false),
            grace_period,
        }
    }

    /// Creates a reconciler from the `[migration]` settings.
    #[must_use]
    pub const fn from_settings(settings: &MigrationSettings) -> Self {
        Self::new(settings.grace_period())
    }

    /// Whether a run is currently active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Migrates local snapshots into `store` if the remote inventory is empty.
    ///
    /// # Errors
    /// Returns [`Error::MigrationInProgress`] if another run is active, or an error if the
    /// inventory feed closed or local storage could not be read.
    pub async fn run(
        &self,
        store: &DocumentStore,
        local: &LocalSnapshotStore,
    ) -> Result<MigrationReport> {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::MigrationInProgress);
        }
        let _guard = RunGuard(&self.in_progress);

        let mut inventory = store.subscribe_inventory();
        let snapshot = inventory.wait_until_loaded().await?;
        if let Some(message) = snapshot.error() {
            return Err(Error::Migration {
                message: format!("inventory did not load: {message}"),
            });
        }
        if !snapshot.is_empty() {
            return Ok(MigrationReport {
                products: CollectionOutcome::RemoteNotEmpty,
                sales: CollectionOutcome::NotAttempted,
            });
        }

        let local_products = local.read(SnapshotKey::Products)?;
        let local_sales = local.read(SnapshotKey::Sales)?;
        if local_products.is_none() && local_sales.is_none() {
            return Ok(MigrationReport {
                products: CollectionOutcome::NothingLocal,
                sales: CollectionOutcome::NothingLocal,
            });
        }

        info!(
            "Local data found, migrating in {} ms",
            self.grace_period.as_millis()
        );
        tokio::time::sleep(self.grace_period).await;
        if !inventory.current().is_empty() {
            info!("Inventory populated during grace period, skipping migration");
            return Ok(MigrationReport {
                products: CollectionOutcome::RemoteNotEmpty,
                sales: CollectionOutcome::NotAttempted,
            });
        }

        let products = match local_products {
            Some(json) => migrate_products(store, local, &json)
                .await
                .unwrap_or_else(|e| CollectionOutcome::from_error(Collection::Inventory, &e)),
            None => CollectionOutcome::NothingLocal,
        };
        let sales = match local_sales {
            Some(json) => migrate_sales(store, local, &json)
                .await
                .unwrap_or_else(|e| CollectionOutcome::from_error(Collection::Sales, &e)),
            None => CollectionOutcome::NothingLocal,
        };

        Ok(MigrationReport { products, sales })
    }
}

fn parse_local<T: serde::de::DeserializeOwned>(json: &str, key: SnapshotKey) -> Result<Vec<T>> {
    serde_json::from_str(json).map_err(|e| Error::Migration {
        message: format!("local {} is unreadable: {e}", key.as_str()),
    })
}

async fn migrate_products(
    store: &DocumentStore,
    local: &LocalSnapshotStore,
    json: &str,
) -> Result<CollectionOutcome> {
    let records: Vec<ProductRecord> = parse_local(json, SnapshotKey::Products)?;
    if records.is_empty() {
        local.remove(SnapshotKey::Products)?;
        return Ok(CollectionOutcome::NothingLocal);
    }

    let today = status::today();
    let mut batch = store.open_batch();
    batch
        .push(BatchOp::RequireEmpty(Collection::Inventory))
        .push(BatchOp::ClaimKey(INVENTORY_CLAIM_KEY.to_string()));
    for record in &records {
        let mut model = normalize(&record.to_draft(), today)?.to_active_model();
        model.old_id = Set(record.id.as_ref().map(ToString::to_string));
        batch.push(BatchOp::InsertProduct(model));
    }
    let count = batch.commit().await?.products.len();
    info!("Migrated {} products", count);

    local.remove(SnapshotKey::Products)?;
    Ok(CollectionOutcome::Migrated { count })
}

async fn migrate_sales(
    store: &DocumentStore,
    local: &LocalSnapshotStore,
    json: &str,
) -> Result<CollectionOutcome> {
    let records: Vec<SaleRecord> = parse_local(json, SnapshotKey::Sales)?;
    if records.is_empty() {
        local.remove(SnapshotKey::Sales)?;
        return Ok(CollectionOutcome::NothingLocal);
    }

    let mut batch = store.open_batch();
    batch
        .push(BatchOp::RequireEmpty(Collection::Sales))
        .push(BatchOp::ClaimKey(SALES_CLAIM_KEY.to_string()));
    for record in &records {
        batch.push(BatchOp::InsertSale(record.to_active_model()?));
    }
    let count = batch.commit().await?.sales.len();
    info!("Migrated {} sale records", count);

    local.remove(SnapshotKey::Sales)?;
    Ok(CollectionOutcome::Migrated { count })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    const LOCAL_PRODUCTS: &str = r#"[
        {"id": "p-1", "name": "dipirona", "batch": "d1", "quantity": 4, "expiryDate": "2031-01-01"},
        {"id": "p-2", "name": "aas", "batch": "a1", "quantity": 0, "expiryDate": "2020-01-01"},
        {"id": 3, "name": "gaze", "batch": "g1", "quantity": 9, "expiryDate": "2031-06-01",
         "status": "expired", "daysRemaining": -4}
    ]"#;

    const LOCAL_SALES: &str = r#"[
        {"id": 11, "name": "AAS", "batch": "A1", "quantity": 2, "expiryDate": "2023-05-20",
         "status": "safe", "daysRemaining": 400, "quantitySold": 1, "sellerId": "M-1",
         "saleDate": "2023-05-01T10:00:00Z"},
        {"id": 12, "name": "GAZE", "batch": "G1", "quantity": 9, "expiryDate": "2031-06-01",
         "quantitySold": 3, "sellerId": "M-2", "saleDate": "2023-05-02T10:00:00Z"}
    ]"#;

    fn local_store(dir: &tempfile::TempDir) -> LocalSnapshotStore {
        LocalSnapshotStore::new(dir.path())
    }

    #[tokio::test]
    async fn test_migrates_local_products_once() -> Result<()> {
        let store = setup_test_store().await?;
        let dir = tempfile::tempdir()?;
        let local = local_store(&dir);
        local.write(SnapshotKey::Products, LOCAL_PRODUCTS)?;

        let reconciler = MigrationReconciler::new(Duration::ZERO);
        let report = reconciler.run(&store, &local).await?;
        assert_eq!(report.products, CollectionOutcome::Migrated { count: 3 });
        assert_eq!(report.sales, CollectionOutcome::NothingLocal);
        assert_eq!(local.read(SnapshotKey::Products)?, None);

        let snapshot = store.subscribe_inventory().current();
        assert_eq!(snapshot.len(), 3);
        let old_ids: Vec<_> = snapshot
            .documents()
            .iter()
            .map(|p| p.old_id.clone().unwrap())
            .collect();
        assert_eq!(old_ids, vec!["p-1", "p-2", "3"]);
        // Recorded status is recomputed from the expiry date
        assert_eq!(snapshot.documents()[2].status, crate::entities::ExpiryStatus::Safe);

        // Local data reappearing later never duplicates the inventory
        local.write(SnapshotKey::Products, LOCAL_PRODUCTS)?;
        let report = reconciler.run(&store, &local).await?;
        assert_eq!(report.products, CollectionOutcome::RemoteNotEmpty);
        assert_eq!(store.subscribe_inventory().current().len(), 3);
        assert!(local.read(SnapshotKey::Products)?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_migrates_sales_history() -> Result<()> {
        let store = setup_test_store().await?;
        let dir = tempfile::tempdir()?;
        let local = local_store(&dir);
        local.write(SnapshotKey::Sales, LOCAL_SALES)?;

        let report = MigrationReconciler::new(Duration::ZERO)
            .run(&store, &local)
            .await?;
        assert_eq!(report.products, CollectionOutcome::NothingLocal);
        assert_eq!(report.sales, CollectionOutcome::Migrated { count: 2 });
        assert_eq!(local.read(SnapshotKey::Sales)?, None);

        let sales = store.subscribe_sales().current();
        assert_eq!(sales.len(), 2);
        // Newest first
        assert_eq!(sales.documents()[0].old_id.as_deref(), Some("12"));
        // Status reflects the day of the sale, not the day of the migration
        assert_eq!(
            sales.documents()[1].status,
            crate::entities::ExpiryStatus::Critical
        );
        assert!((18..=20).contains(&sales.documents()[1].days_remaining));
        Ok(())
    }

    #[tokio::test]
    async fn test_nothing_to_migrate() -> Result<()> {
        let store = setup_test_store().await?;
        let dir = tempfile::tempdir()?;
        let report = MigrationReconciler::new(Duration::ZERO)
            .run(&store, &local_store(&dir))
            .await?;
        assert_eq!(report.products, CollectionOutcome::NothingLocal);
        assert_eq!(report.sales, CollectionOutcome::NothingLocal);
        assert!(!report.has_failures());
        Ok(())
    }

    #[tokio::test]
    async fn test_populated_store_skips_migration() -> Result<()> {
        let store = setup_test_store().await?;
        create_test_product(&store, "EXISTENTE", 1, 10).await?;
        let dir = tempfile::tempdir()?;
        let local = local_store(&dir);
        local.write(SnapshotKey::Products, LOCAL_PRODUCTS)?;
        local.write(SnapshotKey::Sales, LOCAL_SALES)?;

        let report = MigrationReconciler::new(Duration::ZERO)
            .run(&store, &local)
            .await?;
        assert_eq!(report.products, CollectionOutcome::RemoteNotEmpty);
        assert_eq!(report.sales, CollectionOutcome::NotAttempted);
        assert_eq!(store.subscribe_inventory().current().len(), 1);
        assert!(store.subscribe_sales().current().is_empty());
        assert!(local.read(SnapshotKey::Sales)?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_claimed_migration_is_not_repeated() -> Result<()> {
        let store = setup_test_store().await?;
        let mut claim = store.open_batch();
        claim.push(BatchOp::ClaimKey(INVENTORY_CLAIM_KEY.to_string()));
        claim.commit().await?;

        let dir = tempfile::tempdir()?;
        let local = local_store(&dir);
        local.write(SnapshotKey::Products, LOCAL_PRODUCTS)?;

        let report = MigrationReconciler::new(Duration::ZERO)
            .run(&store, &local)
            .await?;
        assert_eq!(report.products, CollectionOutcome::AlreadyClaimed);
        assert!(store.subscribe_inventory().current().is_empty());
        assert!(local.read(SnapshotKey::Products)?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_unreadable_local_data_is_kept() -> Result<()> {
        let store = setup_test_store().await?;
        let dir = tempfile::tempdir()?;
        let local = local_store(&dir);
        local.write(SnapshotKey::Products, "{not json")?;

        let report = MigrationReconciler::new(Duration::ZERO)
            .run(&store, &local)
            .await?;
        assert!(matches!(report.products, CollectionOutcome::Failed { .. }));
        assert!(report.has_failures());
        assert_eq!(local.read(SnapshotKey::Products)?.as_deref(), Some("{not json"));
        assert!(store.subscribe_inventory().current().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_runs_are_rejected() -> Result<()> {
        let store = setup_test_store().await?;
        let dir = tempfile::tempdir()?;
        let local = local_store(&dir);
        local.write(SnapshotKey::Products, LOCAL_PRODUCTS)?;

        let reconciler = MigrationReconciler::new(Duration::from_millis(50));
        let (first, second) = tokio::join!(
            reconciler.run(&store, &local),
            reconciler.run(&store, &local)
        );
        assert_eq!(first?.products, CollectionOutcome::Migrated { count: 3 });
        assert!(matches!(second, Err(Error::MigrationInProgress)));
        assert!(!reconciler.is_running());
        assert_eq!(store.subscribe_inventory().current().len(), 3);
        Ok(())
    }
}
