//! Document store - the remote collections the dashboard reads and writes.
//!
//! [`DocumentStore`] wraps a `SeaORM` connection and exposes the collection operations the
//! core relies on: live subscriptions, single-document writes and atomic batches. Each
//! collection has a single writer (the store's refresh after a write) feeding a `watch`
//! channel; any number of readers subscribe and always receive the full, latest list.

/// Atomic multi-document writes
pub mod batch;
/// Snapshots and subscriptions
pub mod snapshot;

pub use batch::{BatchOp, BatchReceipt, WriteBatch};
pub use snapshot::{Snapshot, Subscription};

use crate::{
    entities::{Product, Sale, product, sale},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, prelude::*};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Collections held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Product documents
    Inventory,
    /// Sale records, fed newest first
    Sales,
}

impl Collection {
    /// Collection name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Inventory => "inventory",
            Self::Sales => "sales",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Remote document store backed by a `SeaORM` connection.
pub struct DocumentStore {
    db: DatabaseConnection,
    inventory: watch::Sender<Snapshot<product::Model>>,
    sales: watch::Sender<Snapshot<sale::Model>>,
}

impl DocumentStore {
    /// Wraps an existing connection. Snapshots stay pending until [`Self::load`] runs.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        let (inventory, _) = watch::channel(Snapshot::pending());
        let (sales, _) = watch::channel(Snapshot::pending());
        Self {
            db,
            inventory,
            sales,
        }
    }

    /// Creates missing tables, wraps the connection and publishes the initial snapshots.
    pub async fn open(db: DatabaseConnection) -> Result<Self> {
        crate::config::database::create_tables(&db).await?;
        let store = Self::new(db);
        store.load().await?;
        Ok(store)
    }

    /// Loads both collections, signalling loading-complete to every subscriber.
    pub async fn load(&self) -> Result<()> {
        self.refresh(Collection::Inventory).await?;
        self.refresh(Collection::Sales).await?;
        info!(
            "Store loaded: {} products, {} sales",
            self.inventory.borrow().len(),
            self.sales.borrow().len()
        );
        Ok(())
    }

    /// Underlying connection
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Live feed of the `inventory` collection.
    #[must_use]
    pub fn subscribe_inventory(&self) -> Subscription<product::Model> {
        Subscription::new(Collection::Inventory, self.inventory.subscribe())
    }

    /// Live feed of the `sales` collection, ordered by `sale_date` descending.
    #[must_use]
    pub fn subscribe_sales(&self) -> Subscription<sale::Model> {
        Subscription::new(Collection::Sales, self.sales.subscribe())
    }

    /// Re-reads a collection and publishes it as a new snapshot.
    ///
    /// On failure the previous documents are kept and the error is attached to the snapshot.
    pub async fn refresh(&self, collection: Collection) -> Result<()> {
        match collection {
            Collection::Inventory => {
                let result = Product::find()
                    .order_by_asc(product::Column::Id)
                    .all(&self.db)
                    .await;
                Self::publish(&self.inventory, collection, result)
            }
            Collection::Sales => {
                let result = Sale::find()
                    .order_by_desc(sale::Column::SaleDate)
                    .order_by_desc(sale::Column::Id)
                    .all(&self.db)
                    .await;
                Self::publish(&self.sales, collection, result)
            }
        }
    }

    /// Refresh that follows a committed write. The write stands either way, so a failed
    /// re-read is logged and left on the snapshot instead of being returned.
    pub(crate) async fn refresh_after_write(&self, collection: Collection) {
        if let Err(e) = self.refresh(collection).await {
            warn!("{} written but not re-read: {}", collection, e);
        }
    }

    fn publish<T>(
        tx: &watch::Sender<Snapshot<T>>,
        collection: Collection,
        result: std::result::Result<Vec<T>, DbErr>,
    ) -> Result<()> {
        match result {
            Ok(documents) => {
                debug!("Publishing {} snapshot ({} documents)", collection, documents.len());
                tx.send_replace(Snapshot::loaded(documents));
                Ok(())
            }
            Err(e) => {
                error!("Failed to refresh {}: {}", collection, e);
                let failed = tx.borrow().with_error(e.to_string());
                tx.send_replace(failed);
                Err(e.into())
            }
        }
    }

    /// Starts an atomic batch.
    #[must_use]
    pub const fn open_batch(&self) -> WriteBatch<'_> {
        WriteBatch::new(self)
    }

    /// Retrieves one product by id.
    pub async fn find_product(&self, id: i64) -> Result<Option<product::Model>> {
        Product::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(Into::into)
    }

    /// Creates a single inventory document and returns it with its assigned id.
    pub async fn create_product(&self, data: product::ActiveModel) -> Result<product::Model> {
        let created = data.insert(&self.db).await?;
        debug!("Created product {} ({})", created.id, created.name);
        self.refresh_after_write(Collection::Inventory).await;
        Ok(created)
    }

    /// Applies a partial update to an existing inventory document.
    pub async fn update_product(
        &self,
        id: i64,
        mut data: product::ActiveModel,
    ) -> Result<product::Model> {
        if self.find_product(id).await?.is_none() {
            return Err(Error::ProductNotFound { id });
        }
        data.id = sea_orm::ActiveValue::Unchanged(id);
        let updated = data.update(&self.db).await?;
        debug!("Updated product {}", id);
        self.refresh_after_write(Collection::Inventory).await;
        Ok(updated)
    }

    /// Removes one inventory document. Its sale records are kept.
    pub async fn delete_product(&self, id: i64) -> Result<()> {
        let result = Product::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(Error::ProductNotFound { id });
        }
        debug!("Deleted product {}", id);
        self.refresh_after_write(Collection::Inventory).await;
        Ok(())
    }
}
