//! Atomic multi-document writes.
//!
//! A [`WriteBatch`] collects operations and applies them inside one database transaction on
//! [`WriteBatch::commit`]. Any failing operation aborts the transaction, so either every
//! operation is visible in the next snapshot or none is.

use super::{Collection, DocumentStore};
use crate::{
    entities::{
        Product, Sale, SystemState, product, product::CATALOG_BATCH, sale, system_state,
    },
    errors::{Error, Result},
};
use sea_orm::{ActiveValue, DatabaseTransaction, PaginatorTrait, Set, TransactionTrait, prelude::*};
use tracing::{debug, error, info};

/// One operation inside a [`WriteBatch`].
#[derive(Debug, Clone)]
pub enum BatchOp {
    /// Create a new inventory document
    InsertProduct(product::ActiveModel),
    /// Create a catalog reference unless one already exists for the same EAN
    EnsureCatalogEntry(product::ActiveModel),
    /// Partially update an existing inventory document; the id must be set
    UpdateProduct(product::ActiveModel),
    /// Subtract sold units from a product, clamping at zero
    DecrementStock {
        /// Product to decrement
        id: i64,
        /// Units sold
        by: i64,
    },
    /// Remove an inventory document; a document already gone is skipped
    DeleteProduct(i64),
    /// Create a new sale document; `sale_date` is filled in by the store when not set
    InsertSale(sale::ActiveModel),
    /// Remove a sale document; a document already gone is skipped
    DeleteSale(i64),
    /// Fail the batch unless the collection holds no documents
    RequireEmpty(Collection),
    /// Write a one-shot marker; fails the batch if the key already exists
    ClaimKey(String),
    /// Fail the batch if any inventory document already carries this EAN
    RequireUnusedEan(String),
}

impl BatchOp {
    const fn collection(&self) -> Option<Collection> {
        match self {
            Self::InsertProduct(_)
            | Self::EnsureCatalogEntry(_)
            | Self::UpdateProduct(_)
            | Self::DecrementStock { .. }
            | Self::DeleteProduct(_) => Some(Collection::Inventory),
            Self::InsertSale(_) | Self::DeleteSale(_) => Some(Collection::Sales),
            Self::RequireEmpty(_) | Self::ClaimKey(_) | Self::RequireUnusedEan(_) => None,
        }
    }
}

/// Documents written by a committed batch, in operation order.
#[derive(Debug, Clone, Default)]
pub struct BatchReceipt {
    /// Inventory documents created or updated
    pub products: Vec<product::Model>,
    /// Sale documents created
    pub sales: Vec<sale::Model>,
    /// Number of inventory documents removed
    pub deleted_products: usize,
    /// Number of sale documents removed
    pub deleted_sales: usize,
}

/// Pending atomic write against a [`DocumentStore`].
pub struct WriteBatch<'a> {
    store: &'a DocumentStore,
    ops: Vec<BatchOp>,
}

impl<'a> WriteBatch<'a> {
    pub(crate) const fn new(store: &'a DocumentStore) -> Self {
        Self {
            store,
            ops: Vec::new(),
        }
    }

    /// Queues an operation.
    pub fn push(&mut self, op: BatchOp) -> &mut Self {
        self.ops.push(op);
        self
    }

    /// Number of queued operations
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether nothing has been queued
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Applies every queued operation atomically, then publishes fresh snapshots of the
    /// touched collections.
    ///
    /// Once the transaction commits the batch has succeeded; a failed re-read only marks the
    /// snapshot with its error.
    ///
    /// # Errors
    /// Returns the first failing operation's error; nothing from the batch is persisted.
    pub async fn commit(self) -> Result<BatchReceipt> {
        let Self { store, ops } = self;
        let touches_inventory = ops
            .iter()
            .any(|op| op.collection() == Some(Collection::Inventory));
        let touches_sales = ops
            .iter()
            .any(|op| op.collection() == Some(Collection::Sales));
        let op_count = ops.len();

        let txn = store.connection().begin().await?;
        let mut receipt = BatchReceipt::default();
        for op in ops {
            if let Err(e) = apply(&txn, op, &mut receipt).await {
                error!("Batch of {} operations rejected: {}", op_count, e);
                // Dropping the transaction rolls it back
                return Err(e);
            }
        }
        txn.commit().await.inspect_err(|e| {
            error!("Batch of {} operations failed to commit: {}", op_count, e);
        })?;
        info!("Committed batch of {} operations", op_count);

        if touches_inventory {
            store.refresh_after_write(Collection::Inventory).await;
        }
        if touches_sales {
            store.refresh_after_write(Collection::Sales).await;
        }
        Ok(receipt)
    }
}

async fn apply(txn: &DatabaseTransaction, op: BatchOp, receipt: &mut BatchReceipt) -> Result<()> {
    match op {
        BatchOp::InsertProduct(model) => {
            receipt.products.push(model.insert(txn).await?);
        }
        BatchOp::EnsureCatalogEntry(model) => {
            let ean = match &model.ean {
                ActiveValue::Set(Some(ean)) | ActiveValue::Unchanged(Some(ean)) => ean.clone(),
                _ => return Ok(()),
            };
            let existing = Product::find()
                .filter(product::Column::Batch.eq(CATALOG_BATCH))
                .filter(product::Column::Ean.eq(ean.as_str()))
                .count(txn)
                .await?;
            if existing == 0 {
                debug!("Registering catalog reference for EAN {}", ean);
                receipt.products.push(model.insert(txn).await?);
            }
        }
        BatchOp::UpdateProduct(model) => {
            let id = match &model.id {
                ActiveValue::Set(id) | ActiveValue::Unchanged(id) => *id,
                ActiveValue::NotSet => {
                    return Err(Error::Validation {
                        field: "id",
                        message: "update requires a product id".to_string(),
                    });
                }
            };
            if Product::find_by_id(id).one(txn).await?.is_none() {
                return Err(Error::ProductNotFound { id });
            }
            receipt.products.push(model.update(txn).await?);
        }
        BatchOp::DecrementStock { id, by } => {
            let current = Product::find_by_id(id)
                .one(txn)
                .await?
                .ok_or(Error::ProductNotFound { id })?;
            if current.is_catalog_entry() {
                return Err(Error::CatalogEntryNotSellable { id });
            }
            if by > current.quantity {
                return Err(Error::InsufficientStock {
                    available: current.quantity,
                    requested: by,
                });
            }
            let remaining = (current.quantity - by).max(0);
            let mut active: product::ActiveModel = current.into();
            active.quantity = Set(remaining);
            active.updated_at = Set(chrono::Utc::now().naive_utc());
            receipt.products.push(active.update(txn).await?);
        }
        BatchOp::DeleteProduct(id) => {
            let result = Product::delete_by_id(id).exec(txn).await?;
            if result.rows_affected == 0 {
                debug!("Product {} already removed", id);
            } else {
                receipt.deleted_products += 1;
            }
        }
        BatchOp::InsertSale(mut model) => {
            if matches!(model.sale_date, ActiveValue::NotSet) {
                model.sale_date = Set(chrono::Utc::now());
            }
            receipt.sales.push(model.insert(txn).await?);
        }
        BatchOp::DeleteSale(id) => {
            let result = Sale::delete_by_id(id).exec(txn).await?;
            if result.rows_affected == 0 {
                debug!("Sale record {} already removed", id);
            } else {
                receipt.deleted_sales += 1;
            }
        }
        BatchOp::RequireEmpty(collection) => {
            let count = match collection {
                Collection::Inventory => Product::find().count(txn).await?,
                Collection::Sales => Sale::find().count(txn).await?,
            };
            if count > 0 {
                return Err(Error::CollectionNotEmpty {
                    collection: collection.name(),
                });
            }
        }
        BatchOp::ClaimKey(key) => {
            let existing = SystemState::find()
                .filter(system_state::Column::Key.eq(key.as_str()))
                .one(txn)
                .await?;
            if existing.is_some() {
                return Err(Error::AlreadyClaimed { key });
            }
            let now = chrono::Utc::now();
            system_state::ActiveModel {
                key: Set(key),
                value: Set(now.to_rfc3339()),
                updated_at: Set(now.naive_utc()),
                ..Default::default()
            }
            .insert(txn)
            .await?;
        }
        BatchOp::RequireUnusedEan(ean) => {
            let existing = Product::find()
                .filter(product::Column::Ean.eq(ean.as_str()))
                .count(txn)
                .await?;
            if existing > 0 {
                return Err(Error::DuplicateEan { ean });
            }
        }
    }
    Ok(())
}
