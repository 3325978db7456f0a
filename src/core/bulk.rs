//! Bulk mutations - one atomic batch per multi-select action.
//!
//! Batches are all-or-nothing: if the store rejects the commit, no document is changed.
//! Deleting an id that another client already removed is not an error; it is skipped.
//! The store's own batch-size limit is not enforced here.

use crate::{
    entities::{product, sale},
    errors::{Error, Result},
    store::{BatchOp, DocumentStore},
};
use sea_orm::Set;
use std::collections::BTreeSet;
use tracing::info;

/// Operation applied to every selected product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkOperation {
    /// Remove the products
    Delete,
    /// Overwrite the stock of every product
    SetQuantity(i64),
}

/// Applies `operation` to every product in `ids` inside one batch.
///
/// Duplicate ids are collapsed. Returns the number of products affected; ids already
/// deleted elsewhere do not count.
///
/// # Errors
/// Returns an error if a quantity is negative, a product to update does not exist or the
/// batch is rejected; nothing is changed in that case.
pub async fn apply_to_products(
    store: &DocumentStore,
    ids: &[i64],
    operation: BulkOperation,
) -> Result<usize> {
    let ids: BTreeSet<i64> = ids.iter().copied().collect();
    if ids.is_empty() {
        return Ok(0);
    }
    if let BulkOperation::SetQuantity(quantity) = operation {
        if quantity < 0 {
            return Err(Error::InvalidQuantity { quantity });
        }
    }

    let mut batch = store.open_batch();
    for &id in &ids {
        let op = match operation {
            BulkOperation::Delete => BatchOp::DeleteProduct(id),
            BulkOperation::SetQuantity(quantity) => BatchOp::UpdateProduct(product::ActiveModel {
                id: sea_orm::ActiveValue::Unchanged(id),
                quantity: Set(quantity),
                updated_at: Set(chrono::Utc::now().naive_utc()),
                ..Default::default()
            }),
        };
        batch.push(op);
    }
    let receipt = batch.commit().await?;
    let affected = match operation {
        BulkOperation::Delete => receipt.deleted_products,
        BulkOperation::SetQuantity(_) => receipt.products.len(),
    };
    info!("Bulk {:?} applied to {} products", operation, affected);
    Ok(affected)
}

/// Deletes every product in `ids` atomically.
pub async fn delete_products(store: &DocumentStore, ids: &[i64]) -> Result<usize> {
    apply_to_products(store, ids, BulkOperation::Delete).await
}

/// Erases the given (currently loaded) sale records in one batch.
pub async fn clear_sales_history(store: &DocumentStore, sales: &[sale::Model]) -> Result<usize> {
    if sales.is_empty() {
        return Ok(0);
    }
    let mut batch = store.open_batch();
    for record in sales {
        batch.push(BatchOp::DeleteSale(record.id));
    }
    let cleared = batch.commit().await?.deleted_sales;
    info!("Sales history cleared ({} records)", cleared);
    Ok(cleared)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_delete_ten_products() -> Result<()> {
        let store = setup_test_store().await?;
        let mut ids = Vec::new();
        for i in 0..10 {
            ids.push(create_test_product(&store, &format!("ITEM {i}"), 1, 40).await?.id);
        }
        let survivor = create_test_product(&store, "SURVIVOR", 1, 40).await?;

        let deleted = delete_products(&store, &ids).await?;

        assert_eq!(deleted, 10);
        let remaining = store.subscribe_inventory().current();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining.documents()[0].id, survivor.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_skips_products_removed_elsewhere() -> Result<()> {
        let store = setup_test_store().await?;
        let a = create_test_product(&store, "A", 1, 40).await?;
        let b = create_test_product(&store, "B", 1, 40).await?;
        // Another client removed `b` after it was selected
        store.delete_product(b.id).await?;

        let deleted = delete_products(&store, &[a.id, b.id]).await?;

        assert_eq!(deleted, 1);
        assert!(store.subscribe_inventory().current().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_rejected_batch_changes_nothing() -> Result<()> {
        let store = setup_test_store().await?;
        let mut ids = Vec::new();
        for i in 0..9 {
            ids.push(create_test_product(&store, &format!("ITEM {i}"), 3, 40).await?.id);
        }
        ids.push(12_345);

        let result = apply_to_products(&store, &ids, BulkOperation::SetQuantity(0)).await;

        assert!(matches!(result, Err(Error::ProductNotFound { id: 12_345 })));
        let snapshot = store.subscribe_inventory().current();
        assert!(snapshot.documents().iter().all(|p| p.quantity == 3));
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_selection_is_a_no_op() -> Result<()> {
        let store = setup_test_store().await?;
        assert_eq!(delete_products(&store, &[]).await?, 0);
        assert_eq!(clear_sales_history(&store, &[]).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_bulk_set_quantity() -> Result<()> {
        let store = setup_test_store().await?;
        let a = create_test_product(&store, "A", 5, 40).await?;
        let b = create_test_product(&store, "B", 7, 40).await?;

        let affected =
            apply_to_products(&store, &[a.id, b.id, a.id], BulkOperation::SetQuantity(0)).await?;

        assert_eq!(affected, 2);
        assert!(store.find_product(a.id).await?.unwrap().is_sold_out());
        let b_after = store.find_product(b.id).await?.unwrap();
        assert_eq!(b_after.quantity, 0);
        assert_eq!(b_after.name, "B");

        let result = apply_to_products(&store, &[a.id], BulkOperation::SetQuantity(-3)).await;
        assert!(matches!(result, Err(Error::InvalidQuantity { quantity: -3 })));
        Ok(())
    }

    #[tokio::test]
    async fn test_clear_sales_history() -> Result<()> {
        let store = setup_test_store().await?;
        let product = create_test_product(&store, "A", 5, 40).await?;
        crate::core::sale::record_sale(&store, product.id, 1, "M-1").await?;
        crate::core::sale::record_sale(&store, product.id, 2, "M-2").await?;

        let sales = store.subscribe_sales().current();
        let cleared = clear_sales_history(&store, sales.documents()).await?;

        assert_eq!(cleared, 2);
        // Clearing a stale list again removes nothing and does not fail
        assert_eq!(clear_sales_history(&store, sales.documents()).await?, 0);
        assert!(store.subscribe_sales().current().is_empty());
        // Inventory untouched
        assert_eq!(store.find_product(product.id).await?.unwrap().quantity, 2);
        Ok(())
    }
}
