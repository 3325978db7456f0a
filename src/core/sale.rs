//! Sale business logic - Records a sale and decrements stock in one atomic batch.
//!
//! The sale document is a full copy of the product plus the sale metadata; the product's
//! quantity is reduced by the units sold and clamped at zero. A product that reaches zero
//! stays listed as sold-out; removing it is a separate action.

use crate::{
    entities::{product, sale},
    errors::{Error, Result},
    store::{BatchOp, DocumentStore},
};
use sea_orm::{ActiveValue, Set};
use tracing::{info, warn};

/// Outcome of [`record_sale`].
#[derive(Debug, Clone)]
pub struct SaleReceipt {
    /// The new sale record
    pub sale: sale::Model,
    /// The product after the stock decrement
    pub product: product::Model,
}

impl SaleReceipt {
    /// Whether this sale emptied the product's stock
    #[must_use]
    pub const fn sold_out(&self) -> bool {
        self.product.is_sold_out()
    }
}

/// Builds the sale document for `product`. `sale_date` is left for the store to fill in.
#[must_use]
pub fn sale_snapshot(
    product: &product::Model,
    quantity_sold: i64,
    seller_id: &str,
) -> sale::ActiveModel {
    sale::ActiveModel {
        product_id: Set(Some(product.id)),
        name: Set(product.name.clone()),
        batch: Set(product.batch.clone()),
        quantity: Set(product.quantity),
        expiry_date: Set(product.expiry_date),
        days_remaining: Set(product.days_remaining),
        status: Set(product.status),
        ean: Set(product.ean.clone()),
        registration: Set(product.registration.clone()),
        section: Set(product.section.clone()),
        transfer: Set(product.transfer.clone()),
        notes: Set(product.notes.clone()),
        quantity_sold: Set(quantity_sold),
        seller_id: Set(seller_id.to_string()),
        sale_date: ActiveValue::NotSet,
        old_id: Set(None),
        ..Default::default()
    }
}

/// Records a sale of `quantity_sold` units of a product.
///
/// The stock check is repeated inside the batch, so two concurrent sales cannot both take
/// the last units.
///
/// # Errors
/// Returns an error if:
/// - `quantity_sold` is not positive
/// - `seller_id` is blank
/// - The product does not exist or is a catalog reference
/// - `quantity_sold` exceeds the product's stock
/// - The store rejects the batch (nothing is written in that case)
pub async fn record_sale(
    store: &DocumentStore,
    product_id: i64,
    quantity_sold: i64,
    seller_id: &str,
) -> Result<SaleReceipt> {
    if quantity_sold <= 0 {
        return Err(Error::InvalidQuantity {
            quantity: quantity_sold,
        });
    }
    let seller_id = seller_id.trim();
    if seller_id.is_empty() {
        return Err(Error::Validation {
            field: "seller_id",
            message: "Seller registration is required".to_string(),
        });
    }

    let product = store
        .find_product(product_id)
        .await?
        .ok_or(Error::ProductNotFound { id: product_id })?;
    if product.is_catalog_entry() {
        return Err(Error::CatalogEntryNotSellable { id: product_id });
    }
    if quantity_sold > product.quantity {
        warn!(
            "Rejected sale of {} units of {} ({} in stock)",
            quantity_sold, product.name, product.quantity
        );
        return Err(Error::InsufficientStock {
            available: product.quantity,
            requested: quantity_sold,
        });
    }

    let mut batch = store.open_batch();
    batch
        .push(BatchOp::InsertSale(sale_snapshot(
            &product,
            quantity_sold,
            seller_id,
        )))
        .push(BatchOp::DecrementStock {
            id: product_id,
            by: quantity_sold,
        });
    let mut receipt = batch.commit().await?;

    let missing = || Error::Validation {
        field: "sale",
        message: "store returned no document for the sale".to_string(),
    };
    let sale = receipt.sales.pop().ok_or_else(missing)?;
    let product = receipt.products.pop().ok_or_else(missing)?;
    let receipt = SaleReceipt { sale, product };

    if receipt.sold_out() {
        info!("{} sold out by {}", receipt.product.name, seller_id);
    } else {
        info!(
            "Sold {} of {} ({} left)",
            quantity_sold, receipt.product.name, receipt.product.quantity
        );
    }
    Ok(receipt)
}
