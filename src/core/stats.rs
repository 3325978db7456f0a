//! Dashboard tile counts.

use crate::entities::{ExpiryStatus, product};

/// Per-status counts over real stock (catalog references excluded).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InventoryStats {
    /// Number of stocked products
    pub total: usize,
    /// Products past their expiry date
    pub expired: usize,
    /// Products inside the critical window
    pub critical: usize,
    /// Products with more than the critical window left
    pub safe: usize,
}

/// Counts products by their stored status. Status is not recomputed here.
#[must_use]
pub fn compute(products: &[product::Model]) -> InventoryStats {
    products
        .iter()
        .filter(|p| !p.is_catalog_entry())
        .fold(InventoryStats::default(), |mut stats, p| {
            stats.total += 1;
            match p.status {
                ExpiryStatus::Expired => stats.expired += 1,
                ExpiryStatus::Critical => stats.critical += 1,
                ExpiryStatus::Safe => stats.safe += 1,
            }
            stats
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::product::CATALOG_BATCH;
    use crate::test_utils::product_fixture;

    #[test]
    fn test_counts_by_status() {
        let mut products = vec![
            product_fixture(1, "A", ExpiryStatus::Expired),
            product_fixture(2, "B", ExpiryStatus::Critical),
            product_fixture(3, "C", ExpiryStatus::Critical),
            product_fixture(4, "D", ExpiryStatus::Safe),
        ];
        let mut catalog = product_fixture(5, "E", ExpiryStatus::Expired);
        catalog.batch = CATALOG_BATCH.to_string();
        products.push(catalog);

        let stats = compute(&products);
        assert_eq!(
            stats,
            InventoryStats {
                total: 4,
                expired: 1,
                critical: 2,
                safe: 1,
            }
        );
        assert_eq!(stats.total, stats.expired + stats.critical + stats.safe);
    }

    #[test]
    fn test_empty_list() {
        assert_eq!(compute(&[]), InventoryStats::default());
    }
}
