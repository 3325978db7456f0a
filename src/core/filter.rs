//! Table filtering and sorting.
//!
//! Filtering never synthesizes or reorders entries: the output is a subsequence of the
//! input. Sorting by name is a separate, optional step.

use crate::{
    entities::{ExpiryStatus, product},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use std::str::FromStr;

/// Status selector of the filter bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    /// Every stocked product
    #[default]
    All,
    /// Only catalog references
    Catalog,
    /// Only stocked products with this status
    Status(ExpiryStatus),
}

impl FromStr for StatusFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" => Ok(Self::All),
            "catalog" => Ok(Self::Catalog),
            "safe" => Ok(Self::Status(ExpiryStatus::Safe)),
            "critical" => Ok(Self::Status(ExpiryStatus::Critical)),
            "expired" => Ok(Self::Status(ExpiryStatus::Expired)),
            other => Err(Error::Validation {
                field: "status",
                message: format!("unknown status filter '{other}'"),
            }),
        }
    }
}

/// Name ordering; toggles unsorted, ascending, descending, unsorted again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Arrival order
    #[default]
    Unsorted,
    /// A to Z
    Ascending,
    /// Z to A
    Descending,
}

impl SortOrder {
    /// Next state of the sort toggle.
    #[must_use]
    pub const fn toggle(self) -> Self {
        match self {
            Self::Unsorted => Self::Ascending,
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Unsorted,
        }
    }
}

/// Every filter of the dashboard. `Default` is the cleared state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    /// Matched against name, batch and EAN
    pub search_term: String,
    /// Status selector
    pub status_filter: StatusFilter,
    /// Earliest expiry date to keep
    pub start_date: Option<NaiveDate>,
    /// Latest expiry date to keep
    pub end_date: Option<NaiveDate>,
    /// Matched against the registration tag
    pub vendor: String,
    /// Matched against the section tag
    pub section: String,
    /// Matched against the transfer tag
    pub transfer: String,
}

impl FilterCriteria {
    /// Whether no filter beyond the catalog partition is active.
    #[must_use]
    pub fn is_cleared(&self) -> bool {
        *self == Self::default()
    }

    fn matches(&self, product: &product::Model) -> bool {
        // Taken as typed; surrounding spaces are part of the term
        let term = self.search_term.to_lowercase();
        if !term.is_empty() {
            let hit = product.name.to_lowercase().contains(&term)
                || product.batch.to_lowercase().contains(&term)
                || product
                    .ean
                    .as_deref()
                    .is_some_and(|ean| ean.to_lowercase().contains(&term));
            if !hit {
                return false;
            }
        }

        if let StatusFilter::Status(status) = self.status_filter {
            if product.status != status {
                return false;
            }
        }

        // `None < Some(_)`, so undated entries fall below any start date and never above
        // an end date, the same as comparing an empty string.
        if self.start_date.is_some() && product.expiry_date < self.start_date {
            return false;
        }
        if self.end_date.is_some() && product.expiry_date > self.end_date {
            return false;
        }

        tag_matches(product.registration.as_deref(), &self.vendor)
            && tag_matches(product.section.as_deref(), &self.section)
            && tag_matches(product.transfer.as_deref(), &self.transfer)
    }
}

fn tag_matches(value: Option<&str>, filter: &str) -> bool {
    let filter = filter.trim();
    if filter.is_empty() {
        return true;
    }
    value
        .unwrap_or_default()
        .to_uppercase()
        .contains(&filter.to_uppercase())
}

/// Applies the catalog partition and every filter, preserving input order.
#[must_use]
pub fn filter_products<'a>(
    products: &'a [product::Model],
    criteria: &FilterCriteria,
) -> Vec<&'a product::Model> {
    let want_catalog = criteria.status_filter == StatusFilter::Catalog;
    products
        .iter()
        .filter(|p| p.is_catalog_entry() == want_catalog)
        .filter(|p| criteria.matches(p))
        .collect()
}

/// Stable sort by name; `Unsorted` leaves the order alone.
pub fn sort_by_name(rows: &mut [&product::Model], order: SortOrder) {
    match order {
        SortOrder::Unsorted => {}
        SortOrder::Ascending => rows.sort_by(|a, b| a.name.cmp(&b.name)),
        SortOrder::Descending => rows.sort_by(|a, b| b.name.cmp(&a.name)),
    }
}

/// Filters then sorts.
#[must_use]
pub fn apply<'a>(
    products: &'a [product::Model],
    criteria: &FilterCriteria,
    order: SortOrder,
) -> Vec<&'a product::Model> {
    let mut rows = filter_products(products, criteria);
    sort_by_name(&mut rows, order);
    rows
}
