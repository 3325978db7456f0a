//! Dashboard state container.
//!
//! Holds the latest snapshot of each collection together with the user's filter and sort
//! choices. Snapshots are only ever replaced whole, by pulling from the store's feeds; a view
//! borrows the current snapshots and derives tiles and table rows from them.

use super::filter::{self, FilterCriteria, SortOrder};
use super::stats::{self, InventoryStats};
use crate::{
    entities::{product, sale},
    errors::Result,
    store::{DocumentStore, Snapshot, Subscription},
};
use tracing::debug;

/// Everything the dashboard renders for one pair of snapshots.
#[derive(Debug)]
pub struct DashboardView<'a> {
    /// Tile counts over real stock
    pub stats: InventoryStats,
    /// Filtered, sorted table rows
    pub rows: Vec<&'a product::Model>,
    /// Sales history, newest first
    pub sales: &'a [sale::Model],
    /// Whether either collection is still loading
    pub loading: bool,
    /// Last read error from either feed
    pub error: Option<&'a str>,
}

impl DashboardView<'_> {
    /// Whether the expired-stock alert should be shown.
    #[must_use]
    pub const fn has_expired_stock(&self) -> bool {
        self.stats.expired > 0
    }
}

/// Live dashboard state fed by the store's subscriptions.
pub struct DashboardState {
    inventory_feed: Subscription<product::Model>,
    sales_feed: Subscription<sale::Model>,
    inventory: Snapshot<product::Model>,
    sales: Snapshot<sale::Model>,
    /// Active filters
    pub criteria: FilterCriteria,
    /// Active name sort
    pub sort: SortOrder,
}

impl DashboardState {
    /// Subscribes to both collections and takes their current snapshots.
    #[must_use]
    pub fn attach(store: &DocumentStore) -> Self {
        let mut inventory_feed = store.subscribe_inventory();
        let mut sales_feed = store.subscribe_sales();
        let inventory = inventory_feed.current();
        let sales = sales_feed.current();
        Self {
            inventory_feed,
            sales_feed,
            inventory,
            sales,
            criteria: FilterCriteria::default(),
            sort: SortOrder::default(),
        }
    }

    /// Pulls any snapshot published since the last sync. Returns whether anything changed.
    pub fn sync(&mut self) -> bool {
        let mut changed = false;
        if self.inventory_feed.has_changed() {
            self.inventory = self.inventory_feed.current();
            changed = true;
        }
        if self.sales_feed.has_changed() {
            self.sales = self.sales_feed.current();
            changed = true;
        }
        changed
    }

    /// Waits until either collection publishes a new snapshot and takes it.
    ///
    /// # Errors
    /// Returns an error if the store was dropped.
    pub async fn changed(&mut self) -> Result<()> {
        tokio::select! {
            snapshot = self.inventory_feed.next() => {
                self.inventory = snapshot?;
                debug!("Dashboard took inventory snapshot of {}", self.inventory.len());
            }
            snapshot = self.sales_feed.next() => {
                self.sales = snapshot?;
                debug!("Dashboard took sales snapshot of {}", self.sales.len());
            }
        }
        Ok(())
    }

    /// Current inventory snapshot.
    #[must_use]
    pub const fn inventory(&self) -> &Snapshot<product::Model> {
        &self.inventory
    }

    /// Current sales snapshot.
    #[must_use]
    pub const fn sales(&self) -> &Snapshot<sale::Model> {
        &self.sales
    }

    /// Derives tiles and rows from the current snapshots.
    #[must_use]
    pub fn view(&self) -> DashboardView<'_> {
        let products = self.inventory.documents();
        DashboardView {
            stats: stats::compute(products),
            rows: filter::apply(products, &self.criteria, self.sort),
            sales: self.sales.documents(),
            loading: !self.inventory.is_loaded() || !self.sales.is_loaded(),
            error: self.inventory.error().or_else(|| self.sales.error()),
        }
    }

    /// Cycles the name sort.
    pub fn toggle_sort(&mut self) {
        self.sort = self.sort.toggle();
    }

    /// Resets every filter.
    pub fn clear_filters(&mut self) {
        self.criteria = FilterCriteria::default();
    }

    /// Releases both subscriptions.
    pub fn detach(self) {
        self.inventory_feed.unsubscribe();
        self.sales_feed.unsubscribe();
    }
}
