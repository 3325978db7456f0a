use clap::{Parser, Subcommand, ValueEnum};
use dotenvy::dotenv;
use pex_inventory::{
    config::{database, settings},
    core::{
        backup, bulk, catalog,
        dashboard::DashboardState,
        filter::{FilterCriteria, SortOrder, StatusFilter},
        migration::MigrationReconciler,
        product::{self, ProductDraft},
        report::{self, ReportKind},
        sale, status,
    },
    errors::Result,
    local::LocalSnapshotStore,
    store::DocumentStore,
};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "PEX pharmacy inventory: stock, expiry status and sales",
    long_about = None
)]
struct Cli {
    /// Skip the local snapshot migration normally attempted at startup.
    #[arg(long, global = true)]
    skip_migration: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the dashboard tiles.
    Summary,
    /// List products matching the filters.
    List(ListArgs),
    /// Add a product.
    Add(ProductArgs),
    /// Replace every field of a product.
    Edit {
        /// Product id
        id: i64,
        #[command(flatten)]
        fields: ProductArgs,
    },
    /// Sell units of a product.
    Sell {
        /// Product id
        id: i64,
        /// Units sold
        #[arg(short, long)]
        quantity: i64,
        /// Seller registration
        #[arg(short, long)]
        seller: String,
    },
    /// Delete one or more products atomically.
    Delete {
        /// Product ids
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    /// Set the quantity of several products atomically.
    SetQuantity {
        /// New quantity
        quantity: i64,
        /// Product ids
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    /// Erase the whole sales history.
    ClearSales,
    /// Import products from a backup or a product list.
    Import {
        /// JSON file to read
        file: PathBuf,
    },
    /// Write a JSON backup of products and sales.
    Export {
        /// Directory to write the backup into
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
    /// Manage catalog references.
    Catalog {
        #[command(subcommand)]
        command: CatalogCommands,
    },
    /// Print a report table.
    Report {
        /// inventory, catalog or sales
        kind: String,
        #[command(flatten)]
        filters: ListArgs,
    },
    /// Migrate local snapshots into the store now.
    Migrate,
}

#[derive(Subcommand, Debug)]
enum CatalogCommands {
    /// Register an EAN reference.
    Add {
        /// Barcode
        ean: String,
        /// Product name
        name: String,
    },
    /// Look up the catalog match for a barcode.
    Lookup {
        /// Barcode
        ean: String,
    },
}

#[derive(clap::Args, Debug)]
struct ListArgs {
    /// Matched against name, batch and EAN.
    #[arg(long, default_value = "")]
    search: String,
    /// all, catalog, safe, critical or expired.
    #[arg(long, default_value = "all")]
    status: String,
    /// Earliest expiry date (YYYY-MM-DD).
    #[arg(long)]
    from: Option<String>,
    /// Latest expiry date (YYYY-MM-DD).
    #[arg(long)]
    to: Option<String>,
    /// Registration tag filter.
    #[arg(long, default_value = "")]
    vendor: String,
    /// Section tag filter.
    #[arg(long, default_value = "")]
    section: String,
    /// Transfer tag filter.
    #[arg(long, default_value = "")]
    transfer: String,
    /// Sort by name.
    #[arg(long, value_enum)]
    sort: Option<SortArg>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SortArg {
    Asc,
    Desc,
}

#[derive(clap::Args, Debug)]
struct ProductArgs {
    /// Product name
    #[arg(long)]
    name: String,
    /// Lot identifier
    #[arg(long, default_value = "")]
    batch: String,
    /// Units in stock
    #[arg(long, default_value_t = 0)]
    quantity: i64,
    /// Expiry date (YYYY-MM-DD)
    #[arg(long, default_value = "")]
    expiry: String,
    /// Barcode
    #[arg(long, default_value = "")]
    ean: String,
    /// Registration tag
    #[arg(long, default_value = "")]
    registration: String,
    /// Section tag
    #[arg(long, default_value = "")]
    section: String,
    /// Transfer tag
    #[arg(long, default_value = "")]
    transfer: String,
    /// Notes
    #[arg(long, default_value = "")]
    notes: String,
}

impl ProductArgs {
    fn to_draft(&self) -> ProductDraft {
        ProductDraft {
            name: self.name.clone(),
            batch: self.batch.clone(),
            quantity: self.quantity,
            expiry_date: self.expiry.clone(),
            ean: self.ean.clone(),
            registration: self.registration.clone(),
            section: self.section.clone(),
            transfer: self.transfer.clone(),
            notes: self.notes.clone(),
        }
    }
}

impl ListArgs {
    fn criteria(&self) -> Result<(FilterCriteria, SortOrder)> {
        let criteria = FilterCriteria {
            search_term: self.search.clone(),
            status_filter: self.status.parse()?,
            start_date: status::parse_expiry_date(self.from.as_deref().unwrap_or_default())?,
            end_date: status::parse_expiry_date(self.to.as_deref().unwrap_or_default())?,
            vendor: self.vendor.clone(),
            section: self.section.clone(),
            transfer: self.transfer.clone(),
        };
        let sort = match self.sort {
            None => SortOrder::Unsorted,
            Some(SortArg::Asc) => SortOrder::Ascending,
            Some(SortArg::Desc) => SortOrder::Descending,
        };
        Ok((criteria, sort))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    let cli = Cli::parse();
    run(cli).await.inspect_err(|e| {
        error!("{:?} error: {}", e.kind(), e);
        if e.is_retryable() {
            warn!("The operation can be retried");
        }
    })
}

async fn run(cli: Cli) -> Result<()> {
    // 3. Settings and store
    let settings = settings::load_default_settings()?;
    let db = database::create_connection().await?;
    let store = DocumentStore::open(db).await?;
    info!("Document store ready");

    // 4. One-shot migration of local data, retried on every start until it succeeds
    let local = LocalSnapshotStore::new(&settings.storage.snapshot_dir);
    let reconciler = MigrationReconciler::from_settings(&settings.migration);
    if !cli.skip_migration && !matches!(cli.command, Commands::Migrate) {
        match reconciler.run(&store, &local).await {
            Ok(report) if report.has_failures() => {
                warn!("Migration incomplete, local data kept: {:?}", report);
            }
            Ok(report) => info!("Migration check done: {:?}", report),
            Err(e) => warn!("Migration skipped: {}", e),
        }
    }

    // 5. Command
    let mut dashboard = DashboardState::attach(&store);
    match cli.command {
        Commands::Summary => {
            let view = dashboard.view();
            println!(
                "Total: {}  Expired: {}  Critical: {}  Safe: {}  Sales: {}",
                view.stats.total,
                view.stats.expired,
                view.stats.critical,
                view.stats.safe,
                view.sales.len()
            );
            if view.has_expired_stock() {
                println!("Attention: {} expired products in stock", view.stats.expired);
            }
        }
        Commands::List(args) => {
            let (criteria, sort) = args.criteria()?;
            dashboard.criteria = criteria;
            dashboard.sort = sort;
            for p in dashboard.view().rows {
                let sold_out = if p.is_sold_out() { " (sold out)" } else { "" };
                println!(
                    "{:>5}  {:<30} {:<10} {:>5}  {:<10}  {}{}",
                    p.id,
                    p.name,
                    p.batch,
                    p.quantity,
                    p.expiry_date.map(status::format_date).unwrap_or_default(),
                    p.status.label(),
                    sold_out
                );
            }
        }
        Commands::Add(args) => {
            let created = product::create_product(&store, &args.to_draft()).await?;
            println!("Saved {} ({})", created.product.name, created.product.id);
            if let Some(entry) = created.catalog_entry {
                println!("Catalog reference {} registered", entry.id);
            }
        }
        Commands::Edit { id, fields } => {
            let updated = product::update_product(&store, id, &fields.to_draft()).await?;
            println!("Updated {} ({})", updated.name, updated.id);
        }
        Commands::Sell {
            id,
            quantity,
            seller,
        } => {
            let receipt = sale::record_sale(&store, id, quantity, &seller).await?;
            println!(
                "Sold {} x {}; {} left",
                receipt.sale.quantity_sold, receipt.sale.name, receipt.product.quantity
            );
            if receipt.sold_out() {
                println!("{} is now sold out", receipt.product.name);
            }
        }
        Commands::Delete { ids } => {
            if let [id] = ids.as_slice() {
                product::delete_product(&store, *id).await?;
                println!("Deleted product {id}");
            } else {
                let deleted = bulk::delete_products(&store, &ids).await?;
                println!("Deleted {deleted} products");
            }
        }
        Commands::SetQuantity { quantity, ids } => {
            let updated =
                bulk::apply_to_products(&store, &ids, bulk::BulkOperation::SetQuantity(quantity))
                    .await?;
            println!("Updated {updated} products");
        }
        Commands::ClearSales => {
            let sales = dashboard.sales().shared();
            let cleared = bulk::clear_sales_history(&store, &sales).await?;
            println!("Cleared {cleared} sale records");
        }
        Commands::Import { file } => {
            let json = std::fs::read_to_string(&file)?;
            let imported = backup::import_products(&store, &json).await?;
            println!("Imported {imported} products");
        }
        Commands::Export { out } => {
            let json = backup::export_backup(
                dashboard.inventory().documents(),
                dashboard.sales().documents(),
            )?;
            std::fs::create_dir_all(&out)?;
            let path = out.join(backup::backup_file_name(status::today()));
            std::fs::write(&path, json)?;
            println!("Backup written to {}", path.display());
        }
        Commands::Catalog { command } => match command {
            CatalogCommands::Add { ean, name } => {
                let entry = catalog::register_catalog_entry(&store, &ean, &name).await?;
                println!("Catalog entry {} ({}) registered", entry.name, entry.id);
            }
            CatalogCommands::Lookup { ean } => {
                match catalog::find_catalog_match(dashboard.inventory().documents(), &ean) {
                    Some(found) => println!(
                        "{}  section: {}  transfer: {}",
                        found.name,
                        found.section.unwrap_or_default(),
                        found.transfer.unwrap_or_default()
                    ),
                    None => println!("No catalog match for {ean}"),
                }
            }
        },
        Commands::Report { kind, filters } => {
            let kind: ReportKind = kind.parse()?;
            let today = status::today();
            let table = match kind {
                ReportKind::Sales => report::sales_report(dashboard.sales().documents(), today)?,
                ReportKind::Inventory | ReportKind::Catalog => {
                    let (mut criteria, sort) = filters.criteria()?;
                    if kind == ReportKind::Catalog {
                        criteria.status_filter = StatusFilter::Catalog;
                    }
                    dashboard.criteria = criteria;
                    dashboard.sort = sort;
                    let rows = dashboard.view().rows;
                    if kind == ReportKind::Catalog {
                        report::catalog_report(&rows, today)?
                    } else {
                        report::inventory_report(&rows, today)?
                    }
                }
            };
            print!("{}", table.render_text());
        }
        Commands::Migrate => {
            let report = reconciler.run(&store, &local).await?;
            println!("Products: {:?}\nSales: {:?}", report.products, report.sales);
        }
    }
    dashboard.detach();
    Ok(())
}
