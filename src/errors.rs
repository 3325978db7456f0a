//! Unified error types for the inventory dashboard core.
//!
//! Every fallible operation returns [`Result`]. Variants carry enough context to build a
//! user-facing notification, and [`Error::kind`] maps each one onto the coarse categories the
//! dashboard reacts to (banner, inline message, transient toast).

use thiserror::Error;

/// Coarse classification used to decide how a failure is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Store unreachable or settings unreadable. Fatal, shown once as a persistent banner.
    Configuration,
    /// Rejected locally before any remote call; the user corrects the input.
    Validation,
    /// A create/update/delete/batch commit was rejected by the store.
    WriteFailure,
    /// The one-shot local to remote migration failed; local data was left intact.
    Migration,
    /// An uploaded backup could not be parsed into products.
    ImportParse,
}

/// All errors produced by the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Settings file or environment could not be loaded
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Underlying store rejected an operation
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// A required field was missing or malformed
    #[error("Invalid {field}: {message}")]
    Validation {
        /// Name of the offending field
        field: &'static str,
        /// Human-readable explanation
        message: String,
    },

    /// Expiry date did not follow `YYYY-MM-DD`
    #[error("Invalid expiry date '{value}', expected YYYY-MM-DD")]
    InvalidDate {
        /// The rejected input
        value: String,
    },

    /// Quantity was negative or otherwise unusable
    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity {
        /// The rejected quantity
        quantity: i64,
    },

    /// No product document with this id
    #[error("Product not found: {id}")]
    ProductNotFound {
        /// Requested product id
        id: i64,
    },

    /// Sale asked for more units than are in stock
    #[error("Insufficient stock: {available} available, {requested} requested")]
    InsufficientStock {
        /// Units currently in stock
        available: i64,
        /// Units the sale asked for
        requested: i64,
    },

    /// Catalog reference entries carry no stock and cannot be sold
    #[error("Product {id} is a catalog reference and cannot be sold")]
    CatalogEntryNotSellable {
        /// Id of the catalog entry
        id: i64,
    },

    /// Another product already uses this barcode
    #[error("EAN {ean} is already registered")]
    DuplicateEan {
        /// The duplicated barcode
        ean: String,
    },

    /// Backup file had an unexpected shape or no products
    #[error("Import failed: {message}")]
    Import {
        /// What was wrong with the payload
        message: String,
    },

    /// Migration could not complete
    #[error("Migration failed: {message}")]
    Migration {
        /// What went wrong
        message: String,
    },

    /// A batch precondition found documents in a collection expected to be empty
    #[error("Collection {collection} is not empty")]
    CollectionNotEmpty {
        /// Name of the collection
        collection: &'static str,
    },

    /// A one-shot marker was already written by an earlier run
    #[error("Key {key} has already been claimed")]
    AlreadyClaimed {
        /// The claimed key
        key: String,
    },

    /// A migration is already running in this process
    #[error("A migration is already in progress")]
    MigrationInProgress,

    /// JSON encoding or decoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local file access failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file was not valid TOML
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Classifies this error for presentation.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Config { .. } | Self::Toml(_) => ErrorKind::Configuration,
            Self::Validation { .. }
            | Self::InvalidDate { .. }
            | Self::InvalidQuantity { .. }
            | Self::InsufficientStock { .. }
            | Self::CatalogEntryNotSellable { .. }
            | Self::DuplicateEan { .. } => ErrorKind::Validation,
            Self::Migration { .. }
            | Self::MigrationInProgress
            | Self::CollectionNotEmpty { .. }
            | Self::AlreadyClaimed { .. } => ErrorKind::Migration,
            Self::Import { .. } | Self::Json(_) => ErrorKind::ImportParse,
            Self::Database(_)
            | Self::ProductNotFound { .. }
            | Self::Io(_) => ErrorKind::WriteFailure,
        }
    }

    /// Whether repeating the same call later may succeed without user changes.
    ///
    /// Connection drops and pool timeouts are retryable; constraint violations and
    /// validation failures are not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Database(err) => matches!(
                err,
                sea_orm::DbErr::Conn(_) | sea_orm::DbErr::ConnectionAcquire(_)
            ),
            Self::Migration { .. } | Self::MigrationInProgress | Self::Io(_) => true,
            _ => false,
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
