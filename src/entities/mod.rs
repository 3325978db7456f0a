//! Entity module - Contains all SeaORM entity definitions for the document store.
//! `product` backs the `inventory` collection, `sale` backs the `sales` collection and
//! `system_state` holds key/value rows such as migration claims.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod expiry_status;
pub mod product;
pub mod sale;
pub mod system_state;

// Re-export specific types to avoid conflicts
pub use expiry_status::ExpiryStatus;
pub use product::{Column as ProductColumn, Entity as Product, Model as ProductModel};
pub use sale::{Column as SaleColumn, Entity as Sale, Model as SaleModel};
pub use system_state::{
    Column as SystemStateColumn, Entity as SystemState, Model as SystemStateModel,
};
