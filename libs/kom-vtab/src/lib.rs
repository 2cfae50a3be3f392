//! SQLite virtual table module that exposes a [`KomPlugin`](kom_api::KomPlugin)
//! as a read-only table.
//!
//! ```sql
//! CREATE VIRTUAL TABLE parts USING kom(
//!     plugin=inventree,
//!     settings=kom_settings,
//!     categories='Electronics/Resistors'
//! );
//! ```

pub mod args;
pub mod error;
pub mod plan;
pub mod settings;
pub mod table;

pub use error::VtabError;
pub use settings::TableSettings;
pub use table::{KomTab, MODULE_NAME, register_module};
