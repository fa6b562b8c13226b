//! Drover Catalog
//!
//! Persistence for item definitions. The [`Catalog`] trait is the storage
//! seam; [`FsCatalog`] keeps one `{name}.json` file per definition under a
//! root directory.

mod catalog;
mod error;
mod fs_catalog;

pub use catalog::Catalog;
pub use error::CatalogError;
pub use fs_catalog::FsCatalog;
