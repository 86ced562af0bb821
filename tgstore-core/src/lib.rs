//! tgstore-core: shared vocabulary for the tgstore workspace.
//!
//! Backend classes, locators, file records and the metadata store live here
//! so the storage routers and the HTTP layer agree on one set of types.

mod class;
pub mod errors;
mod locator;
mod record;
pub mod sqlite;
mod store;

pub use class::{BackendClass, UnknownBackendClass};
pub use errors::{ApiError, ErrorKind};
pub use locator::{Locator, LocatorError};
pub use record::{FileRecord, NewFileRecord};
pub use sqlite::SqliteMetadataStore;
pub use store::{MemoryMetadataStore, MetadataError, MetadataResult, MetadataStore};
