pub mod blob;
pub mod error;
pub mod manager;
pub mod memory;
pub mod store;

pub use blob::{BlobStore, FsBlobStore};
pub use error::{PictoError, StoreError, StoreResult};
pub use manager::PictoManager;
pub use store::{NewPicto, Parent, PictoFilter, TreeStore};
