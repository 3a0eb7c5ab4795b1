mod fs_store;
mod store;

pub use fs_store::FsBlobStore;
pub use store::{BlobStore, BlobStoreError, Bucket, StoredBlob};
