use thiserror::Error;

/// Named partitions of the blob store. One bucket for cover images, one for
/// sheet-music PDFs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bucket {
    Images,
    Pdfs,
}

impl Bucket {
    pub fn name(&self) -> &'static str {
        match self {
            Bucket::Images => "images",
            Bucket::Pdfs => "pdfs",
        }
    }

    pub fn from_name(name: &str) -> Option<Bucket> {
        match name {
            "images" => Some(Bucket::Images),
            "pdfs" => Some(Bucket::Pdfs),
            _ => None,
        }
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Result of a successful upload. Absorbed into a song record immediately,
/// never persisted on its own.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredBlob {
    /// Public retrieval URL.
    pub url: String,
    /// Bucket-relative object key.
    pub path: String,
}

#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid filename: {0}")]
    InvalidFilename(String),

    #[error("empty upload: {0}")]
    EmptyUpload(String),

    #[error("object already exists: {0}")]
    AlreadyExists(String),

    #[error("object not found: {0}")]
    NotFound(String),
}

/// Binary asset storage. Implementations keep no in-process state beyond
/// their configuration; every call hits the backing store.
pub trait BlobStore: Send + Sync {
    /// Stores `data` in `bucket` under a freshly generated object key that
    /// preserves the original extension. Never overwrites: a key collision
    /// is an error, not a silent replace.
    fn upload(
        &self,
        bucket: Bucket,
        original_filename: &str,
        data: &[u8],
    ) -> Result<StoredBlob, BlobStoreError>;

    /// Deletes an object. Accepts a bare object key, a bucket-relative path
    /// or a full public URL; everything up to the final path segment is
    /// ignored. Deleting a missing object is `NotFound`.
    fn delete(&self, bucket: Bucket, path_or_url: &str) -> Result<(), BlobStoreError>;

    /// Reads an object back by its bare key, for serving.
    fn read(&self, bucket: Bucket, name: &str) -> Result<Vec<u8>, BlobStoreError>;
}
