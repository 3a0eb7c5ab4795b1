use super::store::{BlobStore, BlobStoreError, Bucket, StoredBlob};
use anyhow::{Context, Result};
use rand::distr::{Alphanumeric, SampleString};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

const OBJECT_TOKEN_LENGTH: usize = 12;

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

/// Object keys combine a random token and a timestamp so that two uploads of
/// the same original filename never collide.
fn generate_object_name(original_filename: &str) -> Result<String, BlobStoreError> {
    let original = Path::new(original_filename);
    let stem_is_usable = original
        .file_stem()
        .map(|s| !s.to_string_lossy().trim().is_empty())
        .unwrap_or(false);
    if !stem_is_usable {
        return Err(BlobStoreError::InvalidFilename(
            original_filename.to_string(),
        ));
    }

    let token = Alphanumeric.sample_string(&mut rand::rng(), OBJECT_TOKEN_LENGTH);
    let name = match original.extension() {
        Some(ext) => format!("{}-{}.{}", token, unix_millis(), ext.to_string_lossy()),
        None => format!("{}-{}", token, unix_millis()),
    };
    Ok(name)
}

/// Resolves a bare key, bucket-relative path or full public URL to the
/// object key: everything before the final path segment is dropped.
fn object_name_from(path_or_url: &str) -> Result<&str, BlobStoreError> {
    let name = path_or_url.rsplit('/').next().unwrap_or(path_or_url);
    if name.is_empty() || name == "." || name == ".." {
        return Err(BlobStoreError::InvalidFilename(path_or_url.to_string()));
    }
    Ok(name)
}

/// Filesystem-backed blob store: one subdirectory per bucket under a root
/// directory, objects publicly retrievable as `<base_url>/<bucket>/<name>`.
pub struct FsBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl FsBlobStore {
    /// Creates the bucket directories if they do not exist yet.
    pub fn new<T: AsRef<Path>>(root: T, public_base_url: String) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        for bucket in [Bucket::Images, Bucket::Pdfs] {
            let dir = root.join(bucket.name());
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create bucket directory {}", dir.display()))?;
        }
        Ok(FsBlobStore {
            root,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn object_path(&self, bucket: Bucket, name: &str) -> PathBuf {
        self.root.join(bucket.name()).join(name)
    }

    fn public_url(&self, bucket: Bucket, name: &str) -> String {
        format!("{}/{}/{}", self.public_base_url, bucket.name(), name)
    }
}

impl BlobStore for FsBlobStore {
    fn upload(
        &self,
        bucket: Bucket,
        original_filename: &str,
        data: &[u8],
    ) -> Result<StoredBlob, BlobStoreError> {
        if data.is_empty() {
            return Err(BlobStoreError::EmptyUpload(original_filename.to_string()));
        }

        let name = generate_object_name(original_filename)?;
        let path = self.object_path(bucket, &name);

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|err| {
                if err.kind() == std::io::ErrorKind::AlreadyExists {
                    BlobStoreError::AlreadyExists(name.clone())
                } else {
                    BlobStoreError::Io(err)
                }
            })?;
        file.write_all(data)?;

        debug!(
            "Stored {} bytes from \"{}\" as {}/{}",
            data.len(),
            original_filename,
            bucket,
            name
        );

        Ok(StoredBlob {
            url: self.public_url(bucket, &name),
            path: format!("{}/{}", bucket.name(), name),
        })
    }

    fn delete(&self, bucket: Bucket, path_or_url: &str) -> Result<(), BlobStoreError> {
        let name = object_name_from(path_or_url)?;
        let path = self.object_path(bucket, name);
        if !path.is_file() {
            return Err(BlobStoreError::NotFound(format!("{}/{}", bucket, name)));
        }
        std::fs::remove_file(&path)?;
        debug!("Deleted {}/{}", bucket, name);
        Ok(())
    }

    fn read(&self, bucket: Bucket, name: &str) -> Result<Vec<u8>, BlobStoreError> {
        let name = object_name_from(name)?;
        let path = self.object_path(bucket, name);
        if !path.is_file() {
            return Err(BlobStoreError::NotFound(format!("{}/{}", bucket, name)));
        }
        Ok(std::fs::read(&path)?)
    }
}
