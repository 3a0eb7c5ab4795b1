//! Catalog service facade. Composes the blob store and the song store into
//! the operations the presentation layer calls, and owns the cross-cutting
//! rules no single store does: required-field validation before any network
//! work, image-before-pdf upload ordering, and best-effort asset cleanup on
//! delete.

use crate::blobs::{BlobStore, Bucket};
use crate::catalog::{CatalogError, Counter, NewSong, Song, SongStore, SongUpdate};
use crate::query;
use std::sync::Arc;
use tracing::{debug, warn};

/// An uploaded file as received from the admin form.
#[derive(Clone, Debug)]
pub struct FileUpload {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Metadata fields of the admin form. Optional fields are normalized at this
/// boundary: trimmed, with empty strings collapsed to None.
#[derive(Clone, Debug, Default)]
pub struct SongFields {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub description: Option<String>,
    pub video_url: Option<String>,
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl SongFields {
    fn normalized(self) -> SongFields {
        SongFields {
            title: self.title.trim().to_string(),
            artist: self.artist.trim().to_string(),
            album: normalize(self.album),
            genre: normalize(self.genre),
            description: normalize(self.description),
            video_url: normalize(self.video_url),
        }
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.title.is_empty() {
            return Err(CatalogError::Validation("title is required".to_string()));
        }
        if self.artist.is_empty() {
            return Err(CatalogError::Validation("artist is required".to_string()));
        }
        Ok(())
    }
}

pub struct CatalogService {
    blobs: Arc<dyn BlobStore>,
    songs: Arc<dyn SongStore>,
}

impl CatalogService {
    pub fn new(blobs: Arc<dyn BlobStore>, songs: Arc<dyn SongStore>) -> CatalogService {
        CatalogService { blobs, songs }
    }

    fn upload(&self, bucket: Bucket, file: &FileUpload) -> Result<String, CatalogError> {
        self.blobs
            .upload(bucket, &file.filename, &file.data)
            .map(|stored| stored.url)
            .map_err(|err| {
                CatalogError::Upload(format!("{} upload failed: {}", bucket, err))
            })
    }

    /// Creates a catalog entry. Validation happens before anything is
    /// stored; uploads run sequentially, cover image first, and the record
    /// is only inserted after both succeed. If the pdf upload fails after
    /// the image was stored, the image is orphaned in the blob store; that
    /// is accepted and logged rather than rolled back.
    pub fn create_song(
        &self,
        fields: SongFields,
        image: Option<FileUpload>,
        pdf: Option<FileUpload>,
    ) -> Result<Song, CatalogError> {
        let fields = fields.normalized();
        fields.validate()?;
        let image = image.ok_or_else(|| {
            CatalogError::Validation("cover image is required".to_string())
        })?;

        let image_url = self.upload(Bucket::Images, &image)?;

        let pdf_url = match pdf {
            Some(pdf) => Some(self.upload(Bucket::Pdfs, &pdf).inspect_err(|_| {
                warn!(
                    "Pdf upload failed after cover image {} was stored; the image is orphaned",
                    image_url
                );
            })?),
            None => None,
        };

        self.songs.insert(NewSong {
            title: fields.title,
            artist: fields.artist,
            album: fields.album,
            genre: fields.genre,
            description: fields.description,
            video_url: fields.video_url,
            image_url,
            pdf_url,
        })
    }

    /// Updates an entry. Supplying a file replaces the corresponding asset
    /// URL; omitting it keeps the stored one. Replaced assets are not
    /// deleted from the blob store (reclaimed only when the entry itself is
    /// deleted).
    pub fn update_song(
        &self,
        id: &str,
        fields: SongFields,
        image: Option<FileUpload>,
        pdf: Option<FileUpload>,
    ) -> Result<Song, CatalogError> {
        let fields = fields.normalized();
        fields.validate()?;

        let current = self.get_song(id)?;

        let image_url = match image {
            Some(image) => {
                let url = self.upload(Bucket::Images, &image)?;
                debug!(
                    "Replaced cover image of {}; previous object {} is left in place",
                    id, current.image_url
                );
                Some(url)
            }
            None => None,
        };
        let pdf_url = match pdf {
            Some(pdf) => Some(self.upload(Bucket::Pdfs, &pdf)?),
            None => None,
        };

        self.songs.update(
            id,
            SongUpdate {
                title: fields.title,
                artist: fields.artist,
                album: fields.album,
                genre: fields.genre,
                description: fields.description,
                video_url: fields.video_url,
                image_url,
                pdf_url,
            },
        )
    }

    /// Deletes an entry and its assets. Asset deletion is best-effort: a
    /// failure is logged and the record delete still proceeds, so the
    /// operation only fails when the record itself cannot be removed.
    pub fn delete_song(&self, id: &str) -> Result<(), CatalogError> {
        let song = self.get_song(id)?;

        if let Err(err) = self.blobs.delete(Bucket::Images, &song.image_url) {
            warn!("Failed to delete cover image of {}: {}", id, err);
        }
        if let Some(pdf_url) = &song.pdf_url {
            if let Err(err) = self.blobs.delete(Bucket::Pdfs, pdf_url) {
                warn!("Failed to delete pdf of {}: {}", id, err);
            }
        }

        self.songs.delete(id)
    }

    pub fn list_songs(&self) -> Result<Vec<Song>, CatalogError> {
        self.songs.list_all()
    }

    pub fn get_song(&self, id: &str) -> Result<Song, CatalogError> {
        self.songs.get(id)?.ok_or(CatalogError::NotFound)
    }

    /// The song plus its derived recommendations, for detail pages.
    pub fn get_song_with_recommendations(
        &self,
        id: &str,
    ) -> Result<(Song, Vec<Song>), CatalogError> {
        let song = self.get_song(id)?;
        let all = self.songs.list_all()?;
        let recommended = query::recommendations(&song, &all);
        Ok((song, recommended))
    }

    pub fn distinct_genres(&self) -> Result<Vec<String>, CatalogError> {
        Ok(query::distinct_genres(&self.songs.list_all()?))
    }

    /// Fire-and-forget: a failed increment must never block the user-facing
    /// action that triggered it, so errors are logged and swallowed here.
    pub fn increment_view(&self, id: &str) {
        if let Err(err) = self.songs.increment_counter(id, Counter::Views) {
            warn!("Failed to increment views of {}: {}", id, err);
        }
    }

    pub fn increment_download(&self, id: &str) {
        if let Err(err) = self.songs.increment_counter(id, Counter::Downloads) {
            warn!("Failed to increment downloads of {}: {}", id, err);
        }
    }
}
