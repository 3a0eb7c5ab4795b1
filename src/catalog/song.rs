use serde::{Deserialize, Serialize};

/// A catalog entry: one song with its metadata, asset references and usage
/// counters. `created` and `updated` are unix seconds; `updated` is bumped
/// by the store on every update, never by callers.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Song {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub description: Option<String>,
    pub video_url: Option<String>,
    pub image_url: String,
    pub pdf_url: Option<String>,
    pub views: u64,
    pub downloads: u64,
    pub created: i64,
    pub updated: i64,
}

/// Insert payload. The store assigns id, counters and timestamps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewSong {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub description: Option<String>,
    pub video_url: Option<String>,
    pub image_url: String,
    pub pdf_url: Option<String>,
}

/// Update payload. Metadata fields replace the stored values wholesale (the
/// admin form always submits the full set); asset URLs are only replaced
/// when `Some`, so an edit without a re-upload keeps the existing assets.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SongUpdate {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub description: Option<String>,
    pub video_url: Option<String>,
    pub image_url: Option<String>,
    pub pdf_url: Option<String>,
}
