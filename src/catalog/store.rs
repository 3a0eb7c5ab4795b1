use super::{CatalogError, NewSong, Song, SongUpdate};

/// Usage counters tracked per song.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Counter {
    Views,
    Downloads,
}

impl Counter {
    pub fn column(&self) -> &'static str {
        match self {
            Counter::Views => "views",
            Counter::Downloads => "downloads",
        }
    }
}

/// Storage backend for catalog entries.
///
/// `list_all` is the canonical read: newest first (created desc, insertion
/// order breaking ties). The facade and the query engine both assume that
/// ordering.
pub trait SongStore: Send + Sync {
    /// Inserts a new song and returns it with id, counters and timestamps
    /// assigned.
    fn insert(&self, song: NewSong) -> Result<Song, CatalogError>;

    /// Returns the song with the given id, or None if it does not exist.
    fn get(&self, id: &str) -> Result<Option<Song>, CatalogError>;

    /// Returns all songs, newest first.
    fn list_all(&self) -> Result<Vec<Song>, CatalogError>;

    /// Applies an update and returns the stored result. Bumps `updated`
    /// regardless of which fields changed. NotFound for an unknown id.
    fn update(&self, id: &str, update: SongUpdate) -> Result<Song, CatalogError>;

    /// Deletes the song record. NotFound for an unknown id.
    fn delete(&self, id: &str) -> Result<(), CatalogError>;

    /// Increments a usage counter by one.
    fn increment_counter(&self, id: &str, counter: Counter) -> Result<(), CatalogError>;
}
