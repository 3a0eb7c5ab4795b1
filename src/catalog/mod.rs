mod error;
mod song;
mod sqlite_store;
mod store;

pub use error::CatalogError;
pub use song::{NewSong, Song, SongUpdate};
pub use sqlite_store::SqliteSongStore;
pub use store::{Counter, SongStore};
