use super::store::{Counter, SongStore};
use super::{CatalogError, NewSong, Song, SongUpdate};
use crate::sqlite_persistence::{Table, VersionedSchema, BASE_DB_VERSION};
use anyhow::{bail, Context, Result};
use rand::distr::{Alphanumeric, SampleString};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

/// V 0
const SONG_TABLE_V_0: Table = Table {
    name: "song",
    schema: "CREATE TABLE song (id TEXT NOT NULL UNIQUE, title TEXT NOT NULL, artist TEXT NOT NULL, album TEXT, genre TEXT, description TEXT, video_url TEXT, image_url TEXT NOT NULL, pdf_url TEXT, views INTEGER NOT NULL DEFAULT 0, downloads INTEGER NOT NULL DEFAULT 0, created INTEGER DEFAULT (cast(strftime('%s','now') as int)), updated INTEGER DEFAULT (cast(strftime('%s','now') as int)), PRIMARY KEY (id));",
    indices: &[
        "CREATE INDEX song_created_index ON song (created);",
        "CREATE INDEX song_genre_index ON song (genre);",
    ],
};

fn validate_schema_0(conn: &Connection) -> Result<()> {
    let mut stmt = conn.prepare("PRAGMA table_info(song);")?;
    let columns: Vec<String> = stmt
        .query_map([], |row| row.get(1))?
        .collect::<Result<_, _>>()?;

    let expected = [
        "id",
        "title",
        "artist",
        "album",
        "genre",
        "description",
        "video_url",
        "image_url",
        "pdf_url",
        "views",
        "downloads",
        "created",
        "updated",
    ];
    if columns != expected {
        bail!(
            "Schema validation failed for song table. found {:?}",
            columns
        );
    }
    Ok(())
}

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[SONG_TABLE_V_0],
    migration: None,
    validate: validate_schema_0,
}];

const SONG_COLUMNS: &str =
    "id, title, artist, album, genre, description, video_url, image_url, pdf_url, views, downloads, created, updated";

fn song_from_row(row: &rusqlite::Row) -> rusqlite::Result<Song> {
    Ok(Song {
        id: row.get(0)?,
        title: row.get(1)?,
        artist: row.get(2)?,
        album: row.get(3)?,
        genre: row.get(4)?,
        description: row.get(5)?,
        video_url: row.get(6)?,
        image_url: row.get(7)?,
        pdf_url: row.get(8)?,
        views: row.get::<usize, i64>(9)? as u64,
        downloads: row.get::<usize, i64>(10)? as u64,
        created: row.get(11)?,
        updated: row.get(12)?,
    })
}

fn repository_error<E: std::fmt::Display>(err: E) -> CatalogError {
    CatalogError::Repository(err.to_string())
}

fn generate_song_id() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), 16)
}

/// SQLite-backed song store. A single connection behind a mutex; every
/// operation is one statement or one read-then-write under the same lock.
#[derive(Clone)]
pub struct SqliteSongStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSongStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = if db_path.as_ref().exists() {
            Connection::open_with_flags(
                db_path,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?
        } else {
            let conn = Connection::open(db_path)?;
            Self::create_schema(&conn)?;
            conn
        };

        let version = conn
            .query_row("PRAGMA user_version;", [], |row| row.get::<usize, usize>(0))
            .context("Failed to read database version")?
            - BASE_DB_VERSION;

        if version >= VERSIONED_SCHEMAS.len() {
            bail!("Database version {} is too new", version);
        } else {
            (VERSIONED_SCHEMAS
                .get(version)
                .context("Failed to get schema")?
                .validate)(&conn)?;
        }

        Self::migrate_if_needed(&conn, version)?;

        let song_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM song", [], |r| r.get(0))
            .unwrap_or(0);
        info!("Opened song catalog with {} songs", song_count);

        Ok(SqliteSongStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn create_schema(conn: &Connection) -> Result<()> {
        let latest_version = VERSIONED_SCHEMAS
            .last()
            .context("No versioned schemas defined")?;
        latest_version.create(conn)
    }

    fn migrate_if_needed(conn: &Connection, version: usize) -> Result<()> {
        let mut latest_from = version;
        for schema in VERSIONED_SCHEMAS.iter().skip(version + 1) {
            if let Some(migration_fn) = schema.migration {
                info!(
                    "Migrating song db from version {} to {}",
                    latest_from, schema.version
                );
                migration_fn(conn)?;
                latest_from = schema.version;
            }
        }
        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + latest_from),
            [],
        )?;

        Ok(())
    }

    fn get_locked(conn: &Connection, id: &str) -> Result<Option<Song>, CatalogError> {
        conn.query_row(
            &format!("SELECT {} FROM song WHERE id = ?1", SONG_COLUMNS),
            params![id],
            song_from_row,
        )
        .optional()
        .map_err(repository_error)
    }
}

impl SongStore for SqliteSongStore {
    fn insert(&self, song: NewSong) -> Result<Song, CatalogError> {
        let conn = self.conn.lock().unwrap();
        let id = generate_song_id();
        conn.execute(
            "INSERT INTO song (id, title, artist, album, genre, description, video_url, image_url, pdf_url) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                id,
                song.title,
                song.artist,
                song.album,
                song.genre,
                song.description,
                song.video_url,
                song.image_url,
                song.pdf_url,
            ],
        )
        .map_err(repository_error)?;

        Self::get_locked(&conn, &id)?.ok_or(CatalogError::NotFound)
    }

    fn get(&self, id: &str) -> Result<Option<Song>, CatalogError> {
        let conn = self.conn.lock().unwrap();
        Self::get_locked(&conn, id)
    }

    fn list_all(&self) -> Result<Vec<Song>, CatalogError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM song ORDER BY created DESC, rowid DESC",
                SONG_COLUMNS
            ))
            .map_err(repository_error)?;
        let rows = stmt
            .query_map([], song_from_row)
            .map_err(repository_error)?
            .collect::<Result<Vec<Song>, _>>()
            .map_err(repository_error)?;
        Ok(rows)
    }

    fn update(&self, id: &str, update: SongUpdate) -> Result<Song, CatalogError> {
        let conn = self.conn.lock().unwrap();
        let current = Self::get_locked(&conn, id)?.ok_or(CatalogError::NotFound)?;

        let image_url = update.image_url.unwrap_or(current.image_url);
        let pdf_url = update.pdf_url.or(current.pdf_url);

        conn.execute(
            "UPDATE song SET title = ?1, artist = ?2, album = ?3, genre = ?4, description = ?5, video_url = ?6, image_url = ?7, pdf_url = ?8, updated = cast(strftime('%s','now') as int) WHERE id = ?9",
            params![
                update.title,
                update.artist,
                update.album,
                update.genre,
                update.description,
                update.video_url,
                image_url,
                pdf_url,
                id,
            ],
        )
        .map_err(repository_error)?;

        Self::get_locked(&conn, id)?.ok_or(CatalogError::NotFound)
    }

    fn delete(&self, id: &str) -> Result<(), CatalogError> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn
            .execute("DELETE FROM song WHERE id = ?1", params![id])
            .map_err(repository_error)?;
        if deleted == 0 {
            return Err(CatalogError::NotFound);
        }
        Ok(())
    }

    fn increment_counter(&self, id: &str, counter: Counter) -> Result<(), CatalogError> {
        let conn = self.conn.lock().unwrap();
        // Single UPDATE so concurrent increments cannot lose each other.
        let updated = conn
            .execute(
                &format!(
                    "UPDATE song SET {col} = {col} + 1 WHERE id = ?1",
                    col = counter.column()
                ),
                params![id],
            )
            .map_err(repository_error)?;
        if updated == 0 {
            return Err(CatalogError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_tmp_store() -> (SqliteSongStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let temp_file_path = temp_dir.path().join("test.db");
        let store = SqliteSongStore::new(&temp_file_path).unwrap();
        (store, temp_dir)
    }

    fn new_song(title: &str, artist: &str, genre: Option<&str>) -> NewSong {
        NewSong {
            title: title.to_string(),
            artist: artist.to_string(),
            album: None,
            genre: genre.map(|g| g.to_string()),
            description: None,
            video_url: None,
            image_url: format!("http://localhost/blobs/images/{}.jpg", title),
            pdf_url: None,
        }
    }

    #[test]
    fn inserts_and_reads_back() {
        let (store, _temp_dir) = create_tmp_store();

        let song = store.insert(new_song("Amazing", "Grace", Some("Hymn"))).unwrap();
        assert!(!song.id.is_empty());
        assert_eq!(song.views, 0);
        assert_eq!(song.downloads, 0);
        assert!(song.updated >= song.created);

        let fetched = store.get(&song.id).unwrap().unwrap();
        assert_eq!(fetched, song);
    }

    #[test]
    fn get_unknown_id_is_none() {
        let (store, _temp_dir) = create_tmp_store();
        assert!(store.get("nope").unwrap().is_none());
    }

    #[test]
    fn lists_newest_first() {
        let (store, _temp_dir) = create_tmp_store();

        let first = store.insert(new_song("First", "A", None)).unwrap();
        let second = store.insert(new_song("Second", "B", None)).unwrap();
        let third = store.insert(new_song("Third", "C", None)).unwrap();

        let all = store.list_all().unwrap();
        let ids: Vec<&str> = all.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec![&third.id, &second.id, &first.id]);
    }

    #[test]
    fn update_replaces_metadata_and_keeps_assets() {
        let (store, _temp_dir) = create_tmp_store();

        let song = store.insert(new_song("Before", "X", Some("Rock"))).unwrap();
        let updated = store
            .update(
                &song.id,
                SongUpdate {
                    title: "After".to_string(),
                    artist: "X".to_string(),
                    album: Some("Album".to_string()),
                    genre: None,
                    description: None,
                    video_url: None,
                    image_url: None,
                    pdf_url: None,
                },
            )
            .unwrap();

        assert_eq!(updated.title, "After");
        assert_eq!(updated.album.as_deref(), Some("Album"));
        assert_eq!(updated.genre, None);
        assert_eq!(updated.image_url, song.image_url);
        assert_eq!(updated.created, song.created);
        assert!(updated.updated >= song.updated);
    }

    #[test]
    fn update_replaces_assets_when_supplied() {
        let (store, _temp_dir) = create_tmp_store();

        let song = store.insert(new_song("Song", "X", None)).unwrap();
        let updated = store
            .update(
                &song.id,
                SongUpdate {
                    title: song.title.clone(),
                    artist: song.artist.clone(),
                    image_url: Some("http://localhost/blobs/images/new.jpg".to_string()),
                    pdf_url: Some("http://localhost/blobs/pdfs/sheet.pdf".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.image_url, "http://localhost/blobs/images/new.jpg");
        assert_eq!(
            updated.pdf_url.as_deref(),
            Some("http://localhost/blobs/pdfs/sheet.pdf")
        );
    }

    #[test]
    fn update_unknown_id_is_not_found() {
        let (store, _temp_dir) = create_tmp_store();
        let result = store.update("nope", SongUpdate::default());
        assert!(matches!(result, Err(CatalogError::NotFound)));
    }

    #[test]
    fn delete_removes_the_record() {
        let (store, _temp_dir) = create_tmp_store();

        let song = store.insert(new_song("Gone", "Soon", None)).unwrap();
        store.delete(&song.id).unwrap();
        assert!(store.get(&song.id).unwrap().is_none());

        let result = store.delete(&song.id);
        assert!(matches!(result, Err(CatalogError::NotFound)));
    }

    #[test]
    fn increments_counters_independently() {
        let (store, _temp_dir) = create_tmp_store();

        let song = store.insert(new_song("Counted", "X", None)).unwrap();
        store.increment_counter(&song.id, Counter::Views).unwrap();
        store.increment_counter(&song.id, Counter::Views).unwrap();
        store
            .increment_counter(&song.id, Counter::Downloads)
            .unwrap();

        let fetched = store.get(&song.id).unwrap().unwrap();
        assert_eq!(fetched.views, 2);
        assert_eq!(fetched.downloads, 1);
    }

    #[test]
    fn increment_unknown_id_is_not_found() {
        let (store, _temp_dir) = create_tmp_store();
        let result = store.increment_counter("nope", Counter::Views);
        assert!(matches!(result, Err(CatalogError::NotFound)));
    }

    #[test]
    fn reopens_existing_database() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let id = {
            let store = SqliteSongStore::new(&db_path).unwrap();
            store.insert(new_song("Persisted", "X", None)).unwrap().id
        };

        let reopened = SqliteSongStore::new(&db_path).unwrap();
        assert!(reopened.get(&id).unwrap().is_some());
    }
}
