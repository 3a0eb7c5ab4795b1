use super::store::FavoritesStore;
use anyhow::Result;
use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Mutex;

/// File-backed favorites. The JSON dump is read once at initialization and
/// the in-memory copy is the source of truth for the rest of the session;
/// every toggle rewrites the file.
pub struct FileFavoritesStore {
    file_path: PathBuf,
    favorites: Mutex<Vec<String>>,
}

impl FileFavoritesStore {
    fn load_from_file(file_path: &PathBuf) -> Result<Vec<String>> {
        let mut file = File::open(file_path)?;

        let mut content = String::new();
        file.read_to_string(&mut content)?;

        Ok(serde_json::from_str(&content)?)
    }

    /// A missing or unreadable dump file starts an empty set.
    pub fn initialize(file_path: PathBuf) -> FileFavoritesStore {
        FileFavoritesStore {
            file_path: file_path.clone(),
            favorites: Mutex::new(Self::load_from_file(&file_path).unwrap_or_default()),
        }
    }

    fn save(&self, favorites: &[String]) -> Result<()> {
        let json_string = serde_json::to_string_pretty(favorites)?;
        let mut file = File::create(&self.file_path)?;
        file.write_all(json_string.as_bytes())?;
        Ok(())
    }
}

impl FavoritesStore for FileFavoritesStore {
    fn is_favorite(&self, id: &str) -> bool {
        self.favorites.lock().unwrap().iter().any(|f| f == id)
    }

    fn toggle(&self, id: &str) -> Result<Vec<String>> {
        let mut favorites = self.favorites.lock().unwrap();
        match favorites.iter().position(|f| f == id) {
            Some(index) => {
                favorites.remove(index);
            }
            None => favorites.push(id.to_string()),
        }
        self.save(&favorites)?;
        Ok(favorites.clone())
    }

    fn list(&self) -> Vec<String> {
        self.favorites.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_tmp_store() -> (FileFavoritesStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileFavoritesStore::initialize(temp_dir.path().join("favorites.json"));
        (store, temp_dir)
    }

    #[test]
    fn starts_empty_without_a_dump_file() {
        let (store, _temp_dir) = create_tmp_store();
        assert!(store.list().is_empty());
        assert!(!store.is_favorite("abc"));
    }

    #[test]
    fn corrupt_dump_file_starts_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("favorites.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileFavoritesStore::initialize(path);
        assert!(store.list().is_empty());

        // The bad dump is replaced on the next toggle.
        let after = store.toggle("abc").unwrap();
        assert_eq!(after, vec!["abc".to_string()]);
    }

    #[test]
    fn toggle_adds_then_removes() {
        let (store, _temp_dir) = create_tmp_store();

        let after_add = store.toggle("abc").unwrap();
        assert_eq!(after_add, vec!["abc".to_string()]);
        assert!(store.is_favorite("abc"));

        let after_remove = store.toggle("abc").unwrap();
        assert!(after_remove.is_empty());
        assert!(!store.is_favorite("abc"));
    }

    #[test]
    fn toggle_twice_restores_the_original_set() {
        let (store, _temp_dir) = create_tmp_store();
        store.toggle("first").unwrap();
        store.toggle("second").unwrap();
        let original = store.list();

        store.toggle("third").unwrap();
        store.toggle("third").unwrap();
        assert_eq!(store.list(), original);

        store.toggle("first").unwrap();
        store.toggle("first").unwrap();
        // Re-adding moves the id to the end; membership is what must match.
        assert!(store.is_favorite("first"));
        assert_eq!(store.list().len(), original.len());
    }

    #[test]
    fn keeps_insertion_order_without_duplicates() {
        let (store, _temp_dir) = create_tmp_store();
        store.toggle("a").unwrap();
        store.toggle("b").unwrap();
        store.toggle("c").unwrap();
        store.toggle("b").unwrap();
        assert_eq!(store.list(), vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn persists_across_reinitialization() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("favorites.json");

        {
            let store = FileFavoritesStore::initialize(path.clone());
            store.toggle("abc").unwrap();
            store.toggle("def").unwrap();
        }

        let reloaded = FileFavoritesStore::initialize(path);
        assert_eq!(reloaded.list(), vec!["abc".to_string(), "def".to_string()]);
    }
}
