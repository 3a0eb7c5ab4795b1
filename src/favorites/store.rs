use anyhow::Result;

/// Device-local set of favorited song ids. Purely client-side: nothing here
/// ever talks to the server, and the set only references catalog ids by
/// value.
pub trait FavoritesStore: Send + Sync {
    /// Whether the given song id is currently favorited.
    fn is_favorite(&self, id: &str) -> bool;

    /// Flips the favorite state of an id and returns the resulting set:
    /// a present id is removed, an absent one is appended.
    fn toggle(&self, id: &str) -> Result<Vec<String>>;

    /// The favorited ids, in the order they were added.
    fn list(&self) -> Vec<String>;
}
