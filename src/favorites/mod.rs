mod file_store;
mod store;

pub use file_store::FileFavoritesStore;
pub use store::FavoritesStore;
