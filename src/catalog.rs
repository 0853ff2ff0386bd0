//! External catalog collaborators.
//!
//! The remote service is opaque to this crate: the composition root injects
//! implementations of these traits (HTTP client, scripting bridge, mocks in
//! tests). Both may fail with any [`PlayerError`]; classification happens in
//! the retry executor, not here.

use async_trait::async_trait;

use crate::error::PlayerError;
use crate::model::CatalogSong;

/// Looks up the canonical catalog entity for a raw track.
#[async_trait]
pub trait CatalogSearch: Send + Sync {
    /// Search the catalog. `Ok(None)` means the search succeeded but nothing
    /// matched; that is not an error.
    async fn search(&self, query: &str) -> Result<Option<CatalogSong>, PlayerError>;
}

/// Sets or clears the favorite flag for a catalog song.
#[async_trait]
pub trait FavoritesApi: Send + Sync {
    async fn set_favorite(&self, song_id: &str, liked: bool) -> Result<(), PlayerError>;
}
