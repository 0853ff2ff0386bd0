//! Favorite toggling against the remote catalog.
//!
//! The toggle direction comes from a local liked-ids cache; the remote call
//! runs through the retry executor with the critical policy. Rapid repeated
//! toggles for the same song coalesce onto one in-flight call: the second
//! caller awaits the first call's shared future instead of issuing a
//! duplicate request.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tokio::sync::{Mutex, RwLock};

use crate::catalog::FavoritesApi;
use crate::error::ClassifiedError;
use crate::model::CatalogSong;
use crate::notify::{Notification, NotificationBus};
use crate::retry::{RetryExecutor, RetryPolicy};

/// Liked song ids, kept locally so a toggle knows which direction to go
/// without a round trip. Optionally persisted as a JSON list of ids.
#[derive(Clone)]
pub struct FavoriteCache {
    liked_ids: Arc<RwLock<HashSet<String>>>,
    path: Option<PathBuf>,
}

impl FavoriteCache {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            liked_ids: Arc::new(RwLock::new(HashSet::new())),
            path,
        }
    }

    pub async fn load_from_disk(&self) -> anyhow::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let ids: Vec<String> = serde_json::from_str(&content)?;
            let mut liked_ids = self.liked_ids.write().await;
            *liked_ids = ids.into_iter().collect();
        }
        Ok(())
    }

    pub async fn save_to_disk(&self) -> anyhow::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            if !dir.exists() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let liked_ids = self.liked_ids.read().await;
        let ids: Vec<&String> = liked_ids.iter().collect();
        let content = serde_json::to_string(&ids)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub async fn is_liked(&self, song_id: &str) -> bool {
        self.liked_ids.read().await.contains(song_id)
    }

    pub async fn set_liked(&self, song_id: String, liked: bool) {
        let mut liked_ids = self.liked_ids.write().await;
        if liked {
            liked_ids.insert(song_id);
        } else {
            liked_ids.remove(&song_id);
        }
    }

    pub async fn replace(&self, ids: Vec<String>) {
        let mut liked_ids = self.liked_ids.write().await;
        *liked_ids = ids.into_iter().collect();
    }
}

type ToggleFuture = Shared<BoxFuture<'static, Result<bool, ClassifiedError>>>;

/// Executes favorite toggles with retry, in-flight coalescing, and
/// notifications for the presentation layer.
#[derive(Clone)]
pub struct FavoriteService {
    api: Arc<dyn FavoritesApi>,
    executor: RetryExecutor,
    policy: RetryPolicy,
    cache: FavoriteCache,
    bus: NotificationBus,
    inflight: Arc<Mutex<HashMap<String, ToggleFuture>>>,
}

impl FavoriteService {
    pub fn new(
        api: Arc<dyn FavoritesApi>,
        executor: RetryExecutor,
        policy: RetryPolicy,
        cache: FavoriteCache,
        bus: NotificationBus,
    ) -> Self {
        Self {
            api,
            executor,
            policy,
            cache,
            bus,
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn cache(&self) -> &FavoriteCache {
        &self.cache
    }

    /// Toggle the favorite flag for `song` and return the new liked state.
    ///
    /// Concurrent calls for the same song id share one remote call and all
    /// observe its result. Terminal failures surface as [`ClassifiedError`]
    /// and also go out as [`Notification::FavoriteFailed`].
    pub async fn toggle_favorite(&self, song: &CatalogSong) -> Result<bool, ClassifiedError> {
        let toggle = {
            let mut inflight = self.inflight.lock().await;
            if let Some(existing) = inflight.get(&song.id) {
                tracing::debug!(song_id = %song.id, "joining in-flight favorite toggle");
                existing.clone()
            } else {
                let toggle = self.run_toggle(song.clone()).boxed().shared();
                inflight.insert(song.id.clone(), toggle.clone());
                toggle
            }
        };

        let result = toggle.clone().await;

        // First finisher clears the slot; later callers that joined the same
        // future find it already replaced or gone and leave it alone.
        let mut inflight = self.inflight.lock().await;
        if inflight.get(&song.id).is_some_and(|f| f.ptr_eq(&toggle)) {
            inflight.remove(&song.id);
        }

        result
    }

    fn run_toggle(
        &self,
        song: CatalogSong,
    ) -> impl Future<Output = Result<bool, ClassifiedError>> + Send + 'static {
        let api = self.api.clone();
        let executor = self.executor.clone();
        let policy = self.policy.clone();
        let cache = self.cache.clone();
        let bus = self.bus.clone();

        async move {
            let liked = !cache.is_liked(&song.id).await;
            tracing::debug!(song_id = %song.id, liked, "toggling favorite");

            let operation = {
                let api = api.clone();
                let song_id = song.id.clone();
                move || {
                    let api = api.clone();
                    let song_id = song_id.clone();
                    async move { api.set_favorite(&song_id, liked).await }
                }
            };

            match executor.execute(&policy, "favorite_toggle", operation).await {
                Ok(()) => {
                    cache.set_liked(song.id.clone(), liked).await;
                    // Persist before reporting success so the last toggle
                    // survives process exit. A write failure is logged but
                    // does not fail the toggle; the remote state is already
                    // updated.
                    if let Err(e) = cache.save_to_disk().await {
                        tracing::warn!(error = %e, "could not persist favorites cache");
                    }
                    tracing::info!(song_id = %song.id, liked, "favorite updated");
                    bus.publish(Notification::FavoriteSucceeded {
                        song_id: song.id.clone(),
                    });
                    Ok(liked)
                }
                Err(err) => {
                    bus.publish(Notification::FavoriteFailed(err.clone()));
                    Err(err)
                }
            }
        }
    }
}
