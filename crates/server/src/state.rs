//! Application state shared across handlers.

use singletrack_core::config::AppConfig;
use singletrack_store::TrailStore;
use singletrack_tiles::{
    EventDispatcher, TileCache, TileRenderer, TileService, TrailService, standard_dispatcher,
};
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Trail store.
    pub store: Arc<dyn TrailStore>,
    /// Tile read path (cache, renderer, fallback policy).
    pub tiles: Arc<TileService>,
    /// Trail write path (store mutation, index recompute, events).
    pub trails: Arc<TrailService>,
    /// Event dispatcher, exposed for additional subscribers.
    pub dispatcher: Arc<EventDispatcher>,
}

impl AppState {
    /// Wire the full pipeline from a config and an opened store: one cache
    /// instance shared by the coordinator and the invalidation handler.
    pub fn new(config: AppConfig, store: Arc<dyn TrailStore>) -> Self {
        let cache = Arc::new(TileCache::new());
        let dispatcher = standard_dispatcher(cache.clone(), store.clone());

        let renderer = TileRenderer::new(store.clone(), config.tiles.clone());
        let tiles = Arc::new(TileService::new(cache, renderer, &config.tiles));
        let trails = Arc::new(TrailService::new(
            store.clone(),
            dispatcher.clone(),
            config.tiles.clone(),
        ));

        Self {
            config: Arc::new(config),
            store,
            tiles,
            trails,
            dispatcher,
        }
    }
}
