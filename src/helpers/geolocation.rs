use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::helpers::geo::GeoCoords;

/// Geolocation failures. `Display` gives the message shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PositionError {
    #[error("הגישה למיקום נדחתה. יש לאשר גישה למיקום בהגדרות הדפדפן")]
    PermissionDenied,

    #[error("לא ניתן לקבוע את המיקום הנוכחי")]
    PositionUnavailable,

    #[error("תם הזמן לקבלת המיקום, נסו שוב")]
    Timeout,

    #[error("הדפדפן אינו תומך באיתור מיקום")]
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub enable_high_accuracy: bool,
    pub timeout: Duration,
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout: Duration::from_secs(10),
            maximum_age: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(pub u64);

pub type PositionCallback = Box<dyn Fn(Result<GeoCoords, PositionError>) + Send + Sync>;

/// The device positioning API.
pub trait PositionSource {
    fn current_position(
        &self,
        options: PositionOptions,
    ) -> impl Future<Output = Result<GeoCoords, PositionError>> + Send;

    fn watch_position(
        &self,
        options: PositionOptions,
        callback: PositionCallback,
    ) -> Result<WatchId, PositionError>;

    fn clear_watch(&self, id: WatchId);
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeolocationState {
    pub coords: Option<GeoCoords>,
    pub error: Option<String>,
    pub loading: bool,
    pub watching: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Tracks the device position through a [`PositionSource`].
///
/// At most one watch is registered at a time, and fixes delivered by a watch
/// that has since been cancelled are discarded.
pub struct GeolocationTracker<S: PositionSource> {
    source: S,
    options: PositionOptions,
    state: Arc<Mutex<GeolocationState>>,
    active_watch: Mutex<Option<WatchId>>,
    generation: Arc<AtomicU64>,
}

impl<S: PositionSource> GeolocationTracker<S> {
    pub fn new(source: S) -> Self {
        Self::with_options(source, PositionOptions::default())
    }

    pub fn with_options(source: S, options: PositionOptions) -> Self {
        Self {
            source,
            options,
            state: Arc::new(Mutex::new(GeolocationState::default())),
            active_watch: Mutex::new(None),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn state(&self) -> GeolocationState {
        lock(&self.state).clone()
    }

    pub fn is_watching(&self) -> bool {
        lock(&self.active_watch).is_some()
    }

    pub async fn get_current_position(&self) -> Result<GeoCoords, PositionError> {
        {
            let mut state = lock(&self.state);
            state.loading = true;
            state.error = None;
        }

        let result = self.source.current_position(self.options).await;

        let mut state = lock(&self.state);
        state.loading = false;
        match result {
            Ok(coords) => state.coords = Some(coords),
            Err(e) => {
                warn!("Failed to acquire current position: {:?}", e);
                state.error = Some(e.to_string());
            }
        }
        result
    }

    /// Starts continuous tracking, replacing any watch already running.
    ///
    /// Failures only show up in [`GeolocationState::error`].
    pub fn watch_position(&self) {
        self.stop_watching();

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = lock(&self.state);
            state.loading = true;
            state.error = None;
        }

        let state = Arc::clone(&self.state);
        let current_generation = Arc::clone(&self.generation);
        let callback: PositionCallback = Box::new(move |fix| {
            if current_generation.load(Ordering::SeqCst) != generation {
                debug!("Dropping fix from a cancelled watch");
                return;
            }
            let mut state = lock(&state);
            state.loading = false;
            match fix {
                Ok(coords) => {
                    state.coords = Some(coords);
                    state.error = None;
                }
                Err(e) => state.error = Some(e.to_string()),
            }
        });

        match self.source.watch_position(self.options, callback) {
            Ok(id) => {
                *lock(&self.active_watch) = Some(id);
                lock(&self.state).watching = true;
                debug!(watch_id = id.0, "Started position watch");
            }
            Err(e) => {
                warn!("Failed to start position watch: {:?}", e);
                let mut state = lock(&self.state);
                state.loading = false;
                state.watching = false;
                state.error = Some(e.to_string());
            }
        }
    }

    pub fn stop_watching(&self) {
        let previous = lock(&self.active_watch).take();
        if let Some(id) = previous {
            self.generation.fetch_add(1, Ordering::SeqCst);
            self.source.clear_watch(id);
            debug!(watch_id = id.0, "Cleared position watch");
        }

        let mut state = lock(&self.state);
        state.watching = false;
        state.loading = false;
    }
}

impl<S: PositionSource> Drop for GeolocationTracker<S> {
    fn drop(&mut self) {
        if let Some(id) = lock(&self.active_watch).take() {
            self.source.clear_watch(id);
        }
    }
}
