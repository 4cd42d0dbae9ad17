use std::io;
use std::path::{Path, PathBuf};

use futures::future::join_all;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

use crate::models::restaurant::Restaurant;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to list data directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Read-only restaurant store over a directory of one-record JSON files.
///
/// Every call rescans the directory; there is no index or cache.
pub struct FlatFileRestaurantRepo {
    candidates: Vec<PathBuf>,
}

impl FlatFileRestaurantRepo {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }

    /// First candidate that exists and is a directory.
    pub async fn resolve_data_dir(&self) -> Option<PathBuf> {
        for candidate in &self.candidates {
            match fs::metadata(candidate).await {
                Ok(meta) if meta.is_dir() => return Some(candidate.clone()),
                _ => debug!("Data directory candidate {} not usable", candidate.display()),
            }
        }
        None
    }

    pub async fn load_all(&self) -> Result<Vec<Restaurant>, StoreError> {
        let Some(dir) = self.resolve_data_dir().await else {
            warn!("No restaurant data directory found, serving an empty list");
            return Ok(Vec::new());
        };

        let paths = list_json_files(&dir).await?;
        let parsed = join_all(paths.iter().map(|path| read_restaurant_file(path))).await;

        let restaurants: Vec<Restaurant> = paths
            .iter()
            .zip(parsed)
            .filter_map(|(path, restaurant)| {
                let restaurant = restaurant?;
                if restaurant.stable_id().is_none() {
                    warn!(
                        "Skipping {}: record has neither google_places.place_id nor id",
                        path.display()
                    );
                    return None;
                }
                Some(restaurant)
            })
            .collect();

        debug!("Loaded {} restaurants from {}", restaurants.len(), dir.display());
        Ok(restaurants)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Restaurant>, StoreError> {
        let restaurants = self.load_all().await?;
        Ok(restaurants.into_iter().find(|restaurant| restaurant.has_id(id)))
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Restaurant>, StoreError> {
        let restaurants = self.load_all().await?;
        Ok(restaurants
            .into_iter()
            .filter(|restaurant| restaurant.matches_text(query))
            .collect())
    }
}

async fn list_json_files(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let to_store_error = |source| StoreError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = fs::read_dir(dir).await.map_err(to_store_error)?;
    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(to_store_error)? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }

    paths.sort();
    Ok(paths)
}

async fn read_restaurant_file(path: &Path) -> Option<Restaurant> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Failed to read {}: {}", path.display(), e);
            return None;
        }
    };

    match serde_json::from_str::<Restaurant>(&raw) {
        Ok(restaurant) => Some(restaurant),
        Err(e) => {
            warn!("Failed to parse {}: {}", path.display(), e);
            None
        }
    }
}
