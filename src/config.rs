use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use axum::http::HeaderValue;
use clap::Parser;
use tower_http::cors::AllowOrigin;
use tracing::warn;

#[derive(Parser, Clone, Debug)]
#[command(name = "where2eat-backend", about = "Where2Eat restaurant API")]
pub struct Config {
    #[clap(env, long, default_value = "127.0.0.1")]
    pub host: IpAddr,

    #[clap(env, long, default_value_t = 3000)]
    pub port: u16,

    /// Comma separated CORS origins, `*` for any.
    #[clap(env, long, default_value = "*")]
    pub origin_urls: String,

    /// Candidate restaurant data directories, first existing one wins.
    #[clap(
        env,
        long,
        value_delimiter = ',',
        default_value = "data/restaurants,../data/restaurants"
    )]
    pub data_dirs: Vec<PathBuf>,

    #[clap(env = "GOOGLE_PLACES_API_KEY", long)]
    pub google_places_api_key: Option<String>,

    #[clap(env = "NEXT_PUBLIC_GOOGLE_PLACES_API_KEY", long, hide = true)]
    pub public_google_places_api_key: Option<String>,

    #[clap(env, long, default_value = "https://maps.googleapis.com")]
    pub places_legacy_base_url: String,

    #[clap(env, long, default_value = "https://places.googleapis.com")]
    pub places_v1_base_url: String,

    /// Fallback tracing filter when RUST_LOG is unset.
    #[clap(env, long, default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// The server-side key wins over the public one.
    pub fn places_api_key(&self) -> Option<String> {
        [&self.google_places_api_key, &self.public_google_places_api_key]
            .into_iter()
            .flatten()
            .map(|key| key.trim())
            .find(|key| !key.is_empty())
            .map(str::to_string)
    }

    pub fn allowed_origins(&self) -> AllowOrigin {
        if self.origin_urls.split(',').any(|origin| origin.trim() == "*") {
            return AllowOrigin::any();
        }

        let origins: Vec<HeaderValue> = self
            .origin_urls
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("Ignoring invalid CORS origin {}: {}", origin, e);
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    }
}
