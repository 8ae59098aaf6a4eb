use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_UPSTREAM_URL: &str = "https://data.calgary.ca/resource/cchr-krqg.json";
pub const DEFAULT_LAND_USE_URL: &str = "https://data.calgary.ca/resource/qe6k-p9nh.json";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub upstream_url: String,
    /// `$limit` sent to the upstream resource.
    pub limit: u32,
    pub land_use_url: String,
    pub land_use_limit: u32,
    /// JSON file holding saved filter sets.
    pub filters_path: PathBuf,
    /// Allowed CORS origin; any origin when unset.
    pub cors_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 5050)),
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            limit: 1000,
            land_use_url: DEFAULT_LAND_USE_URL.to_string(),
            land_use_limit: 5000,
            filters_path: PathBuf::from("filters.json"),
            cors_origin: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();
        let addr = match env::var("BUILDINGS_ADDR") {
            Ok(raw) => raw
                .parse()
                .map_err(|e| format!("invalid BUILDINGS_ADDR {raw:?}: {e}"))?,
            Err(_) => defaults.addr,
        };
        Ok(Self {
            addr,
            upstream_url: env::var("BUILDINGS_UPSTREAM_URL").unwrap_or(defaults.upstream_url),
            limit: env_var_u32("BUILDINGS_LIMIT", defaults.limit),
            land_use_url: env::var("LAND_USE_URL").unwrap_or(defaults.land_use_url),
            land_use_limit: env_var_u32("LAND_USE_LIMIT", defaults.land_use_limit),
            filters_path: env::var("FILTERS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.filters_path),
            cors_origin: env::var("CORS_ORIGIN").ok().filter(|v| !v.trim().is_empty()),
        })
    }
}

fn env_var_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
