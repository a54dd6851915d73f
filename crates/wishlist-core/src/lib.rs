pub mod app_config;
pub mod config;
pub mod items;
pub mod products;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env, DEFAULT_FETCH_USER_AGENT};
pub use items::{EnrichStatus, ItemSource, WishlistItem, DEFAULT_CATEGORY};
pub use products::{ExtractionStatus, ProductRecord};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
