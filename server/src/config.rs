use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use tracing::{info, warn};

use broadcast::openrouter::{DEFAULT_BASE_URL, DEFAULT_MODEL};

pub struct Config {
    pub port: u16,
    pub redis_url: String,
    pub openrouter_url: String,
    pub openrouter_model: String,
    pub openrouter_api_key: String,
    pub push_endpoint: String,
    pub push_api_key: String,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("RUST_PORT", "3000"),
            redis_url: try_load("REDIS_URL", "redis://127.0.0.1:6379"),
            openrouter_url: try_load("OPENROUTER_URL", DEFAULT_BASE_URL),
            openrouter_model: try_load("OPENROUTER_MODEL", DEFAULT_MODEL),
            openrouter_api_key: read_secret("OPENROUTER_API_KEY"),
            push_endpoint: try_load("PUSH_ENDPOINT", "http://localhost:8200/send"),
            push_api_key: read_secret("PUSH_API_KEY"),
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}

fn read_secret(secret_name: &str) -> String {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            warn!("Failed to read {secret_name} from file: {e}");
        })
        .expect("Secrets misconfigured!")
}
