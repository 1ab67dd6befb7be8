use std::sync::Arc;

use broadcast::{FactCompletion, PushSender, openrouter::OpenRouterClient, push::PushClient};
use store::{FactStore, database::{RedisStore, init_redis}};

use super::config::Config;

/// Process-wide handles, initialized once and shared by every request.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn FactStore>,
    pub ai: Arc<dyn FactCompletion>,
    pub push: Arc<dyn PushSender>,
}

impl AppState {
    pub async fn new() -> Arc<Self> {
        let config = Config::load();

        let connection = init_redis(&config.redis_url).await;
        let store = Arc::new(RedisStore::new(connection));

        let http = reqwest::Client::new();
        let ai = Arc::new(OpenRouterClient::new(
            http.clone(),
            config.openrouter_url.clone(),
            config.openrouter_model.clone(),
            config.openrouter_api_key.clone(),
        ));
        let push = Arc::new(PushClient::new(
            http,
            config.push_endpoint.clone(),
            config.push_api_key.clone(),
        ));

        Arc::new(Self {
            config,
            store,
            ai,
            push,
        })
    }
}
