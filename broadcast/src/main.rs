use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use broadcast::{
    BroadcastOutcome,
    openrouter::{DEFAULT_BASE_URL, DEFAULT_MODEL, OpenRouterClient},
    push::PushClient,
};
use store::database::{RedisStore, init_redis};

/// Runs the daily fact broadcast once. API keys come from the
/// OPENROUTER_API_KEY and PUSH_API_KEY environment variables.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[arg(long, default_value = "redis://127.0.0.1:6379")]
    redis_url: String,

    #[arg(long, default_value = DEFAULT_BASE_URL)]
    openrouter_url: String,

    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    #[arg(long)]
    push_endpoint: String,
}

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = Args::parse();
    let api_key = std::env::var("OPENROUTER_API_KEY").expect("OPENROUTER_API_KEY not set");
    let push_key = std::env::var("PUSH_API_KEY").expect("PUSH_API_KEY not set");

    let connection = init_redis(&args.redis_url).await;
    let store = RedisStore::new(connection);

    let http = reqwest::Client::new();
    let ai = OpenRouterClient::new(http.clone(), args.openrouter_url, args.model, api_key);
    let push = PushClient::new(http, args.push_endpoint, push_key);

    match broadcast::run(&store, &ai, &push).await {
        Ok(BroadcastOutcome::NoSubscribers) => println!("No subscribers found."),
        Ok(BroadcastOutcome::Completed(results)) => {
            println!("{}", serde_json::to_string_pretty(&results).unwrap());
        }
        Err(err) => {
            eprintln!("Broadcast failed: {err}");
            std::process::exit(1);
        }
    }
}
