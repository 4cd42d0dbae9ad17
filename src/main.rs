use clap::Parser;
use dotenv::dotenv;
use tracing_subscriber::EnvFilter;
use where2eat::config::Config;
use where2eat::controller;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let config = Config::parse();

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    controller::serve(&config).await
}
