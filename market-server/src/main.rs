use market_server::core::{self, Config, ServerState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    core::init_logger();

    let config = Config::from_env();
    tracing::info!(work_dir = %config.work_dir, "starting market server");

    let state = ServerState::new(config)?;
    core::serve(state).await
}
