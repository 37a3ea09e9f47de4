use glasschat_client::{init_tracing, terminal, AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env()?;
    terminal::run(config).await
}
