use relay_agent::{AgentConfig, init_logger_with_file, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = AgentConfig::from_env();
    std::fs::create_dir_all(&config.work_dir)?;

    let log_dir = config.log_dir();
    let json = config.log_json || config.is_production();
    init_logger_with_file(&config.log_level, json, Some(&log_dir))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        work_dir = %config.work_dir.display(),
        "Print agent starting"
    );

    if let Err(e) = server::run(config).await {
        tracing::error!(error = %e, "Print agent failed");
        return Err(e);
    }

    Ok(())
}
