use header_injector_plugin::{serve, Activation, HeaderInjector};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Starting header-injector plugin");

    serve(HeaderInjector::new(), Activation::OnConfigure, None).await?;

    tracing::info!("header-injector plugin stopped");
    Ok(())
}
