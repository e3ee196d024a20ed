use favicon_core::FaviconConfig;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = FaviconConfig::from_env()?;

    let (_state, router) = favicon_api::setup::initialize_app(config.clone()).await?;

    favicon_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
