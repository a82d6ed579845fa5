mod api_doc;
mod error;
mod handlers;
mod setup;
mod state;

use memoria_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    let (_state, router) = setup::initialize_app(config.clone()).await?;

    setup::start_server(&config, router).await?;

    Ok(())
}
