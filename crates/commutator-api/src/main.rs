use commutator_core::{validate_env, Config};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Refuse to start without the required variables
    validate_env()?;

    let config = Config::from_env()?;

    // Initialize the application (database, tenants, services, routes)
    let (state, router) = commutator_api::setup::initialize_app(config.clone()).await?;

    commutator_api::setup::server::start_server(&config, state, router).await?;

    Ok(())
}
