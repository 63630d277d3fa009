use waitlist::{config::AppConfig, App, Result};

#[tokio::main]
async fn main() -> Result<()> {
    // We have a different logging mechanism for production
    #[cfg(not(debug_assertions))]
    {
        waitlist::init_production_tracing()
    }
    #[cfg(debug_assertions)]
    {
        waitlist::init_dbg_tracing();
    }

    // Fails fast if the storage URI is missing.
    let config = AppConfig::load()?;
    let app = App::build_from_config(config).await?;

    waitlist::serve(app).await?;

    Ok(())
}
