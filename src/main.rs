use roomgen::logger::{self, log_config_info, log_startup_info};
use roomgen::server::{self, AppState};
use roomgen::{Config, ImageStorageManager, UpstreamContext};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_loaded = dotenv::dotenv().is_ok();

    logger::init()?;
    if env_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    let config = Config::from_env();
    log_startup_info("roomgen", env!("CARGO_PKG_VERSION"), config.server_port());
    log_config_info(&config);

    log::info!("🔄 Creating upstream clients...");
    let upstream = match UpstreamContext::new(&config) {
        Ok(upstream) => upstream,
        Err(e) => {
            log::error!("❌ Failed to initialize upstream clients: {}", e);
            return Err(e.into());
        }
    };

    let storage = ImageStorageManager::new(&config).await?;

    server::run(AppState::new(config, upstream, storage)).await?;
    Ok(())
}
