use std::sync::Arc;

use tracing::{error, info};

use mobot_core::{
    catalog::DirCatalog, config::Config, dispatch::Dispatcher, identity::FileIdentityStore,
};

#[tokio::main]
async fn main() -> Result<(), mobot_core::Error> {
    mobot_core::logging::init("mobot")?;

    let cfg = match Config::load() {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            error!("fatal: {e}");
            return Err(e);
        }
    };

    let catalog = Arc::new(DirCatalog::new(cfg.problems_dir.clone()));
    let identities = Arc::new(FileIdentityStore::open(cfg.users_file.clone()));
    info!("tracking users in {}", identities.path().display());

    let dispatcher = Arc::new(Dispatcher::new(cfg.clone(), catalog, identities));

    mobot_telegram::router::run(cfg, dispatcher)
        .await
        .map_err(|e| mobot_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
