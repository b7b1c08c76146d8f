//! `parley clear`: delete the stored conversation.

use parley_core::store::Store;

use super::{load_config, load_log, open_store};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let store = open_store(&config);
    let mut log = load_log(&config, &store).await?;

    let removed = log.len();
    log.clear();
    store.save(&config.history.storage_key, &log.serialize()?).await?;

    println!("✅ Cleared {removed} messages");
    Ok(())
}
