//! `parley history`: print the stored conversation.

use super::{load_config, load_log, open_store, print_message};

pub async fn run(limit: Option<usize>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let store = open_store(&config);
    let log = load_log(&config, &store).await?;

    if log.is_empty() {
        println!("  No messages yet. Start with `parley chat`.");
        return Ok(());
    }

    let shown = log.windowed(limit.unwrap_or(log.len()));
    for message in &shown {
        print_message(message);
    }
    println!();
    println!("  Showing {} of {} messages", shown.len(), log.len());

    Ok(())
}
