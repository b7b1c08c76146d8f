//! `parley export`: write the conversation to a JSON file.

use std::path::PathBuf;

use chrono::Utc;
use parley_core::export::ExportDocument;

use super::{load_config, load_log, open_store, write_export};

pub async fn run(output: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let store = open_store(&config);
    let log = load_log(&config, &store).await?;

    let now = Utc::now();
    let doc = ExportDocument::at(&log, now);
    let path = output.unwrap_or_else(|| PathBuf::from(ExportDocument::file_name(now)));
    write_export(&doc, &path)?;

    println!("✅ Exported {} messages to {}", doc.messages.len(), path.display());
    Ok(())
}
