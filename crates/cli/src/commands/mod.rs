//! Subcommand implementations and the helpers they share.

pub mod chat;
pub mod clear;
pub mod export;
pub mod history;
pub mod onboard;
pub mod status;

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Local, TimeZone, Utc};
use parley_config::AppConfig;
use parley_core::export::ExportDocument;
use parley_core::log::MessageLog;
use parley_core::message::{Message, Role};
use parley_core::notice::NoticeSink;
use parley_core::store::Store;
use parley_store::FileStore;
use tracing::warn;

/// Prints notices to stderr.
pub struct StderrNotices;

impl NoticeSink for StderrNotices {
    fn notify(&self, notice: &str) {
        eprintln!("  [Error] {notice}");
    }
}

pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

pub fn open_store(config: &AppConfig) -> FileStore {
    FileStore::new(config.data_dir())
}

/// Read the stored conversation without starting a session.
pub async fn load_log(
    config: &AppConfig,
    store: &FileStore,
) -> Result<MessageLog, Box<dyn std::error::Error>> {
    let mut log = MessageLog::new(config.history.capacity);
    if let Some(raw) = store.load(&config.history.storage_key).await? {
        let report = log.restore(&raw);
        if report.dropped > 0 {
            warn!(dropped = report.dropped, "Some stored messages could not be read");
        }
    }
    Ok(log)
}

/// `HH:MM` in 24-hour form.
pub fn format_clock<Tz: TimeZone>(ts: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    ts.format("%H:%M").to_string()
}

/// `HH:MM` in the local time zone.
pub fn format_time(ts: &DateTime<Utc>) -> String {
    format_clock(&ts.with_timezone(&Local))
}

pub fn speaker(role: Role) -> &'static str {
    match role {
        Role::User => "You",
        Role::Assistant => "Assistant",
    }
}

/// Print one message with its time, indenting continuation lines.
pub fn print_message(message: &Message) {
    let prefix = format!("  [{}] {} > ", format_time(&message.created_at()), speaker(message.role()));
    let indent = " ".repeat(prefix.chars().count());
    for (i, line) in message.content().lines().enumerate() {
        if i == 0 {
            println!("{prefix}{line}");
        } else {
            println!("{indent}{line}");
        }
    }
}

pub fn write_export(doc: &ExportDocument, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let json = doc.to_pretty_json()?;
    std::fs::write(path, json).map_err(|e| format!("Failed to write {}: {e}", path.display()))?;
    Ok(())
}
