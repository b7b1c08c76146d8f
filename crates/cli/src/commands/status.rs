//! `parley status`: show configuration and history usage.

use parley_config::AppConfig;

use super::{load_config, load_log, open_store};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let store = open_store(&config);
    let log = load_log(&config, &store).await?;

    println!("Parley Status");
    println!("=============");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Data dir:     {}", config.data_dir().display());
    println!("  API URL:      {}", config.api_url);
    println!("  Model:        {}", config.model);
    println!("  Temperature:  {}", config.generation.temperature);
    println!("  Memory:       {}/{}", log.len(), log.capacity());
    println!("  Context:      last {} messages", config.history.window);
    println!(
        "  Connectivity: {}",
        if config.connectivity.enabled {
            format!("probing {}:{}", config.connectivity.probe_host, config.connectivity.probe_port)
        } else {
            "not monitored".to_string()
        }
    );
    println!("  API key:      {}", if config.has_api_key() { "configured" } else { "missing" });

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file, run `parley onboard` first");
    }

    Ok(())
}
