//! `parley chat`: interactive or single-message chat mode.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parley_config::AppConfig;
use parley_core::connectivity::Connectivity;
use parley_core::export::ExportDocument;
use parley_core::notice::{CONNECTION_LOST_NOTICE, NoticeSink};
use parley_providers::GeminiTransport;
use parley_session::{ChatSession, ConnectivityMonitor, Probe, SendOutcome, TcpProbe};
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

use super::{StderrNotices, load_config, open_store, print_message, write_export};

fn online_label(online: bool) -> &'static str {
    if online { "Online" } else { "Offline" }
}

fn is_exit_command(line: &str) -> bool {
    matches!(line, "exit" | "quit" | "/exit" | "/quit" | ":q")
}

/// Start probing connectivity and report transitions on the terminal.
async fn start_monitor(
    config: &AppConfig,
    notices: Arc<dyn NoticeSink>,
) -> (Arc<ConnectivityMonitor>, Vec<JoinHandle<()>>) {
    let monitor = Arc::new(ConnectivityMonitor::default());
    if !config.connectivity.enabled {
        return (monitor, Vec::new());
    }

    let probe = Arc::new(TcpProbe::from_config(&config.connectivity));
    monitor.set_online(probe.check().await);

    let poller = monitor.spawn_probe(probe, Duration::from_secs(config.connectivity.interval_secs.max(1)));

    let mut rx = monitor.subscribe();
    let reporter = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let online = *rx.borrow_and_update();
            eprintln!("\n  Status: {}", online_label(online));
            if !online {
                notices.notify(CONNECTION_LOST_NOTICE);
            }
        }
    });

    (monitor, vec![poller, reporter])
}

fn print_outcome(outcome: &SendOutcome) {
    match outcome {
        SendOutcome::Replied { reply, .. } => {
            println!();
            print_message(reply);
            println!();
        }
        // Failures and offline sends already produced a notice.
        SendOutcome::Failed(_) | SendOutcome::Offline | SendOutcome::Ignored(_) => {}
    }
}

pub async fn run(message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;

    // Check for API key early, give a clear error
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    export PARLEY_API_KEY=...");
        eprintln!("    export GEMINI_API_KEY=...");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let transport = Arc::new(GeminiTransport::from_config(&config)?);
    let notices: Arc<dyn NoticeSink> = Arc::new(StderrNotices);
    let (monitor, tasks) = start_monitor(&config, notices.clone()).await;

    let session = ChatSession::from_config(
        &config,
        transport,
        Arc::new(open_store(&config)),
        monitor.clone(),
        notices,
    );
    session.restore().await?;

    let result = match message {
        Some(msg) => single(&session, &msg).await,
        None => interactive(&config, &session, &*monitor).await,
    };

    for task in tasks {
        task.abort();
    }
    result
}

async fn single(session: &ChatSession, msg: &str) -> Result<(), Box<dyn std::error::Error>> {
    eprint!("  Thinking...");
    let outcome = session.send_message(msg).await;
    eprint!("\r              \r");
    match outcome {
        SendOutcome::Replied { reply, .. } => {
            println!("{}", reply.content());
            Ok(())
        }
        SendOutcome::Ignored(reason) => Err(format!("Message ignored: {reason:?}").into()),
        SendOutcome::Offline => Err("No internet connection".into()),
        SendOutcome::Failed(e) => Err(e.into()),
    }
}

async fn interactive(
    config: &AppConfig,
    session: &ChatSession,
    connectivity: &dyn Connectivity,
) -> Result<(), Box<dyn std::error::Error>> {
    let (used, capacity) = session.memory_usage().await;

    println!();
    println!("  Parley, interactive mode");
    println!();
    println!("  Model:     {}", config.model);
    println!("  Memory:    {used}/{capacity}");
    println!("  Status:    {}", online_label(connectivity.is_online()));
    println!();
    println!("  Type your message and press Enter.");
    println!("  /history, /clear and /export manage the conversation.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(io::stdin()).lines();

    print!("  You > ");
    std::io::stdout().flush()?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if is_exit_command(line) {
            break;
        }

        match line {
            "" => {}
            "/history" => {
                for message in session.messages().await {
                    print_message(&message);
                }
            }
            "/clear" => match session.clear().await {
                Ok(()) => println!("  Conversation cleared."),
                Err(e) => eprintln!("  [Error] {e}"),
            },
            "/export" => {
                let doc = session.export().await;
                let path = PathBuf::from(ExportDocument::file_name(Utc::now()));
                match write_export(&doc, &path) {
                    Ok(()) => println!("  Exported {} messages to {}", doc.messages.len(), path.display()),
                    Err(e) => eprintln!("  [Error] {e}"),
                }
            }
            text => {
                eprint!("  ...");
                let outcome = session.send_message(text).await;
                eprint!("\r     \r");
                print_outcome(&outcome);

                let (used, capacity) = session.memory_usage().await;
                println!("  Memory: {used}/{capacity}");
                println!();
            }
        }

        print!("  You > ");
        std::io::stdout().flush()?;
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}
