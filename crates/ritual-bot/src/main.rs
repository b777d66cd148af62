mod dialog;
mod dispatch;
mod handlers;
mod menus;
mod outcome;
mod state;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ritual_db::Database;
use ritual_sheets::{ServiceAccountKey, SheetsClient};
use ritual_telegram::BotApi;
use tracing::{info, warn};

use crate::state::{AppState, AppStateInner, Sessions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ritual_bot=debug,ritual_db=info,ritual_sheets=info".into()),
        )
        .init();

    // Config
    let token = std::env::var("RITUAL_BOT_TOKEN").unwrap_or_default();
    if token.is_empty() {
        eprintln!("FATAL: RITUAL_BOT_TOKEN is unset.");
        eprintln!("       Create a bot with @BotFather and put its token in your .env file.");
        std::process::exit(1);
    }

    let db_path: PathBuf = std::env::var("RITUAL_DB_PATH")
        .unwrap_or_else(|_| "ritual.db".into())
        .into();
    let poll_timeout_secs: u64 = std::env::var("RITUAL_POLL_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(50);

    // Sheets mirroring is opt-in, but a broken key is a config error, not
    // something to limp past silently.
    let sheets = match std::env::var("RITUAL_SHEETS_KEY") {
        Ok(path) if !path.is_empty() => {
            let key = match ServiceAccountKey::from_file(Path::new(&path)) {
                Ok(key) => key,
                Err(e) => {
                    eprintln!("FATAL: RITUAL_SHEETS_KEY is set but unusable: {}", e);
                    eprintln!("       Fix the key file, or unset it to run without mirroring.");
                    std::process::exit(1);
                }
            };
            let client = SheetsClient::new(key)?;
            info!("Sheets mirroring enabled as {}", client.client_email());
            Some(client)
        }
        _ => {
            info!("Sheets mirroring disabled (RITUAL_SHEETS_KEY unset)");
            None
        }
    };

    let db = Database::open(&db_path)?;
    let api = BotApi::new(&token)?;

    let me = match api.get_me().await {
        Ok(me) => me,
        Err(e) => {
            eprintln!("FATAL: Telegram rejected the bot token: {}", e);
            std::process::exit(1);
        }
    };
    info!("Authorized as @{}", me.username.as_deref().unwrap_or("unknown"));

    let state: AppState = Arc::new(AppStateInner {
        db,
        api,
        sheets,
        sessions: Sessions::new(),
        poll_timeout_secs,
    });

    // Reminder loop runs beside the poll loop for the whole process life
    tokio::spawn(dispatch::run_reminder_loop(state.clone()));

    tokio::select! {
        _ = run_poll_loop(state) => {}
        _ = shutdown_signal() => {}
    }

    Ok(())
}

/// Long-poll getUpdates forever. The offset advances past every update in
/// a batch before handlers run, so an update is consumed at most once
/// even when its handler fails.
async fn run_poll_loop(state: AppState) {
    let mut offset: i64 = 0;

    loop {
        match state.api.get_updates(offset, state.poll_timeout_secs).await {
            Ok(updates) => {
                for update in updates {
                    offset = offset.max(update.update_id + 1);
                    tokio::spawn(handlers::handle_update(state.clone(), update));
                }
            }
            Err(e) => {
                warn!("getUpdates failed: {}", e);
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
