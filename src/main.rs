use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use web_monitor::config::Config;
use web_monitor::engine::Poller;
use web_monitor::feed::http::HttpPageSource;
use web_monitor::notify::telegram::TelegramNotifier;

#[derive(Parser)]
#[command(name = "web-monitor", version, about = "Poll a web page and send Telegram alerts when CSS checks match")]
struct Cli {
    /// TOML config file, or `-` to read it from stdin
    config_file: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("web_monitor=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Saved token from .env (real env vars take precedence). Done before the
    // runtime starts so no other thread is reading the environment.
    Config::load_env_file();

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")
        .and_then(|runtime| runtime.block_on(run(cli)));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    tracing::info!(source = %cli.config_file, "loading config file");
    let config = Config::load_from(&cli.config_file).context("failed to load config")?;
    let token = Config::bot_token()?;

    tracing::info!(chat_id = %config.chat_id, "configuring telegram notifier");
    let notifier = TelegramNotifier::new(&config.telegram_api_base, &token, config.chat_id.clone())?;
    let source = HttpPageSource::new(&config)?;

    let cancel = CancellationToken::new();
    spawn_signal_listener(cancel.clone());

    Poller::new(config, Box::new(source), Box::new(notifier))
        .run(cancel)
        .await
        .context("monitoring stopped")?;
    Ok(())
}

/// First signal cancels the poller; a second one exits without waiting.
fn spawn_signal_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("received shutdown signal");
        cancel.cancel();

        wait_for_signal().await;
        tracing::warn!("second signal, exiting immediately");
        std::process::exit(130);
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            let ctrl_c_failed = tokio::select! {
                res = tokio::signal::ctrl_c() => res.is_err(),
                _ = term.recv() => false,
            };
            if ctrl_c_failed {
                tracing::warn!("ctrl-c handler unavailable");
                term.recv().await;
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable");
            ctrl_c_or_pending().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    ctrl_c_or_pending().await;
}

async fn ctrl_c_or_pending() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl-c handler unavailable");
        std::future::pending::<()>().await;
    }
}
