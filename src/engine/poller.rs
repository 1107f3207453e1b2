use super::evaluator::{evaluate_html, Evaluation, MatchResult};
use crate::config::Config;
use crate::error::Result;
use crate::feed::PageSource;
use crate::notify::Notifier;
use tokio_util::sync::CancellationToken;

/// Sent on an iteration with no matches when `debug` is on.
pub const DEBUG_MESSAGE: &str = "Nothing happened, but I'm still checking";

pub fn started_message(url: &str) -> String {
    format!("Started monitoring\n{}", url)
}

pub fn stopped_message(url: &str) -> String {
    format!("Stopped monitoring {}", url)
}

pub fn match_message(result: &MatchResult, url: &str) -> String {
    format!(
        "Selector\n> {}\n{}\n> {}\non url\n> {}",
        result.selector, result.action, result.item, url
    )
}

/// Fetch, evaluate, notify, sleep; until the cancellation token fires.
pub struct Poller {
    config: Config,
    source: Box<dyn PageSource>,
    notifier: Box<dyn Notifier>,
}

impl Poller {
    /// `notifier` must already be configured for its destination.
    pub fn new(config: Config, source: Box<dyn PageSource>, notifier: Box<dyn Notifier>) -> Self {
        Self { config, source, notifier }
    }

    /// One fetch-evaluate-notify cycle. Missing selectors are logged and skipped.
    pub async fn poll_once(&self) -> Result<Evaluation> {
        let url = self.config.target_url.as_str();
        let body = self.source.fetch(url).await?;
        let evaluation = evaluate_html(&body, &self.config.rules);

        for err in evaluation.missing_errors() {
            tracing::warn!(url, error = %err, "rule skipped");
        }

        if !evaluation.matches.is_empty() {
            for result in &evaluation.matches {
                let message = match_message(result, url);
                tracing::info!(
                    selector = %result.selector,
                    action = %result.action,
                    item = %result.item,
                    "match detected"
                );
                self.notifier.send(&message).await?;
            }
        } else if self.config.debug {
            tracing::debug!("no matches, sending heartbeat");
            self.notifier.send(DEBUG_MESSAGE).await?;
        }

        Ok(evaluation)
    }

    /// Returns `Ok(())` only after cancellation and the shutdown notice.
    /// Fetch and delivery failures end the loop with the error.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let url = self.config.target_url.as_str();

        if self.config.notify_on_start {
            tracing::info!("sending startup notification");
            self.notifier.send(&started_message(url)).await?;
        }

        tracing::info!(
            url,
            rules = self.config.rules.len(),
            interval_s = self.config.poll_interval.as_secs_f64(),
            "start checking"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                res = self.poll_once() => { res?; }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        self.shutdown().await;
        Ok(())
    }

    async fn shutdown(&self) {
        let url = self.config.target_url.as_str();
        if let Err(e) = self.notifier.send(&stopped_message(url)).await {
            tracing::warn!(error = %e, "shutdown notification not delivered");
        }
        tracing::info!("shutting down");
    }
}
