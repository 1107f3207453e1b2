pub mod telegram;
pub mod types;

use crate::error::Result;
use async_trait::async_trait;

/// Outbound text channel. One call, one message.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}
