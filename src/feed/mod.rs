pub mod http;

use crate::error::Result;
use async_trait::async_trait;

/// Source of page markup for the poll loop.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}
