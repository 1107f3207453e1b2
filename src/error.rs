use thiserror::Error;

pub type Result<T> = std::result::Result<T, MonitorError>;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("invalid configuration: {details}")]
    Config { details: String },

    #[error("failed to fetch {url}: {details}")]
    Fetch { url: String, details: String },

    /// Selector matched nothing in the fetched page. Reported, never fatal.
    #[error("selector `{selector}` matched no elements")]
    Selector { selector: String },

    #[error("notification failed: {details}")]
    Notify { details: String },
}

impl MonitorError {
    pub fn config(details: impl Into<String>) -> Self {
        Self::Config { details: details.into() }
    }

    pub fn notify(details: impl Into<String>) -> Self {
        Self::Notify { details: details.into() }
    }
}
