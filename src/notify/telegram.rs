use super::types::*;
use super::Notifier;
use crate::config::ChatId;
use crate::error::{MonitorError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};

pub struct TelegramNotifier {
    client: Client,
    chat_id: ChatId,
    endpoint: String,
}

impl TelegramNotifier {
    pub fn new(api_base: &str, token: &str, chat_id: ChatId) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(1)
            .build()
            .map_err(|e| MonitorError::config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            chat_id,
            endpoint: send_message_url(api_base, token),
        })
    }
}

/// Bot API limit on `sendMessage` text length.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Cut `text` to the Bot API limit, marking the cut with an ellipsis.
fn truncate_message(text: &str) -> std::borrow::Cow<'_, str> {
    if text.chars().count() <= MAX_MESSAGE_CHARS {
        return std::borrow::Cow::Borrowed(text);
    }
    let mut cut: String = text.chars().take(MAX_MESSAGE_CHARS - 1).collect();
    cut.push('…');
    std::borrow::Cow::Owned(cut)
}

fn send_message_url(api_base: &str, token: &str) -> String {
    format!("{}/bot{}/sendMessage", api_base.trim_end_matches('/'), token)
}

/// Map a Bot API reply onto success or a `Notify` error.
fn check_response(status: StatusCode, body: &str) -> Result<()> {
    match serde_json::from_str::<ApiResponse>(body) {
        Ok(parsed) if parsed.ok && status.is_success() => Ok(()),
        Ok(parsed) => Err(MonitorError::notify(format!(
            "sendMessage failed ({}): {}",
            parsed.error_code.map_or_else(|| status.to_string(), |c| c.to_string()),
            parsed.description.unwrap_or_else(|| "no description".to_string())
        ))),
        Err(_) if status.is_success() => Err(MonitorError::notify(format!(
            "unexpected sendMessage response: {}",
            body
        ))),
        Err(_) => Err(MonitorError::notify(format!(
            "sendMessage failed ({}): {}",
            status, body
        ))),
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        let text = truncate_message(text);
        if let std::borrow::Cow::Owned(_) = text {
            tracing::warn!(limit = MAX_MESSAGE_CHARS, "message truncated");
        }
        let request = SendMessageRequest {
            chat_id: &self.chat_id,
            text: &text,
            disable_web_page_preview: true,
        };
        // reqwest errors can embed the URL, which carries the bot token.
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| MonitorError::notify(format!("request failed: {}", e.without_url())))?;
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        check_response(status, &body)?;
        tracing::debug!(chat_id = %self.chat_id, "message delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_message_url() {
        assert_eq!(
            send_message_url("https://api.telegram.org/", "123:abc"),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }

    #[test]
    fn test_request_serializes_chat_id_untagged() {
        let numeric = ChatId::Id(-1001);
        let body = serde_json::to_value(SendMessageRequest {
            chat_id: &numeric,
            text: "hi",
            disable_web_page_preview: true,
        })
        .unwrap();
        assert_eq!(body["chat_id"], -1001);
        assert_eq!(body["text"], "hi");
        assert_eq!(body["disable_web_page_preview"], true);

        let named = ChatId::Username("@chan".into());
        let body = serde_json::to_value(SendMessageRequest {
            chat_id: &named,
            text: "hi",
            disable_web_page_preview: false,
        })
        .unwrap();
        assert_eq!(body["chat_id"], "@chan");
        assert!(body.get("disable_web_page_preview").is_none());
    }

    #[test]
    fn test_short_message_untouched() {
        let text = "Selector\n> #a\ncontains\n> hello";
        assert!(matches!(truncate_message(text), std::borrow::Cow::Borrowed(t) if t == text));
    }

    #[test]
    fn test_long_message_capped_at_limit() {
        let long = "é".repeat(MAX_MESSAGE_CHARS + 100);
        let cut = truncate_message(&long);
        assert_eq!(cut.chars().count(), MAX_MESSAGE_CHARS);
        assert!(cut.ends_with('…'));

        let exact = "x".repeat(MAX_MESSAGE_CHARS);
        assert_eq!(truncate_message(&exact), exact.as_str());
    }

    #[test]
    fn test_ok_response_accepted() {
        let body = r#"{"ok":true,"result":{"message_id":7}}"#;
        assert!(check_response(StatusCode::OK, body).is_ok());
    }

    #[test]
    fn test_api_error_carries_description() {
        let body = r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#;
        let err = check_response(StatusCode::BAD_REQUEST, body).unwrap_err();
        assert!(matches!(err, MonitorError::Notify { .. }));
        assert!(err.to_string().contains("chat not found"), "{}", err);
        assert!(err.to_string().contains("400"), "{}", err);
    }

    #[test]
    fn test_non_json_error_body() {
        let err = check_response(StatusCode::BAD_GATEWAY, "<html>502</html>").unwrap_err();
        assert!(err.to_string().contains("502"), "{}", err);
    }

    #[test]
    fn test_ok_false_with_success_status_is_error() {
        let body = r#"{"ok":false}"#;
        assert!(check_response(StatusCode::OK, body).is_err());
    }
}
