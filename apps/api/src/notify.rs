//! # New-Order Alerts
//!
//! Posts a short HTML message to a chat bot when an order is saved.
//!
//! Alerts are fire-and-forget: they run on a spawned task after the order
//! is committed, and a failed send is logged at `warn` without touching
//! the response.

use serde_json::{json, Value};
use tracing::{debug, warn};

use clinic_core::coerce;
use clinic_core::Money;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Chat request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Chat API returned {status}")]
    Rejected { status: u16 },
}

/// What a new-order alert shows.
#[derive(Debug, Clone)]
pub struct NewOrderAlert<'a> {
    pub customer_name: &'a str,
    pub items: &'a Value,
    pub total: Money,
    pub staff_name: Option<&'a str>,
}

/// Escapes text for the chat API's HTML parse mode.
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Renders the alert text.
pub fn format_new_order_message(alert: &NewOrderAlert<'_>) -> String {
    let lines: Vec<String> = coerce::order_lines(alert.items)
        .iter()
        .map(|line| {
            format!(
                "- {} ({}฿)",
                escape_html(line.name.as_deref().unwrap_or("-")),
                line.price
            )
        })
        .collect();

    format!(
        "🚨 <b>New Order!</b>\n👤 {}\n🛍️\n{}\n💰 {} THB\n👩‍💼 {}",
        escape_html(alert.customer_name),
        lines.join("\n"),
        alert.total,
        escape_html(alert.staff_name.unwrap_or("-")),
    )
}

/// Chat bot client.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
}

impl TelegramNotifier {
    pub fn new(client: reqwest::Client, api_base: impl Into<String>) -> Self {
        TelegramNotifier {
            client,
            api_base: api_base.into(),
        }
    }

    /// Sends one message and waits for the result.
    pub async fn send_message(&self, token: &str, chat_id: &str, text: &str) -> Result<(), NotifyError> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, token);
        let response = self
            .client
            .post(url)
            .json(&json!({ "chat_id": chat_id, "text": text, "parse_mode": "HTML" }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifyError::Rejected {
                status: response.status().as_u16(),
            });
        }

        debug!(chat_id, "Chat alert sent");
        Ok(())
    }

    /// Sends on a background task; failures are only logged.
    pub fn send_in_background(&self, token: String, chat_id: String, text: String) {
        let notifier = self.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.send_message(&token, &chat_id, &text).await {
                warn!(error = %e, "New-order alert failed");
            }
        });
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[test]
    fn test_message_format() {
        let items = json!([
            { "name": "Laser <Face>", "price": 1500, "total": 1500 },
            { "name": "Serum & Mask", "price": "250.5" },
            { "price": "oops" }
        ]);
        let text = format_new_order_message(&NewOrderAlert {
            customer_name: "Malee Suk",
            items: &items,
            total: Money::from_cents(175050),
            staff_name: Some("Aom"),
        });

        assert!(text.starts_with("🚨 <b>New Order!</b>\n👤 Malee Suk\n"));
        assert!(text.contains("- Laser &lt;Face&gt; (1,500.00฿)"));
        assert!(text.contains("- Serum &amp; Mask (250.50฿)"));
        assert!(text.contains("- - (0.00฿)"));
        assert!(text.contains("💰 1,750.50 THB"));
        assert!(text.ends_with("👩‍💼 Aom"));
    }

    type Captured = Arc<Mutex<Vec<(String, Value)>>>;

    async fn capture(
        State(captured): State<Captured>,
        Path(bot): Path<String>,
        Json(body): Json<Value>,
    ) -> StatusCode {
        captured.lock().await.push((bot, body));
        StatusCode::OK
    }

    async fn spawn_chat_api(status_ok: bool) -> (String, Captured) {
        let captured: Captured = Arc::default();
        let app = if status_ok {
            Router::new()
                .route("/{bot}/sendMessage", post(capture))
                .with_state(captured.clone())
        } else {
            Router::new().route(
                "/{bot}/sendMessage",
                post(|| async { StatusCode::UNAUTHORIZED }),
            )
        };
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), captured)
    }

    #[tokio::test]
    async fn test_send_message_posts_html() {
        let (base, captured) = spawn_chat_api(true).await;
        let notifier = TelegramNotifier::new(reqwest::Client::new(), base);

        notifier.send_message("123:abc", "-100", "<b>hi</b>").await.unwrap();

        let captured = captured.lock().await;
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].0, "bot123:abc");
        assert_eq!(captured[0].1["chat_id"], "-100");
        assert_eq!(captured[0].1["parse_mode"], "HTML");
    }

    #[tokio::test]
    async fn test_send_message_reports_rejection() {
        let (base, _) = spawn_chat_api(false).await;
        let notifier = TelegramNotifier::new(reqwest::Client::new(), base);

        let err = notifier.send_message("bad", "-100", "hi").await.unwrap_err();
        assert!(matches!(err, NotifyError::Rejected { status: 401 }));
    }
}
