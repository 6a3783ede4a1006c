//! Change notification via a chat webhook.
//!
//! Delivery is fire-and-forget: the caller logs failures and moves on,
//! a broken webhook never affects comparison results or exit status.

use std::time::Duration;

use anyhow::Context;
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::json;
use tracing::info;

use crate::error::Error;
use crate::models::ChangeEvent;

pub struct WebhookNotifier {
    client: Client,
    webhook_url: String,
}

impl WebhookNotifier {
    pub fn new(webhook_url: String) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            webhook_url,
        })
    }

    /// One multi-line text summary for the whole run.
    pub fn format_message(events: &[ChangeEvent]) -> String {
        let mut lines = vec![format!("Price changes detected ({}):", events.len())];
        for event in events {
            lines.push(format!(
                "- {} / {}: {} moved {} -> {}",
                event.unit_name,
                event.room_type,
                event.property_name,
                format_price(event.old_price),
                format_price(event.new_price),
            ));
        }
        lines.join("\n")
    }

    /// Post the change summary. No events means no request at all.
    pub async fn notify(&self, events: &[ChangeEvent]) -> Result<(), Error> {
        if events.is_empty() {
            return Ok(());
        }

        let message = Self::format_message(events);
        let resp = self
            .client
            .post(&self.webhook_url)
            .json(&json!({ "text": message }))
            .send()
            .await
            .map_err(|e| Error::Notify(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Error::Notify(format!(
                "webhook returned status {}",
                resp.status()
            )));
        }

        info!("posted {} change events to webhook", events.len());
        Ok(())
    }
}

fn format_price(price: Option<Decimal>) -> String {
    match price {
        Some(value) => format!("{value}"),
        None => "unavailable".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RoomType;
    use rust_decimal_macros::dec;

    fn event(
        property: &str,
        old: Option<Decimal>,
        new: Option<Decimal>,
    ) -> ChangeEvent {
        ChangeEvent {
            unit_name: "Villa Mare".into(),
            room_type: RoomType::Double,
            property_name: property.into(),
            old_price: old,
            new_price: new,
        }
    }

    #[test]
    fn message_has_one_line_per_event_plus_header() {
        let events = vec![
            event("Hotel Adria", Some(dec!(100)), Some(dec!(105))),
            event("Hotel Istra", Some(dec!(90)), None),
        ];
        let message = WebhookNotifier::format_message(&events);
        let lines: Vec<_> = message.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("(2)"));
        assert!(lines[1].contains("Hotel Adria moved 100 -> 105"));
        assert!(lines[2].contains("Hotel Istra moved 90 -> unavailable"));
    }

    #[test]
    fn unresolved_prices_render_as_unavailable_never_zero() {
        let message =
            WebhookNotifier::format_message(&[event("Hotel Adria", None, Some(dec!(80)))]);
        assert!(message.contains("unavailable -> 80"));
        assert!(!message.contains(" 0 "));
    }
}
