//! Inbound gateway webhook body and the receiver's acknowledgement.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use super::Direction;

/// Webhook body posted by the gateway on a payment state change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayWebhook {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub value: Option<Decimal>,
    #[serde(default)]
    pub person: Option<WebhookPerson>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// Payer/payee identity attached to a webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPerson {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub cpf: Option<String>,
}

impl GatewayWebhook {
    /// Direction implied by the webhook `type`, when recognizable.
    pub fn direction_hint(&self) -> Option<Direction> {
        let kind = self.kind.as_deref()?.trim().to_lowercase();
        match kind.as_str() {
            "deposit" | "deposito" | "depósito" | "pix_in" | "cash_in" | "cashin" => {
                Some(Direction::Deposit)
            }
            "withdrawal" | "withdraw" | "saque" | "pix_out" | "cash_out" | "cashout" => {
                Some(Direction::Withdrawal)
            }
            _ => None,
        }
    }
}

/// Body returned by the webhook receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookAck {
    pub accepted: bool,
    pub outcome: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Int(i64),
}

impl RawId {
    fn into_id<E: serde::de::Error>(self) -> Result<String, E> {
        match self {
            RawId::Text(s) if s.trim().is_empty() => Err(E::custom("empty id")),
            RawId::Text(s) => Ok(s),
            RawId::Int(n) => Ok(n.to_string()),
        }
    }
}

/// Gateway ids arrive as strings or as integers.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer)?.into_id()
}

pub(crate) fn optional_string_or_number<'de, D>(
    deserializer: D,
) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<RawId>::deserialize(deserializer)?
        .map(RawId::into_id)
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_full_webhook() {
        let hook: GatewayWebhook = serde_json::from_str(
            r#"{
                "id": "dep_123",
                "status": "paid",
                "value": 5.85,
                "person": {"name": "Maria Silva", "cpf": "123.456.789-01"},
                "type": "deposit"
            }"#,
        )
        .unwrap();
        assert_eq!(hook.id, "dep_123");
        assert_eq!(hook.value, Some(Decimal::from_str("5.85").unwrap()));
        assert_eq!(hook.direction_hint(), Some(Direction::Deposit));
        assert_eq!(
            hook.person.and_then(|p| p.name).as_deref(),
            Some("Maria Silva")
        );
    }

    #[test]
    fn numeric_id_and_string_value() {
        let hook: GatewayWebhook =
            serde_json::from_str(r#"{"id": 42, "status": "REALIZADO", "value": "10.00", "type": "SAQUE"}"#)
                .unwrap();
        assert_eq!(hook.id, "42");
        assert_eq!(hook.value, Some(Decimal::from_str("10.00").unwrap()));
        assert_eq!(hook.direction_hint(), Some(Direction::Withdrawal));
    }

    #[test]
    fn missing_required_fields_fail() {
        assert!(serde_json::from_str::<GatewayWebhook>(r#"{"status":"paid"}"#).is_err());
        assert!(serde_json::from_str::<GatewayWebhook>(r#"{"id":"dep_1"}"#).is_err());
        assert!(serde_json::from_str::<GatewayWebhook>(r#"{"id":"  ","status":"paid"}"#).is_err());
    }
}
