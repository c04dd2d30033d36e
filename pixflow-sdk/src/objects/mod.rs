pub mod admin;
pub mod gateway;
pub mod webhook;

use serde::{Deserialize, Serialize};

pub use gateway::{GatewayTransactionStatus, StatusPayload, TokenRequest, TokenResponse};
pub use webhook::{GatewayWebhook, WebhookAck, WebhookPerson};

/// Transaction status for API responses.
///
/// This is the API/DTO version without sqlx::Type.
/// For database operations, use the version in `pixflow-core::entities`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "pending"),
            TransactionStatus::Completed => write!(f, "completed"),
            TransactionStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Direction of a gateway payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Deposit,
    Withdrawal,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Deposit => write!(f, "deposit"),
            Direction::Withdrawal => write!(f, "withdrawal"),
        }
    }
}

/// Mask a CPF so only its last four digits remain readable.
///
/// `"123.456.789-01"` becomes `"***.***.*89-01"`. Inputs with fewer than
/// four digits are fully masked.
pub fn mask_cpf(cpf: &str) -> String {
    let digits: Vec<char> = cpf.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < 4 {
        return "***".to_string();
    }
    let tail = &digits[digits.len() - 4..];
    format!("***.***.*{}{}-{}{}", tail[0], tail[1], tail[2], tail[3])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_formatted_and_bare_cpf() {
        assert_eq!(mask_cpf("123.456.789-01"), "***.***.*89-01");
        assert_eq!(mask_cpf("12345678901"), "***.***.*89-01");
        assert_eq!(mask_cpf("12"), "***");
    }

    #[test]
    fn status_wire_names() {
        assert_eq!(
            serde_json::to_string(&TransactionStatus::Completed).unwrap(),
            "\"completed\""
        );
        let d: Direction = serde_json::from_str("\"withdrawal\"").unwrap();
        assert_eq!(d, Direction::Withdrawal);
    }
}
