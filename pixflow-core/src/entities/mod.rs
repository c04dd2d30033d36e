pub mod debug_log;
pub mod deposit_record;
pub mod payment_transaction;
pub mod user_balance;

use pixflow_sdk::objects::{Direction as SdkDirection, TransactionStatus as SdkTransactionStatus};

/// Transaction status for database operations.
///
/// This is the sqlx::Type version. For API/DTO use, see `pixflow_sdk::objects::TransactionStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "transaction_status")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    /// Completed and failed transactions never change again.
    pub fn is_terminal(self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<TransactionStatus> for SdkTransactionStatus {
    fn from(value: TransactionStatus) -> Self {
        match value {
            TransactionStatus::Pending => SdkTransactionStatus::Pending,
            TransactionStatus::Completed => SdkTransactionStatus::Completed,
            TransactionStatus::Failed => SdkTransactionStatus::Failed,
        }
    }
}

impl From<SdkTransactionStatus> for TransactionStatus {
    fn from(value: SdkTransactionStatus) -> Self {
        match value {
            SdkTransactionStatus::Pending => TransactionStatus::Pending,
            SdkTransactionStatus::Completed => TransactionStatus::Completed,
            SdkTransactionStatus::Failed => TransactionStatus::Failed,
        }
    }
}

/// Payment direction for database operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "payment_direction")]
pub enum Direction {
    Deposit,
    Withdrawal,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Deposit => "deposit",
            Direction::Withdrawal => "withdrawal",
        }
    }
}

impl From<Direction> for SdkDirection {
    fn from(value: Direction) -> Self {
        match value {
            Direction::Deposit => SdkDirection::Deposit,
            Direction::Withdrawal => SdkDirection::Withdrawal,
        }
    }
}

impl From<SdkDirection> for Direction {
    fn from(value: SdkDirection) -> Self {
        match value {
            SdkDirection::Deposit => Direction::Deposit,
            SdkDirection::Withdrawal => Direction::Withdrawal,
        }
    }
}
