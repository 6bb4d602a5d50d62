//! # Wallet Repository
//!
//! Stored-value balances and the append-only wallet ledger.
//!
//! ## Ledger Rows
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  status     amount_paise   written by                                   │
//! │  ─────────  ────────────   ───────────────────────────────────────────  │
//! │  DEDUCT     -30000         WALLET order commit                          │
//! │  CREDIT     +30000         customer cancel of a WALLET order            │
//! │  RECHARGE   +n             top-up, staff cancel / partial cancel refund │
//! │                                                                         │
//! │  Rows are inserted once and never updated.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use canteen_core::{Money, PaymentMethod, Wallet, WalletTransaction, WalletTransactionStatus};

const WALLET_COLUMNS: &str = "id, customer_id, balance_paise, total_recharged_paise, \
     total_used_paise, last_recharged, last_order, created_at";

const TRANSACTION_COLUMNS: &str = "id, wallet_id, amount_paise, method, status, description, \
     razorpay_order_id, razorpay_payment_id, created_at";

/// A ledger row about to be appended.
#[derive(Debug, Clone)]
pub struct NewWalletTransaction<'a> {
    pub wallet_id: i64,
    /// Signed: negative for DEDUCT.
    pub amount: Money,
    pub method: PaymentMethod,
    pub status: WalletTransactionStatus,
    pub description: Option<&'a str>,
    pub razorpay_order_id: Option<&'a str>,
    pub razorpay_payment_id: Option<&'a str>,
}

/// Repository for wallets and wallet transactions.
pub struct WalletRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> WalletRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        WalletRepository { conn }
    }

    /// The customer's wallet, if one has been opened.
    pub async fn get_by_customer(&mut self, customer_id: i64) -> DbResult<Option<Wallet>> {
        let sql = format!("SELECT {WALLET_COLUMNS} FROM wallets WHERE customer_id = ?");
        let wallet = sqlx::query_as::<_, Wallet>(&sql)
            .bind(customer_id)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(wallet)
    }

    /// Opens a wallet with an initial balance counted as recharged.
    pub async fn create(&mut self, customer_id: i64, initial: Money) -> DbResult<Wallet> {
        let now = Utc::now();
        let last_recharged = initial.is_positive().then_some(now);
        let sql = format!(
            r#"
            INSERT INTO wallets (customer_id, balance_paise, total_recharged_paise, total_used_paise, last_recharged, created_at)
            VALUES (?, ?, ?, 0, ?, ?)
            RETURNING {WALLET_COLUMNS}
            "#
        );
        let wallet = sqlx::query_as::<_, Wallet>(&sql)
            .bind(customer_id)
            .bind(initial.paise())
            .bind(initial.paise())
            .bind(last_recharged)
            .bind(now)
            .fetch_one(&mut *self.conn)
            .await?;

        Ok(wallet)
    }

    /// Debits an order payment if the balance still covers it.
    ///
    /// Returns the wallet after the debit, or `None` when the guard
    /// `balance_paise >= amount` matched no row.
    pub async fn debit(&mut self, wallet_id: i64, amount: Money, at: DateTime<Utc>) -> DbResult<Option<Wallet>> {
        let sql = format!(
            r#"
            UPDATE wallets
            SET balance_paise = balance_paise - ?,
                total_used_paise = total_used_paise + ?,
                last_order = ?
            WHERE id = ? AND balance_paise >= ?
            RETURNING {WALLET_COLUMNS}
            "#
        );
        let wallet = sqlx::query_as::<_, Wallet>(&sql)
            .bind(amount.paise())
            .bind(amount.paise())
            .bind(at)
            .bind(wallet_id)
            .bind(amount.paise())
            .fetch_optional(&mut *self.conn)
            .await?;

        debug!(wallet_id, amount = %amount, applied = wallet.is_some(), "Wallet debit");
        Ok(wallet)
    }

    /// Adds a refund to the balance. Usage totals are left as they were.
    pub async fn credit(&mut self, wallet_id: i64, amount: Money) -> DbResult<Wallet> {
        let sql = format!(
            r#"
            UPDATE wallets
            SET balance_paise = balance_paise + ?
            WHERE id = ?
            RETURNING {WALLET_COLUMNS}
            "#
        );
        let wallet = sqlx::query_as::<_, Wallet>(&sql)
            .bind(amount.paise())
            .bind(wallet_id)
            .fetch_one(&mut *self.conn)
            .await?;

        debug!(wallet_id, amount = %amount, "Wallet credit");
        Ok(wallet)
    }

    /// Appends a ledger row.
    pub async fn insert_transaction(&mut self, txn: &NewWalletTransaction<'_>) -> DbResult<WalletTransaction> {
        let sql = format!(
            r#"
            INSERT INTO wallet_transactions
                (wallet_id, amount_paise, method, status, description, razorpay_order_id, razorpay_payment_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {TRANSACTION_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, WalletTransaction>(&sql)
            .bind(txn.wallet_id)
            .bind(txn.amount.paise())
            .bind(txn.method)
            .bind(txn.status)
            .bind(txn.description)
            .bind(txn.razorpay_order_id)
            .bind(txn.razorpay_payment_id)
            .bind(Utc::now())
            .fetch_one(&mut *self.conn)
            .await?;

        Ok(row)
    }

    /// Ledger rows of a wallet, oldest first.
    pub async fn transactions(&mut self, wallet_id: i64) -> DbResult<Vec<WalletTransaction>> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM wallet_transactions WHERE wallet_id = ? ORDER BY id"
        );
        let rows = sqlx::query_as::<_, WalletTransaction>(&sql)
            .bind(wallet_id)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(rows)
    }
}
