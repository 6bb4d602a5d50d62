//! Wallet debit and refund steps.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::{info, warn};

use super::OrderResult;
use crate::repository::wallet::NewWalletTransaction;
use crate::repository::WalletRepository;
use canteen_core::{
    CoreError, Money, PaymentMethod, Wallet, WalletTransaction, WalletTransactionStatus,
};

/// Debits a WALLET order and appends the DEDUCT ledger row.
///
/// The balance was checked when the wallet was read; a guard miss here
/// means another request spent the money in between.
pub(crate) async fn debit_for_order(
    conn: &mut SqliteConnection,
    wallet: &Wallet,
    amount: Money,
    order_number: &str,
) -> OrderResult<WalletTransaction> {
    let mut wallets = WalletRepository::new(conn);

    let updated = wallets
        .debit(wallet.id, amount, Utc::now())
        .await?
        .ok_or(CoreError::ConcurrentUpdate { entity: "wallet" })?;

    let description = format!("Payment for order {order_number}");
    let txn = wallets
        .insert_transaction(&NewWalletTransaction {
            wallet_id: wallet.id,
            amount: amount.negate(),
            method: PaymentMethod::Wallet,
            status: WalletTransactionStatus::Deduct,
            description: Some(&description),
            razorpay_order_id: None,
            razorpay_payment_id: None,
        })
        .await?;

    info!(wallet_id = wallet.id, amount = %amount, balance = %updated.balance(), "Wallet debited");
    Ok(txn)
}

/// How a refund is booked.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Refund<'a> {
    pub customer_id: i64,
    pub amount: Money,
    pub method: PaymentMethod,
    pub status: WalletTransactionStatus,
    pub description: &'a str,
    /// Fail with `WalletNotFound` instead of skipping when the customer
    /// has no wallet.
    pub wallet_required: bool,
}

/// Credits a refund to the customer's wallet and appends its ledger row.
///
/// Returns `None` when nothing was booked: a zero amount, or a missing
/// wallet that was not required.
pub(crate) async fn refund(conn: &mut SqliteConnection, refund: Refund<'_>) -> OrderResult<Option<WalletTransaction>> {
    let mut wallets = WalletRepository::new(conn);

    let Some(wallet) = wallets.get_by_customer(refund.customer_id).await? else {
        if refund.wallet_required {
            return Err(CoreError::WalletNotFound.into());
        }
        warn!(customer_id = refund.customer_id, "No wallet to refund into");
        return Ok(None);
    };

    if !refund.amount.is_positive() {
        return Ok(None);
    }

    let updated = wallets.credit(wallet.id, refund.amount).await?;
    let txn = wallets
        .insert_transaction(&NewWalletTransaction {
            wallet_id: wallet.id,
            amount: refund.amount,
            method: refund.method,
            status: refund.status,
            description: Some(refund.description),
            razorpay_order_id: None,
            razorpay_payment_id: None,
        })
        .await?;

    info!(
        wallet_id = wallet.id,
        amount = %refund.amount,
        balance = %updated.balance(),
        "Refund credited to wallet"
    );
    Ok(Some(txn))
}
