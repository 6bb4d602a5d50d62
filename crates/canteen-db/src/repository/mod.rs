//! # Repository Module
//!
//! Table-level access for the canteen ledger store.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories over a borrowed connection              │
//! │                                                                         │
//! │  OrderingService                                                        │
//! │       │                                                                 │
//! │       │  let mut tx = db.begin().await?;                                │
//! │       │  InventoryRepository::new(&mut tx).deduct(p, 3)                 │
//! │       │  WalletRepository::new(&mut tx).debit(w, amount, now)           │
//! │       │  tx.commit().await?;                                            │
//! │       ▼                                                                 │
//! │  XxxRepository<'c> { conn: &'c mut SqliteConnection }                   │
//! │       │                                                                 │
//! │       │  SQL Query (runtime sqlx::query / query_as)                     │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! │                                                                         │
//! │  A repository borrows whatever connection it is given: a transaction   │
//! │  for ordering work, a pooled connection for plain reads. SQL stays in  │
//! │  one place either way.                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarded Updates
//! Every read-then-write on a shared row finishes with a conditional UPDATE
//! whose WHERE clause re-states what was read. Zero affected rows means the
//! row moved underneath us and the caller aborts the transaction.
//!
//! | Row            | Guard                                      |
//! |----------------|--------------------------------------------|
//! | inventory      | `quantity >= ?`                            |
//! | wallets        | `balance_paise >= ?`                       |
//! | user_free_quotas | `quantity_used = <value read>`           |
//! | coupons        | `used_count < usage_limit`                 |
//!
//! ## Available Repositories
//!
//! - [`UserRepository`] - Users and customer profiles
//! - [`OutletRepository`] - Outlets
//! - [`ProductRepository`] - Products and rating aggregates
//! - [`InventoryRepository`] - Stock levels and stock history
//! - [`WalletRepository`] - Wallet balances and ledger rows
//! - [`CouponRepository`] - Coupons and coupon usages
//! - [`QuotaRepository`] - Daily free quota rows
//! - [`OrderRepository`] - Orders and order items
//! - [`CartRepository`] - Carts consumed by order placement
//! - [`FeedbackRepository`] - Product feedback

pub mod cart;
pub mod coupon;
pub mod feedback;
pub mod inventory;
pub mod order;
pub mod outlet;
pub mod product;
pub mod quota;
pub mod user;
pub mod wallet;

pub use cart::CartRepository;
pub use coupon::CouponRepository;
pub use feedback::FeedbackRepository;
pub use inventory::InventoryRepository;
pub use order::OrderRepository;
pub use outlet::OutletRepository;
pub use product::ProductRepository;
pub use quota::QuotaRepository;
pub use user::UserRepository;
pub use wallet::WalletRepository;

/// Builds `?, ?, ?` for an `IN (...)` clause of `n` binds.
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}
