//! # canteen-core: Pure Ordering Logic
//!
//! This crate is the **heart** of the canteen backend. It contains the
//! order-placement pricing and settlement rules as pure functions with zero
//! I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Canteen Backend Architecture                       │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Customer / Staff mobile apps                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ REST (JSON)                            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    canteen-api (axum)                           │   │
//! │  │    customer-order, customer-cancel-order, update-order, ...     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 canteen-db (ordering services)                  │   │
//! │  │        one SQLite transaction per logical operation             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ calls pure rules                       │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ canteen-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  quota  │ │ pricing │ │ coupon  │ │ payment │ │inventory│  │   │
//! │  │   │ 5 free  │ │ buckets │ │ checks  │ │  HMAC   │ │ validate│  │   │
//! │  │   │ per day │ │ totals  │ │discount │ │signature│ │  -all   │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • NO CLOCK • PURE FUNCTIONS │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Order, Product, Wallet, Coupon, etc.)
//! - [`money`] - Money type with integer paise arithmetic
//! - [`error`] - Domain error types with stable machine codes
//! - [`validation`] - Request validation
//! - [`quota`] - Daily free-unit allocation
//! - [`pricing`] - Free / paid-company / regular buckets and totals
//! - [`coupon`] - Coupon eligibility and discount
//! - [`payment`] - Gateway signature verification
//! - [`inventory`] - Validate-all stock planning
//! - [`order`] - Order status machine and refund math
//!
//! ## Example Usage
//!
//! ```rust
//! use canteen_core::money::Money;
//! use canteen_core::quota::allocate_free;
//!
//! // Customer already took 3 free units today and asks for 4 more.
//! let allocation = allocate_free(3, &[4]);
//! assert_eq!(allocation.free_per_line, vec![2]);
//! assert_eq!(allocation.total_free, 2);
//!
//! // The 2 units over the cap are charged at the product price.
//! let charged = Money::from_paise(5000).multiply_quantity(2);
//! assert_eq!(charged.paise(), 10000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod coupon;
pub mod error;
pub mod inventory;
pub mod money;
pub mod order;
pub mod payment;
pub mod pricing;
pub mod quota;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ErrorKind, StockIssue, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Free company-paid units a customer may take per business day.
pub const DAILY_FREE_LIMIT: i64 = 5;

/// Maximum distinct lines allowed in a single order.
pub const MAX_ORDER_LINES: usize = 100;

/// Maximum quantity of a single line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;
