//! # canteen-db: Ledger Store and Ordering Transactions
//!
//! Everything that reads or writes the canteen database. SQLite via sqlx,
//! with each ordering operation running in exactly one transaction.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Canteen Data Flow                                │
//! │                                                                         │
//! │  HTTP handler (canteen-api)                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     canteen-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐   │   │
//! │  │   │  Ordering     │    │  Repositories │    │  Migrations  │   │   │
//! │  │   │  Service      │───►│  (one table   │    │  (embedded)  │   │   │
//! │  │   │  (one tx per  │    │   family each)│    │              │   │   │
//! │  │   │   operation)  │    │               │    │ 001_init.sql │   │   │
//! │  │   └───────┬───────┘    └───────┬───────┘    └──────────────┘   │   │
//! │  │           │ pure rules         │                                │   │
//! │  │           ▼                    ▼                                │   │
//! │  │     canteen-core         Database (pool.rs)                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Per-table queries over a borrowed connection
//! - [`ordering`] - Order placement, cancellation, staff updates, views
//! - [`feedback`] - Product ratings and their aggregates
//! - [`tasks`] - Fire-and-forget background jobs
//!
//! ## Usage
//!
//! ```rust,ignore
//! use canteen_db::{Database, DbConfig, OrderingService, BackgroundTasks};
//!
//! let db = Database::new(DbConfig::new("canteen.db")).await?;
//! let tasks = BackgroundTasks::new();
//! let ordering = OrderingService::new(db.clone(), verifier, 330, tasks.clone());
//!
//! let placed = ordering.place_order(user_id, input).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod feedback;
pub mod migrations;
pub mod ordering;
pub mod pool;
pub mod repository;
pub mod tasks;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use feedback::{FeedbackItem, FeedbackService};
pub use ordering::{
    CancelOutcome, CouponPreview, ManualOrderInput, OrderDetails, OrderError, OrderResult, OrderingService,
    PlaceOrderInput, PlacedOrder, StaffActor, UpdateOrderInput, UpdateOutcome, DEFAULT_UTC_OFFSET_MINUTES,
};
pub use pool::{Database, DbConfig};
pub use tasks::BackgroundTasks;
