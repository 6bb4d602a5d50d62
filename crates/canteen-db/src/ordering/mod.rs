//! # Ordering Services
//!
//! Every operation that touches more than one ledger table: placing an
//! order, cancelling it, staff status updates and manual walk-in orders.
//!
//! ## Transaction Boundary
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    One logical operation = one transaction              │
//! │                                                                         │
//! │  let mut tx = db.begin().await?;                                        │
//! │       │                                                                 │
//! │       ├── reads        (outlet, customer, products, stock, wallet...)   │
//! │       ├── pure rules   (canteen_core: quota, pricing, coupon, payment)  │
//! │       ├── guarded writes (stock, wallet, quota, coupon)                 │
//! │       │      any 0-row guard ──► Err(ConcurrentUpdate)                  │
//! │       ├── inserts      (order, items, ledger rows, history)             │
//! │       │                                                                 │
//! │       ├── Err(_) ──► `tx` dropped ──► ROLLBACK (nothing survives)       │
//! │       └── Ok     ──► tx.commit()                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//! - [`placement`] - Order commit, coupon preview, quota lookup
//! - [`cancellation`] - Customer and staff cancellation
//! - [`fulfilment`] - Staff delivery / partial delivery / partial cancel
//! - [`manual`] - Walk-in orders keyed in by staff
//! - [`queries`] - Order lists and single-order views
//! - `stock`, `settlement` - Shared deduction / restock / refund steps

pub mod cancellation;
pub mod fulfilment;
pub mod manual;
pub mod placement;
pub mod queries;
mod settlement;
mod stock;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqliteConnection;
use thiserror::Error;

use crate::error::DbError;
use crate::pool::Database;
use crate::repository::order::OrderItemWithProduct;
use crate::repository::{OrderRepository, OutletRepository};
use crate::tasks::BackgroundTasks;
use canteen_core::payment::PaymentVerifier;
use canteen_core::quota::business_day;
use canteen_core::{CoreError, Order, Outlet, Role, ValidationError};

pub use cancellation::CancelOutcome;
pub use fulfilment::{UpdateOrderInput, UpdateOutcome};
pub use manual::ManualOrderInput;
pub use placement::{CouponPreview, PlaceOrderInput, PlacedOrder};

/// Default business time zone: IST (UTC+05:30).
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 330;

// =============================================================================
// Errors
// =============================================================================

/// Failure of an ordering operation.
///
/// Either a rule said no, or the store failed. In both cases the
/// transaction has already been rolled back by the time the caller sees it.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<sqlx::Error> for OrderError {
    fn from(err: sqlx::Error) -> Self {
        OrderError::Db(err.into())
    }
}

impl From<ValidationError> for OrderError {
    fn from(err: ValidationError) -> Self {
        OrderError::Core(err.into())
    }
}

pub type OrderResult<T> = Result<T, OrderError>;

// =============================================================================
// Actors and Views
// =============================================================================

/// The staff member (or superadmin) performing an outlet operation.
#[derive(Debug, Clone, Copy)]
pub struct StaffActor {
    pub user_id: i64,
    pub role: Role,
    /// Outlet the staff member is assigned to. `None` means unassigned.
    pub outlet_id: Option<i64>,
}

impl StaffActor {
    /// Staff may only act on their own outlet; superadmins and unassigned
    /// staff may act on any.
    pub fn ensure_outlet(&self, outlet_id: i64) -> Result<(), CoreError> {
        match (self.role, self.outlet_id) {
            (Role::Superadmin, _) | (_, None) => Ok(()),
            (_, Some(assigned)) if assigned == outlet_id => Ok(()),
            _ => Err(CoreError::OutletForbidden { outlet_id }),
        }
    }
}

/// An order with its lines and outlet, ready for a response body.
#[derive(Debug, Clone)]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<OrderItemWithProduct>,
    pub outlet: Outlet,
}

// =============================================================================
// Service
// =============================================================================

/// Transactional ordering operations over the ledger store.
///
/// ## Construction
/// ```rust,ignore
/// let service = OrderingService::new(
///     db.clone(),
///     Arc::new(HmacSignatureVerifier::new(secret)),
///     DEFAULT_UTC_OFFSET_MINUTES,
///     BackgroundTasks::new(),
/// );
/// ```
#[derive(Clone)]
pub struct OrderingService {
    db: Database,
    verifier: Arc<dyn PaymentVerifier>,
    utc_offset_minutes: i32,
    tasks: BackgroundTasks,
}

impl std::fmt::Debug for OrderingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderingService")
            .field("utc_offset_minutes", &self.utc_offset_minutes)
            .finish_non_exhaustive()
    }
}

impl OrderingService {
    pub fn new(
        db: Database,
        verifier: Arc<dyn PaymentVerifier>,
        utc_offset_minutes: i32,
        tasks: BackgroundTasks,
    ) -> Self {
        OrderingService {
            db,
            verifier,
            utc_offset_minutes,
            tasks,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn verifier(&self) -> &dyn PaymentVerifier {
        self.verifier.as_ref()
    }

    pub fn tasks(&self) -> &BackgroundTasks {
        &self.tasks
    }

    /// Business day an instant falls on.
    pub fn business_day(&self, at: DateTime<Utc>) -> NaiveDate {
        business_day(at, self.utc_offset_minutes)
    }
}

// =============================================================================
// Shared Helpers
// =============================================================================

/// Loads lines and outlets for a batch of orders, preserving their order.
pub(crate) async fn load_details(conn: &mut SqliteConnection, orders: Vec<Order>) -> OrderResult<Vec<OrderDetails>> {
    let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();

    let mut items_by_order: HashMap<i64, Vec<OrderItemWithProduct>> = HashMap::new();
    for item in OrderRepository::new(conn).items_with_products(&ids).await? {
        items_by_order.entry(item.order_id).or_default().push(item);
    }

    let mut outlets: HashMap<i64, Outlet> = HashMap::new();
    let mut details = Vec::with_capacity(orders.len());

    for order in orders {
        let outlet = match outlets.get(&order.outlet_id) {
            Some(outlet) => outlet.clone(),
            None => {
                let outlet = OutletRepository::new(conn)
                    .get_by_id(order.outlet_id)
                    .await?
                    .ok_or(CoreError::OutletNotFound(order.outlet_id))?;
                outlets.insert(outlet.id, outlet.clone());
                outlet
            }
        };

        details.push(OrderDetails {
            items: items_by_order.remove(&order.id).unwrap_or_default(),
            order,
            outlet,
        });
    }

    Ok(details)
}

#[cfg(test)]
pub(crate) mod test_support;
