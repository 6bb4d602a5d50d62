//! # Error Types
//!
//! Domain-specific error types for canteen-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  canteen-core errors (this file)                                        │
//! │  ├── CoreError        - Business-rule violations, each with a code     │
//! │  └── ValidationError  - Malformed request fields                       │
//! │                                                                         │
//! │  canteen-db errors (separate crate)                                     │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── OrderError       - CoreError | DbError (aborts the transaction)   │
//! │                                                                         │
//! │  canteen-api errors (in app)                                            │
//! │  └── ApiError         - What the client sees {code, message}           │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → OrderError → ApiError → Client    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Machine Codes
//! Every [`CoreError`] has a stable SCREAMING_SNAKE code returned by
//! [`CoreError::code`] and an [`ErrorKind`] that the HTTP layer maps to a
//! status. The `Display` text is the human message sent to the client.

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Error Kind
// =============================================================================

/// Coarse classification of a [`CoreError`], used for status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing request fields.
    Validation,
    /// Outlet, customer, order, product or wallet absent.
    NotFound,
    /// Caller is authenticated but acting outside their outlet.
    Forbidden,
    /// Coupon, stock, balance or status-transition rule broken.
    BusinessRule,
    /// A guarded update lost a race.
    Conflict,
    /// Gateway details missing or signature mismatch.
    Payment,
}

// =============================================================================
// Stock Issue
// =============================================================================

/// One line that failed inventory validation.
///
/// Collected for every line before any stock is touched so the client sees
/// the full list in one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockIssue {
    /// No inventory row exists for the product.
    NotInInventory { product_id: i64 },
    /// Stock is lower than the requested quantity.
    Insufficient {
        product_id: i64,
        available: i64,
        requested: i64,
    },
}

impl StockIssue {
    pub fn code(&self) -> &'static str {
        match self {
            StockIssue::NotInInventory { .. } => "PRODUCT_NOT_IN_INVENTORY",
            StockIssue::Insufficient { .. } => "INSUFFICIENT_STOCK",
        }
    }
}

impl std::fmt::Display for StockIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StockIssue::NotInInventory { product_id } => {
                write!(f, "Product {} not found in inventory", product_id)
            }
            StockIssue::Insufficient {
                product_id,
                available,
                requested,
            } => write!(
                f,
                "Insufficient stock for product {}. Available: {}, Requested: {}",
                product_id, available, requested
            ),
        }
    }
}

fn join_issues(issues: &[StockIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// Any of these aborts the surrounding ordering transaction; nothing the
/// operation wrote before the failure survives.
#[derive(Debug, Error)]
pub enum CoreError {
    // -------------------------------------------------------------------------
    // Not found
    // -------------------------------------------------------------------------
    #[error("Outlet not found")]
    OutletNotFound(i64),

    #[error("Customer not found")]
    CustomerNotFound,

    #[error("Product {0} not found")]
    ProductNotFound(i64),

    #[error("Order not found")]
    OrderNotFound(i64),

    /// Staff view of an order that belongs to another outlet.
    #[error("Order not found for this outlet")]
    OrderNotFoundForOutlet { order_id: i64, outlet_id: i64 },

    #[error("Order item {item_id} does not belong to order {order_id}")]
    OrderItemNotFound { order_id: i64, item_id: i64 },

    #[error("Wallet not found")]
    WalletNotFound,

    // -------------------------------------------------------------------------
    // Outlet / authorization
    // -------------------------------------------------------------------------
    #[error("Selected outlet is currently inactive")]
    OutletInactive(i64),

    #[error("Product {product_id} is not sold at outlet {outlet_id}")]
    ProductWrongOutlet { product_id: i64, outlet_id: i64 },

    #[error("You can only update orders for your assigned outlet")]
    OutletForbidden { outlet_id: i64 },

    // -------------------------------------------------------------------------
    // Coupon (checked in this order)
    // -------------------------------------------------------------------------
    #[error("Invalid or inactive coupon")]
    InvalidCoupon,

    #[error("Coupon is not valid for the current date and time")]
    CouponExpired,

    #[error("Coupon is not valid for the selected outlet")]
    CouponWrongOutlet,

    #[error("Coupon already used by this customer")]
    CouponAlreadyUsed,

    #[error("Coupon usage limit reached")]
    CouponLimitReached,

    #[error("Minimum order value of {min} required. Your cart value is {total}")]
    BelowMinOrder { min: Money, total: Money },

    // -------------------------------------------------------------------------
    // Payment
    // -------------------------------------------------------------------------
    #[error("Insufficient wallet balance. Available: {available}, Required: {required}")]
    InsufficientBalance { available: Money, required: Money },

    #[error("Invalid payment details for online payment")]
    MissingPaymentDetails,

    #[error("Payment verification failed: Invalid signature")]
    SignatureInvalid,

    // -------------------------------------------------------------------------
    // Inventory
    // -------------------------------------------------------------------------
    /// Every failing line of one order, collected before any mutation.
    #[error("Stock validation failed: {}", join_issues(.0))]
    StockValidationFailed(Vec<StockIssue>),

    // -------------------------------------------------------------------------
    // Status machine
    // -------------------------------------------------------------------------
    #[error("Only pending orders can be cancelled")]
    OrderNotCancellable { status: crate::OrderStatus },

    #[error("Cannot cancel order. Order status is {status}")]
    CannotCancel { status: crate::OrderStatus },

    #[error("Cannot mark a cancelled order as delivered.")]
    CannotDeliverCancelled,

    /// DELIVERED is terminal, including orders closed by a partial cancel.
    #[error("Order is already DELIVERED")]
    AlreadyDelivered,

    #[error("Cannot partially cancel order. Order status is {status}")]
    CannotPartialCancel { status: crate::OrderStatus },

    #[error("No undelivered items to cancel")]
    NoUndeliveredItems,

    #[error("Provide at least one orderItemId to deliver")]
    NoItemsToDeliver,

    #[error("Invalid status value")]
    InvalidStatusValue(String),

    // -------------------------------------------------------------------------
    // Feedback
    // -------------------------------------------------------------------------
    #[error("Some products have already been rated: {}", join_ids(.0))]
    AlreadyRated(Vec<i64>),

    #[error("Products not part of this order: {}", join_ids(.0))]
    ProductsNotInOrder(Vec<i64>),

    // -------------------------------------------------------------------------
    // Concurrency
    // -------------------------------------------------------------------------
    /// A guarded UPDATE matched zero rows because another request changed
    /// the row between our read and our write.
    #[error("Concurrent update on {entity}, please retry")]
    ConcurrentUpdate { entity: &'static str },

    /// Validation error (wraps ValidationError).
    #[error("{0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::OutletNotFound(_) => "OUTLET_NOT_FOUND",
            CoreError::CustomerNotFound => "CUSTOMER_NOT_FOUND",
            CoreError::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            CoreError::OrderNotFound(_) | CoreError::OrderNotFoundForOutlet { .. } => {
                "ORDER_NOT_FOUND"
            }
            CoreError::OrderItemNotFound { .. } => "ORDER_ITEM_NOT_FOUND",
            CoreError::WalletNotFound => "WALLET_NOT_FOUND",
            CoreError::OutletInactive(_) => "OUTLET_INACTIVE",
            CoreError::ProductWrongOutlet { .. } => "PRODUCT_WRONG_OUTLET",
            CoreError::OutletForbidden { .. } => "FORBIDDEN",
            CoreError::InvalidCoupon => "INVALID_COUPON",
            CoreError::CouponExpired => "COUPON_EXPIRED",
            CoreError::CouponWrongOutlet => "COUPON_WRONG_OUTLET",
            CoreError::CouponAlreadyUsed => "COUPON_ALREADY_USED",
            CoreError::CouponLimitReached => "COUPON_LIMIT_REACHED",
            CoreError::BelowMinOrder { .. } => "BELOW_MIN_ORDER",
            CoreError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            CoreError::MissingPaymentDetails => "MISSING_PAYMENT_DETAILS",
            CoreError::SignatureInvalid => "SIGNATURE_INVALID",
            CoreError::StockValidationFailed(_) => "STOCK_VALIDATION_FAILED",
            CoreError::OrderNotCancellable { .. } => "ORDER_NOT_CANCELLABLE",
            CoreError::CannotCancel { .. }
            | CoreError::CannotDeliverCancelled
            | CoreError::AlreadyDelivered
            | CoreError::CannotPartialCancel { .. }
            | CoreError::NoUndeliveredItems => "INVALID_STATUS_TRANSITION",
            CoreError::NoItemsToDeliver | CoreError::InvalidStatusValue(_) => "VALIDATION_ERROR",
            CoreError::AlreadyRated(_) => "ALREADY_RATED",
            CoreError::ProductsNotInOrder(_) => "VALIDATION_ERROR",
            CoreError::ConcurrentUpdate { .. } => "CONCURRENT_UPDATE",
            CoreError::Validation(_) => "VALIDATION_ERROR",
        }
    }

    /// Classification used by the HTTP layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::OutletNotFound(_)
            | CoreError::CustomerNotFound
            | CoreError::ProductNotFound(_)
            | CoreError::OrderNotFound(_)
            | CoreError::OrderNotFoundForOutlet { .. }
            | CoreError::OrderItemNotFound { .. }
            | CoreError::WalletNotFound => ErrorKind::NotFound,
            CoreError::OutletForbidden { .. } => ErrorKind::Forbidden,
            CoreError::MissingPaymentDetails | CoreError::SignatureInvalid => ErrorKind::Payment,
            CoreError::ConcurrentUpdate { .. } => ErrorKind::Conflict,
            CoreError::NoItemsToDeliver
            | CoreError::InvalidStatusValue(_)
            | CoreError::ProductsNotInOrder(_)
            | CoreError::Validation(_) => ErrorKind::Validation,
            _ => ErrorKind::BusinessRule,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any transaction is opened.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// The same id appears twice in one request.
    #[error("{field} '{value}' appears more than once")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OrderStatus;

    #[test]
    fn test_error_messages() {
        let err = CoreError::BelowMinOrder {
            min: Money::from_paise(20000),
            total: Money::from_paise(15050),
        };
        assert_eq!(
            err.to_string(),
            "Minimum order value of ₹200.00 required. Your cart value is ₹150.50"
        );

        let err = CoreError::CannotCancel {
            status: OrderStatus::Delivered,
        };
        assert_eq!(err.to_string(), "Cannot cancel order. Order status is DELIVERED");
    }

    #[test]
    fn test_stock_validation_lists_every_issue() {
        let err = CoreError::StockValidationFailed(vec![
            StockIssue::NotInInventory { product_id: 7 },
            StockIssue::Insufficient {
                product_id: 9,
                available: 3,
                requested: 5,
            },
        ]);
        assert_eq!(err.code(), "STOCK_VALIDATION_FAILED");
        assert_eq!(
            err.to_string(),
            "Stock validation failed: Product 7 not found in inventory; \
             Insufficient stock for product 9. Available: 3, Requested: 5"
        );
    }

    #[test]
    fn test_codes_and_kinds() {
        assert_eq!(CoreError::InvalidCoupon.code(), "INVALID_COUPON");
        assert_eq!(CoreError::InvalidCoupon.kind(), ErrorKind::BusinessRule);
        assert_eq!(CoreError::SignatureInvalid.kind(), ErrorKind::Payment);
        assert_eq!(CoreError::OrderNotFound(1).kind(), ErrorKind::NotFound);
        assert_eq!(
            CoreError::ConcurrentUpdate { entity: "wallet" }.code(),
            "CONCURRENT_UPDATE"
        );
        assert_eq!(
            CoreError::OutletForbidden { outlet_id: 2 }.kind(),
            ErrorKind::Forbidden
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "items".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.to_string(), "items is required");
        assert_eq!(core_err.kind(), ErrorKind::Validation);
    }
}
