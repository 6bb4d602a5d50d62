//! # Validation Module
//!
//! Request validation for the ordering endpoints.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP extractor (serde)                                        │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── Enum values (paymentMethod, deliverySlot, status)                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── Ids positive, quantities in range, lines unique                   │
//! │  └── Runs before any transaction is opened                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  ├── CHECK constraints (stock ≥ 0, balance ≥ 0, quota ≤ 5)             │
//! │  └── UNIQUE constraints (coupon usage per user, quota per day)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use canteen_core::validation::{validate_order_lines, validate_quantity};
//! use canteen_core::LineItem;
//!
//! validate_quantity(5).unwrap();
//! validate_order_lines(&[LineItem { product_id: 1, quantity: 2 }]).unwrap();
//! assert!(validate_order_lines(&[]).is_err());
//! ```

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::types::LineItem;
use crate::{MAX_ITEM_QUANTITY, MAX_ORDER_LINES};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest coupon code accepted.
pub const MAX_COUPON_CODE_LEN: usize = 50;

/// Longest feedback comment accepted.
pub const MAX_COMMENT_LEN: usize = 1000;

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a database id supplied by the client.
pub fn validate_id(field: &str, id: i64) -> ValidationResult<()> {
    if id <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a 1-5 star rating.
pub fn validate_rating(field: &str, rating: f64) -> ValidationResult<()> {
    if !rating.is_finite() || !(1.0..=5.0).contains(&rating) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: 5,
        });
    }
    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Normalizes an optional coupon code.
///
/// Blank codes mean "no coupon". Returns the trimmed code otherwise.
///
/// ## Example
/// ```rust
/// use canteen_core::validation::validate_coupon_code;
///
/// assert_eq!(validate_coupon_code(Some("  SAVE10 ")).unwrap(), Some("SAVE10".to_string()));
/// assert_eq!(validate_coupon_code(Some("")).unwrap(), None);
/// assert_eq!(validate_coupon_code(None).unwrap(), None);
/// ```
pub fn validate_coupon_code(code: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(code) = code.map(str::trim).filter(|c| !c.is_empty()) else {
        return Ok(None);
    };

    if code.chars().count() > MAX_COUPON_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: "couponCode".to_string(),
            max: MAX_COUPON_CODE_LEN,
        });
    }

    Ok(Some(code.to_string()))
}

/// Validates an optional free-text comment.
pub fn validate_comment(comment: Option<&str>) -> ValidationResult<()> {
    if let Some(comment) = comment {
        if comment.chars().count() > MAX_COMMENT_LEN {
            return Err(ValidationError::TooLong {
                field: "comment".to_string(),
                max: MAX_COMMENT_LEN,
            });
        }
    }
    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the lines of an order request.
///
/// ## Rules
/// - At least one line, at most MAX_ORDER_LINES (100)
/// - Every product id positive and every quantity in range
/// - A product appears at most once
///
/// ## Why Unique Products
/// ```text
/// Stock = 3, lines [{p1, 2}, {p1, 2}]
///   per-line check: 3 ≥ 2 ✓, 3 ≥ 2 ✓   but combined 4 > 3
/// ```
/// Stock sufficiency is checked per line, so repeated products would let
/// an order slip past the validate-all phase.
pub fn validate_order_lines(lines: &[LineItem]) -> ValidationResult<()> {
    if lines.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if lines.len() > MAX_ORDER_LINES {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_ORDER_LINES as i64,
        });
    }

    let mut seen = HashSet::with_capacity(lines.len());
    for line in lines {
        validate_id("productId", line.product_id)?;
        validate_quantity(line.quantity)?;
        if !seen.insert(line.product_id) {
            return Err(ValidationError::Duplicate {
                field: "productId".to_string(),
                value: line.product_id.to_string(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: i64, quantity: i64) -> LineItem {
        LineItem {
            product_id,
            quantity,
        }
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_order_lines() {
        assert!(validate_order_lines(&[line(1, 2), line(2, 1)]).is_ok());

        assert!(matches!(
            validate_order_lines(&[]),
            Err(ValidationError::Required { .. })
        ));
        assert!(validate_order_lines(&[line(0, 1)]).is_err());
        assert!(validate_order_lines(&[line(1, 0)]).is_err());
        assert!(matches!(
            validate_order_lines(&[line(1, 2), line(1, 2)]),
            Err(ValidationError::Duplicate { .. })
        ));

        let too_many: Vec<_> = (1..=101).map(|id| line(id, 1)).collect();
        assert!(validate_order_lines(&too_many).is_err());
    }

    #[test]
    fn test_validate_coupon_code() {
        assert_eq!(validate_coupon_code(Some("   ")).unwrap(), None);
        assert_eq!(
            validate_coupon_code(Some("WELCOME")).unwrap(),
            Some("WELCOME".to_string())
        );
        assert!(validate_coupon_code(Some(&"X".repeat(51))).is_err());
    }

    #[test]
    fn test_validate_rating() {
        assert!(validate_rating("ratingOverall", 1.0).is_ok());
        assert!(validate_rating("ratingOverall", 4.5).is_ok());
        assert!(validate_rating("ratingOverall", 0.0).is_err());
        assert!(validate_rating("ratingOverall", 5.5).is_err());
        assert!(validate_rating("ratingOverall", f64::NAN).is_err());
    }

    #[test]
    fn test_validate_comment() {
        assert!(validate_comment(None).is_ok());
        assert!(validate_comment(Some("Tasty")).is_ok());
        assert!(validate_comment(Some(&"a".repeat(1001))).is_err());
    }
}
