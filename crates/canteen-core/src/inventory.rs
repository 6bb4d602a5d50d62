//! # Inventory Deduction Planning
//!
//! Validate-all, then mutate-all.
//!
//! ```text
//! Phase 1 (this module, pure)          Phase 2 (canteen-db, in transaction)
//! ───────────────────────────          ────────────────────────────────────
//! for every line:                      for every planned change:
//!   no row?        → issue               UPDATE ... WHERE quantity >= ?
//!   stock < qty?   → issue               INSERT stock_history (REMOVE)
//! any issue → reject whole order
//! ```
//!
//! Because issues are collected for every line before returning, the client
//! sees all shortages at once and no row is touched when any line fails.

use std::collections::HashMap;

use serde::Serialize;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, StockIssue};
use crate::types::LineItem;

/// One planned stock decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockChange {
    pub product_id: i64,
    pub current_stock: i64,
    pub requested_quantity: i64,
    pub new_stock: i64,
}

/// Plans the deduction of every line against current stock levels.
///
/// `stock` maps product id to the quantity on its inventory row; a missing
/// key means the product has no inventory row.
pub fn plan_deduction(lines: &[LineItem], stock: &HashMap<i64, i64>) -> CoreResult<Vec<StockChange>> {
    let mut issues = Vec::new();
    let mut changes = Vec::with_capacity(lines.len());

    for line in lines {
        match stock.get(&line.product_id) {
            None => issues.push(StockIssue::NotInInventory {
                product_id: line.product_id,
            }),
            Some(&available) if available < line.quantity => issues.push(StockIssue::Insufficient {
                product_id: line.product_id,
                available,
                requested: line.quantity,
            }),
            Some(&available) => changes.push(StockChange {
                product_id: line.product_id,
                current_stock: available,
                requested_quantity: line.quantity,
                new_stock: available - line.quantity,
            }),
        }
    }

    if !issues.is_empty() {
        return Err(CoreError::StockValidationFailed(issues));
    }

    Ok(changes)
}

// =============================================================================
// Unit Tests
// =============================================================================
