//! Inventory deduction and restock, shared by every ordering path.

use sqlx::SqliteConnection;
use tracing::{debug, warn};

use super::OrderResult;
use crate::repository::InventoryRepository;
use canteen_core::inventory::{plan_deduction, StockChange};
use canteen_core::{CoreError, LineItem, StockAction};

/// Validate-all then mutate-all.
///
/// Phase 1 reads every stock level and plans the whole deduction; any
/// missing or short line rejects the order before a single row changes.
/// Phase 2 applies each decrement with its `quantity >= ?` guard and
/// appends a REMOVE history row.
pub(crate) async fn deduct_all(
    conn: &mut SqliteConnection,
    outlet_id: i64,
    lines: &[LineItem],
) -> OrderResult<Vec<StockChange>> {
    let product_ids: Vec<i64> = lines.iter().map(|l| l.product_id).collect();
    let levels = InventoryRepository::new(conn).stock_levels(outlet_id, &product_ids).await?;

    let plan = plan_deduction(lines, &levels)?;

    for change in &plan {
        let mut inventory = InventoryRepository::new(conn);
        if !inventory
            .deduct(change.product_id, outlet_id, change.requested_quantity)
            .await?
        {
            return Err(CoreError::ConcurrentUpdate { entity: "inventory" }.into());
        }
        inventory
            .record_history(change.product_id, outlet_id, change.requested_quantity, StockAction::Remove)
            .await?;
    }

    debug!(outlet_id, lines = plan.len(), "Inventory deducted");
    Ok(plan)
}

/// Puts quantities back and appends an ADD history row per line.
///
/// A product whose inventory row has since been removed is skipped with a
/// warning; the rest of the restock still applies. Returns the total number
/// of units restored.
pub(crate) async fn restock_all(
    conn: &mut SqliteConnection,
    outlet_id: i64,
    lines: &[LineItem],
) -> OrderResult<i64> {
    let mut restored = 0;

    for line in lines {
        let mut inventory = InventoryRepository::new(conn);
        if inventory.restock(line.product_id, outlet_id, line.quantity).await? {
            inventory
                .record_history(line.product_id, outlet_id, line.quantity, StockAction::Add)
                .await?;
            restored += line.quantity;
        } else {
            warn!(product_id = line.product_id, outlet_id, "No inventory row to restock");
        }
    }

    Ok(restored)
}
