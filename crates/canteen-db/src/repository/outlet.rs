//! # Outlet Repository

use chrono::Utc;
use sqlx::SqliteConnection;

use crate::error::DbResult;
use canteen_core::Outlet;

/// Repository for outlets.
pub struct OutletRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> OutletRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        OutletRepository { conn }
    }

    /// Gets an outlet by ID.
    pub async fn get_by_id(&mut self, id: i64) -> DbResult<Option<Outlet>> {
        let outlet = sqlx::query_as::<_, Outlet>(
            "SELECT id, name, address, is_active, created_at FROM outlets WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(outlet)
    }

    /// Inserts an active outlet.
    pub async fn insert(&mut self, name: &str, address: Option<&str>) -> DbResult<Outlet> {
        let outlet = sqlx::query_as::<_, Outlet>(
            r#"
            INSERT INTO outlets (name, address, is_active, created_at)
            VALUES (?, ?, 1, ?)
            RETURNING id, name, address, is_active, created_at
            "#,
        )
        .bind(name)
        .bind(address)
        .bind(Utc::now())
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(outlet)
    }

    /// Opens or closes an outlet for ordering.
    pub async fn set_active(&mut self, id: i64, is_active: bool) -> DbResult<()> {
        sqlx::query("UPDATE outlets SET is_active = ? WHERE id = ?")
            .bind(is_active)
            .bind(id)
            .execute(&mut *self.conn)
            .await?;

        Ok(())
    }
}
