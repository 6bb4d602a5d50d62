//! # User Repository
//!
//! Users (customers, staff, admins) and customer profiles.
//!
//! Authentication lives elsewhere; these rows are only read to resolve a
//! token's user into a customer profile and to keep `order_count` current.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use canteen_core::{CustomerDetails, Role, User};

/// Repository for users and customer profiles.
///
/// ## Usage
/// ```rust,ignore
/// let mut conn = db.pool().acquire().await?;
/// let customer = UserRepository::new(&mut conn).customer_by_user(user_id).await?;
/// ```
pub struct UserRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> UserRepository<'c> {
    /// Creates a repository over a borrowed connection or transaction.
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        UserRepository { conn }
    }

    /// Gets a user by ID.
    pub async fn get_by_id(&mut self, id: i64) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, name, role, outlet_id, is_verified, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(user)
    }

    /// Inserts a user and returns the stored row.
    pub async fn insert(
        &mut self,
        email: &str,
        name: &str,
        role: Role,
        outlet_id: Option<i64>,
    ) -> DbResult<User> {
        debug!(email = %email, role = %role, "Inserting user");

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name, role, outlet_id, is_verified, created_at)
            VALUES (?, ?, ?, ?, 1, ?)
            RETURNING id, email, name, role, outlet_id, is_verified, created_at
            "#,
        )
        .bind(email)
        .bind(name)
        .bind(role)
        .bind(outlet_id)
        .bind(Utc::now())
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(user)
    }

    /// Customer profile attached to a user, if any.
    pub async fn customer_by_user(&mut self, user_id: i64) -> DbResult<Option<CustomerDetails>> {
        let customer = sqlx::query_as::<_, CustomerDetails>(
            "SELECT id, user_id, order_count, created_at FROM customer_details WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(customer)
    }

    /// Customer profile by its own ID.
    pub async fn customer_by_id(&mut self, customer_id: i64) -> DbResult<Option<CustomerDetails>> {
        let customer = sqlx::query_as::<_, CustomerDetails>(
            "SELECT id, user_id, order_count, created_at FROM customer_details WHERE id = ?",
        )
        .bind(customer_id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(customer)
    }

    /// Creates the customer profile for a CUSTOMER user.
    pub async fn insert_customer(&mut self, user_id: i64) -> DbResult<CustomerDetails> {
        let customer = sqlx::query_as::<_, CustomerDetails>(
            r#"
            INSERT INTO customer_details (user_id, order_count, created_at)
            VALUES (?, 0, ?)
            RETURNING id, user_id, order_count, created_at
            "#,
        )
        .bind(user_id)
        .bind(Utc::now())
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(customer)
    }

    /// Bumps the customer's lifetime order counter.
    pub async fn increment_order_count(&mut self, customer_id: i64) -> DbResult<()> {
        sqlx::query("UPDATE customer_details SET order_count = order_count + 1 WHERE id = ?")
            .bind(customer_id)
            .execute(&mut *self.conn)
            .await?;

        Ok(())
    }
}
