//! Route handlers, grouped by caller.
//!
//! - [`health`] - Liveness and database check (no auth)
//! - [`customer`] - Ordering, quota, coupons, payments and feedback
//! - [`staff`] - Counter operations on an outlet's orders

pub mod customer;
pub mod health;
pub mod staff;
