//! Shared fixture for ordering tests: one outlet, one customer, one staff
//! member, and helpers to stock products, wallets and coupons.

use std::sync::Arc;

use chrono::{Duration, Utc};

use super::{OrderingService, PlaceOrderInput, StaffActor, DEFAULT_UTC_OFFSET_MINUTES};
use crate::pool::{Database, DbConfig};
use crate::repository::coupon::NewCoupon;
use crate::repository::product::NewProduct;
use crate::repository::{
    CartRepository, CouponRepository, InventoryRepository, OrderRepository, OutletRepository, ProductRepository,
    QuotaRepository, UserRepository, WalletRepository,
};
use crate::tasks::BackgroundTasks;
use canteen_core::coupon::CouponReward;
use canteen_core::payment::PaymentVerifier;
use canteen_core::{
    Category, Coupon, CustomerDetails, DeliverySlot, LineItem, Money, Order, OrderItem, Outlet, PaymentMethod,
    Product, Role, StockHistory, User, Wallet, WalletTransaction,
};

/// The only signature [`FakeVerifier`] accepts.
pub(crate) const SIGNATURE_OK: &str = "valid-signature";

/// Accepts exactly [`SIGNATURE_OK`].
pub(crate) struct FakeVerifier;

impl PaymentVerifier for FakeVerifier {
    fn verify(&self, _gateway_order_id: &str, _gateway_payment_id: &str, signature: &str) -> bool {
        signature == SIGNATURE_OK
    }
}

pub(crate) struct Fixture {
    pub db: Database,
    pub service: OrderingService,
    pub outlet: Outlet,
    pub user: User,
    pub customer: CustomerDetails,
    pub staff: User,
}

impl Fixture {
    pub async fn new() -> Self {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let service = OrderingService::new(
            db.clone(),
            Arc::new(FakeVerifier),
            DEFAULT_UTC_OFFSET_MINUTES,
            BackgroundTasks::new(),
        );

        let mut conn = db.pool().acquire().await.unwrap();
        let outlet = OutletRepository::new(&mut conn)
            .insert("Main Canteen", Some("Block A"))
            .await
            .unwrap();

        let mut users = UserRepository::new(&mut conn);
        let user = users
            .insert("asha@example.com", "Asha", Role::Customer, None)
            .await
            .unwrap();
        let customer = users.insert_customer(user.id).await.unwrap();
        let staff = users
            .insert("counter@example.com", "Counter", Role::Staff, Some(outlet.id))
            .await
            .unwrap();
        drop(conn);

        Fixture {
            db,
            service,
            outlet,
            user,
            customer,
            staff,
        }
    }

    pub fn staff_actor(&self) -> StaffActor {
        StaffActor {
            user_id: self.staff.id,
            role: self.staff.role,
            outlet_id: self.staff.outlet_id,
        }
    }

    /// A CASH/WALLET-style checkout for `(product_id, quantity)` lines.
    pub fn input(&self, lines: &[(i64, i64)], method: PaymentMethod) -> PlaceOrderInput {
        PlaceOrderInput {
            outlet_id: self.outlet.id,
            payment_method: method,
            delivery_slot: DeliverySlot::Slot12To13,
            requested_delivery_date: None,
            coupon_code: None,
            items: lines
                .iter()
                .map(|&(product_id, quantity)| LineItem { product_id, quantity })
                .collect(),
            payment_details: None,
            client_total: None,
        }
    }

    // -------------------------------------------------------------------------
    // Setup
    // -------------------------------------------------------------------------

    pub async fn add_product(&self, name: &str, price_paise: i64, company_paid: bool, stock: i64) -> Product {
        let mut conn = self.db.pool().acquire().await.unwrap();
        let product = ProductRepository::new(&mut conn)
            .insert(&NewProduct {
                name,
                description: None,
                price: Money::from_paise(price_paise),
                outlet_id: self.outlet.id,
                category: Category::Meals,
                is_veg: true,
                company_paid,
            })
            .await
            .unwrap();
        InventoryRepository::new(&mut conn)
            .insert(product.id, self.outlet.id, stock, 5)
            .await
            .unwrap();
        product
    }

    pub async fn fund_wallet(&self, paise: i64) -> Wallet {
        let mut conn = self.db.pool().acquire().await.unwrap();
        WalletRepository::new(&mut conn)
            .create(self.customer.id, Money::from_paise(paise))
            .await
            .unwrap()
    }

    pub async fn add_coupon(&self, code: &str, reward: CouponReward, min_order_paise: i64) -> Coupon {
        let now = Utc::now();
        let mut conn = self.db.pool().acquire().await.unwrap();
        CouponRepository::new(&mut conn)
            .insert(&NewCoupon {
                code,
                description: None,
                reward,
                min_order_value: Money::from_paise(min_order_paise),
                valid_from: now - Duration::days(1),
                valid_until: now + Duration::days(1),
                usage_limit: 100,
                outlet_id: None,
            })
            .await
            .unwrap()
    }

    pub async fn set_quota_used(&self, used: i64) {
        let today = self.service.business_day(Utc::now());
        let mut conn = self.db.pool().acquire().await.unwrap();
        let mut quota = QuotaRepository::new(&mut conn);
        let current = quota.used(self.user.id, today).await.unwrap();
        assert!(quota.consume(self.user.id, today, current, used - current).await.unwrap());
    }

    pub async fn add_to_cart(&self, product_id: i64, quantity: i64) {
        let mut conn = self.db.pool().acquire().await.unwrap();
        CartRepository::new(&mut conn)
            .add_item(self.customer.id, product_id, quantity)
            .await
            .unwrap();
    }

    pub async fn deactivate_outlet(&self) {
        let mut conn = self.db.pool().acquire().await.unwrap();
        OutletRepository::new(&mut conn)
            .set_active(self.outlet.id, false)
            .await
            .unwrap();
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    pub async fn stock(&self, product_id: i64) -> i64 {
        let mut conn = self.db.pool().acquire().await.unwrap();
        InventoryRepository::new(&mut conn)
            .get(product_id, self.outlet.id)
            .await
            .unwrap()
            .map(|i| i.quantity)
            .unwrap_or(-1)
    }

    pub async fn stock_history(&self, product_id: i64) -> Vec<StockHistory> {
        let mut conn = self.db.pool().acquire().await.unwrap();
        InventoryRepository::new(&mut conn).history(product_id).await.unwrap()
    }

    pub async fn quota_used(&self) -> i64 {
        let today = self.service.business_day(Utc::now());
        let mut conn = self.db.pool().acquire().await.unwrap();
        QuotaRepository::new(&mut conn).used(self.user.id, today).await.unwrap()
    }

    pub async fn wallet(&self) -> Option<Wallet> {
        let mut conn = self.db.pool().acquire().await.unwrap();
        WalletRepository::new(&mut conn)
            .get_by_customer(self.customer.id)
            .await
            .unwrap()
    }

    pub async fn wallet_transactions(&self) -> Vec<WalletTransaction> {
        let Some(wallet) = self.wallet().await else {
            return Vec::new();
        };
        let mut conn = self.db.pool().acquire().await.unwrap();
        WalletRepository::new(&mut conn).transactions(wallet.id).await.unwrap()
    }

    pub async fn coupon_used_count(&self, coupon_id: i64) -> i64 {
        let mut conn = self.db.pool().acquire().await.unwrap();
        CouponRepository::new(&mut conn)
            .get_by_id(coupon_id)
            .await
            .unwrap()
            .map(|c| c.used_count)
            .unwrap_or(-1)
    }

    pub async fn coupon_usage_exists(&self, coupon_id: i64) -> bool {
        let mut conn = self.db.pool().acquire().await.unwrap();
        CouponRepository::new(&mut conn)
            .has_usage(self.user.id, coupon_id)
            .await
            .unwrap()
    }

    pub async fn order(&self, order_id: i64) -> Order {
        let mut conn = self.db.pool().acquire().await.unwrap();
        OrderRepository::new(&mut conn).get_by_id(order_id).await.unwrap().unwrap()
    }

    pub async fn order_items(&self, order_id: i64) -> Vec<OrderItem> {
        let mut conn = self.db.pool().acquire().await.unwrap();
        OrderRepository::new(&mut conn).items(order_id).await.unwrap()
    }

    pub async fn order_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(self.db.pool())
            .await
            .unwrap()
    }

    pub async fn cart_count(&self) -> i64 {
        let mut conn = self.db.pool().acquire().await.unwrap();
        CartRepository::new(&mut conn).item_count(self.customer.id).await.unwrap()
    }
}
