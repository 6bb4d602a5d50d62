//! Shared harness for router tests: an in-memory database with one outlet,
//! a customer and a staff member, and helpers to drive the real router.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use canteen_api::{router, ApiConfig, AppState};
use canteen_core::coupon::CouponReward;
use canteen_core::{Category, CustomerDetails, Money, Outlet, Product, Role, User};
use canteen_db::repository::coupon::NewCoupon;
use canteen_db::repository::product::NewProduct;
use canteen_db::repository::{
    CouponRepository, InventoryRepository, OutletRepository, ProductRepository, UserRepository, WalletRepository,
};
use canteen_db::{Database, DbConfig};

pub const GATEWAY_SECRET: &str = "test-gateway-secret";
pub const GATEWAY_KEY_ID: &str = "rzp_test_key";

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub db: Database,
    pub outlet: Outlet,
    pub other_outlet: Outlet,
    pub customer_user: User,
    pub customer: CustomerDetails,
    pub staff: User,
    pub customer_token: String,
    pub staff_token: String,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let outlet = OutletRepository::new(&mut conn).insert("Main Canteen", None).await.unwrap();
        let other_outlet = OutletRepository::new(&mut conn).insert("Annex", None).await.unwrap();

        let mut users = UserRepository::new(&mut conn);
        let customer_user = users
            .insert("asha@example.com", "Asha", Role::Customer, None)
            .await
            .unwrap();
        let customer = users.insert_customer(customer_user.id).await.unwrap();
        let staff = users
            .insert("counter@example.com", "Counter", Role::Staff, Some(outlet.id))
            .await
            .unwrap();
        drop(conn);

        let config = ApiConfig {
            jwt_secret: "test-jwt-secret".to_string(),
            razorpay_key_id: GATEWAY_KEY_ID.to_string(),
            razorpay_key_secret: GATEWAY_SECRET.to_string(),
            ..ApiConfig::default()
        };
        let state = AppState::new(db.clone(), config);
        let customer_token = state.jwt.issue(&customer_user, Duration::hours(1)).unwrap();
        let staff_token = state.jwt.issue(&staff, Duration::hours(1)).unwrap();

        TestApp {
            app: router(state.clone()),
            state,
            db,
            outlet,
            other_outlet,
            customer_user,
            customer,
            staff,
            customer_token,
            staff_token,
        }
    }

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

    pub async fn fund_wallet(&self, paise: i64) {
        let mut conn = self.db.pool().acquire().await.unwrap();
        WalletRepository::new(&mut conn)
            .create(self.customer.id, Money::from_paise(paise))
            .await
            .unwrap();
    }

    pub async fn add_coupon(&self, code: &str, reward: CouponReward, min_order_paise: i64) {
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
            .unwrap();
    }

    pub async fn stock(&self, product_id: i64) -> i64 {
        let mut conn = self.db.pool().acquire().await.unwrap();
        InventoryRepository::new(&mut conn)
            .get(product_id, self.outlet.id)
            .await
            .unwrap()
            .map(|i| i.quantity)
            .unwrap_or_default()
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        TestResponse { status, headers, body }
    }

    pub async fn as_customer(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        self.request(method, uri, Some(&self.customer_token), body).await
    }

    pub async fn as_staff(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        self.request(method, uri, Some(&self.staff_token), body).await
    }

    /// Places a CASH order and returns the response body.
    pub async fn place_cash_order(&self, lines: &[(i64, i64)]) -> Value {
        let response = self
            .as_customer(Method::POST, "/api/customer/outlets/customer-order", Some(self.order_body(lines, "CASH")))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body
    }

    pub fn order_body(&self, lines: &[(i64, i64)], method: &str) -> Value {
        let items: Vec<Value> = lines
            .iter()
            .map(|&(product_id, quantity)| serde_json::json!({ "productId": product_id, "quantity": quantity }))
            .collect();
        serde_json::json!({
            "paymentMethod": method,
            "deliverySlot": "SLOT_12_13",
            "outletId": self.outlet.id,
            "items": items,
        })
    }
}
