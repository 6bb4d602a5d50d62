//! # Order Placement
//!
//! The customer checkout: quota, pricing, coupon, settlement and stock in a
//! single transaction.
//!
//! ## Commit Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate request (no tx yet)                                           │
//! │       │                                                                 │
//! │  BEGIN                                                                  │
//! │       ├── outlet active?  customer exists?  products of this outlet?    │
//! │       ├── quota_used(user, today) ──► price_cart ──► breakdown          │
//! │       ├── coupon checks ──► discount ──► OrderTotals                    │
//! │       ├── settlement checks (signature / wallet balance)                │
//! │       ├── stock: validate-all ──► mutate-all (+ REMOVE history)         │
//! │       ├── quota row: guarded upsert (+ free units)                      │
//! │       ├── INSERT order (PENDING, APP) + items (free_quantity)           │
//! │       ├── wallet debit + DEDUCT row          (WALLET only)              │
//! │       ├── clear cart                                                    │
//! │       └── coupon usage + used_count guard    (coupon only)              │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Client-sent prices and totals are never trusted. Unit prices come from
//! the product rows read inside the transaction.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{load_details, settlement, stock, OrderDetails, OrderError, OrderResult, OrderingService};
use crate::error::DbError;
use crate::repository::order::{NewOrder, NewOrderItem};
use crate::repository::{
    CartRepository, CouponRepository, OrderRepository, OutletRepository, ProductRepository, QuotaRepository,
    UserRepository, WalletRepository,
};
use canteen_core::coupon::{self, CouponContext};
use canteen_core::inventory::StockChange;
use canteen_core::payment::{check_wallet_balance, verify_online_payment, GatewayDetails};
use canteen_core::pricing::{price_cart, OrderTotals, PricingBreakdown, PricingLine};
use canteen_core::quota::QuotaStatus;
use canteen_core::validation::{validate_coupon_code, validate_id, validate_order_lines};
use canteen_core::{
    CoreError, DeliverySlot, LineItem, Money, OrderItemStatus, OrderStatus, OrderType, PaymentMethod,
    ValidationError, WalletTransaction,
};

// =============================================================================
// Request / Result
// =============================================================================

/// A customer checkout request.
#[derive(Debug, Clone)]
pub struct PlaceOrderInput {
    pub outlet_id: i64,
    pub payment_method: PaymentMethod,
    pub delivery_slot: DeliverySlot,
    /// Defaults to today's business day. A later day makes a pre-order.
    pub requested_delivery_date: Option<NaiveDate>,
    pub coupon_code: Option<String>,
    pub items: Vec<LineItem>,
    /// Gateway references for UPI / CARD.
    pub payment_details: Option<GatewayDetails>,
    /// Total the client displayed. Only compared and logged.
    pub client_total: Option<Money>,
}

/// A committed order with everything the checkout response shows.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub details: OrderDetails,
    pub breakdown: PricingBreakdown,
    pub totals: OrderTotals,
    pub wallet_transaction: Option<WalletTransaction>,
    pub stock_updates: Vec<StockChange>,
    /// Quota after this order.
    pub quota: QuotaStatus,
}

/// Result of a coupon dry run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponPreview {
    pub code: String,
    pub discount: Money,
    pub total_after_discount: Money,
}

// =============================================================================
// Operations
// =============================================================================

impl OrderingService {
    /// Places an order for the customer behind `user_id`.
    ///
    /// Every check runs before the first write; any error drops the
    /// transaction so no stock, quota, wallet or coupon change survives.
    pub async fn place_order(&self, user_id: i64, input: PlaceOrderInput) -> OrderResult<PlacedOrder> {
        validate_order_lines(&input.items)?;
        validate_id("outletId", input.outlet_id)?;
        let coupon_code = validate_coupon_code(input.coupon_code.as_deref())?;

        let now = Utc::now();
        let today = self.business_day(now);
        let (delivery_date, is_pre_order) = resolve_delivery_date(input.requested_delivery_date, today)?;

        info!(
            user_id,
            outlet_id = input.outlet_id,
            lines = input.items.len(),
            method = %input.payment_method,
            "Placing order"
        );

        let mut tx = self.db().begin().await?;

        // ---------------------------------------------------------------------
        // Who and where
        // ---------------------------------------------------------------------
        let outlet = OutletRepository::new(&mut tx)
            .get_by_id(input.outlet_id)
            .await?
            .ok_or(CoreError::OutletNotFound(input.outlet_id))?;
        if !outlet.is_active {
            return Err(CoreError::OutletInactive(outlet.id).into());
        }

        let customer = UserRepository::new(&mut tx)
            .customer_by_user(user_id)
            .await?
            .ok_or(CoreError::CustomerNotFound)?;

        // ---------------------------------------------------------------------
        // Pricing
        // ---------------------------------------------------------------------
        let product_ids: Vec<i64> = input.items.iter().map(|l| l.product_id).collect();
        let products = ProductRepository::new(&mut tx).get_many(&product_ids).await?;

        let mut pricing_lines = Vec::with_capacity(input.items.len());
        for line in &input.items {
            let product = products
                .iter()
                .find(|p| p.id == line.product_id)
                .ok_or(CoreError::ProductNotFound(line.product_id))?;
            if product.outlet_id != outlet.id {
                return Err(CoreError::ProductWrongOutlet {
                    product_id: product.id,
                    outlet_id: outlet.id,
                }
                .into());
            }
            pricing_lines.push(PricingLine {
                product_id: product.id,
                name: product.name.clone(),
                quantity: line.quantity,
                unit_price: product.price(),
                company_paid: product.company_paid,
            });
        }

        let quota_used = QuotaRepository::new(&mut tx).used(user_id, today).await?;
        let priced = price_cart(&pricing_lines, quota_used);
        let original_total = priced.breakdown.original_total();

        // ---------------------------------------------------------------------
        // Coupon
        // ---------------------------------------------------------------------
        let mut applied_coupon = None;
        let mut discount = Money::zero();
        if let Some(code) = coupon_code.as_deref() {
            let mut coupons = CouponRepository::new(&mut tx);
            let found = coupons.get_by_code(code).await?;
            let already_used = match &found {
                Some(c) => coupons.has_usage(user_id, c.id).await?,
                None => false,
            };
            discount = coupon::evaluate(
                found.as_ref(),
                &CouponContext {
                    now,
                    outlet_id: outlet.id,
                    already_used_by_user: already_used,
                    cart_total: original_total,
                },
            )?;
            applied_coupon = found;
        }

        let totals = OrderTotals::new(original_total, discount);
        if let Some(client_total) = input.client_total {
            if client_total != totals.final_total {
                warn!(
                    user_id,
                    client_total = %client_total,
                    server_total = %totals.final_total,
                    "Client total differs from computed total; using computed total"
                );
            }
        }

        // ---------------------------------------------------------------------
        // Settlement checks
        // ---------------------------------------------------------------------
        let gateway_payment_id =
            verify_online_payment(input.payment_method, input.payment_details.as_ref(), self.verifier())?;

        let wallet = if input.payment_method == PaymentMethod::Wallet {
            let wallet = WalletRepository::new(&mut tx)
                .get_by_customer(customer.id)
                .await?
                .ok_or(CoreError::WalletNotFound)?;
            check_wallet_balance(wallet.balance(), totals.final_total)?;
            Some(wallet)
        } else {
            None
        };

        // ---------------------------------------------------------------------
        // Writes
        // ---------------------------------------------------------------------
        let stock_updates = stock::deduct_all(&mut tx, outlet.id, &input.items).await?;

        if priced.quota.total_free > 0
            && !QuotaRepository::new(&mut tx)
                .consume(user_id, today, quota_used, priced.quota.total_free)
                .await?
        {
            return Err(CoreError::ConcurrentUpdate { entity: "quota" }.into());
        }

        let order = OrderRepository::new(&mut tx)
            .insert(&NewOrder {
                customer_id: Some(customer.id),
                outlet_id: outlet.id,
                total_amount: totals.final_total,
                coupon_discount: totals.coupon_discount,
                payment_method: input.payment_method,
                status: OrderStatus::Pending,
                order_type: OrderType::App,
                delivery_date: Some(delivery_date),
                delivery_slot: Some(input.delivery_slot),
                is_pre_order,
                razorpay_payment_id: gateway_payment_id,
                delivered_at: None,
            })
            .await?;

        for line in &priced.lines {
            OrderRepository::new(&mut tx)
                .insert_item(
                    order.id,
                    &NewOrderItem {
                        product_id: line.product_id,
                        quantity: line.quantity,
                        unit_price: line.unit_price,
                        free_quantity: line.free_quantity,
                        status: OrderItemStatus::NotDelivered,
                    },
                )
                .await?;
        }

        let wallet_transaction = match &wallet {
            Some(wallet) => {
                Some(settlement::debit_for_order(&mut tx, wallet, totals.final_total, &order.order_number()).await?)
            }
            None => None,
        };

        let cleared = CartRepository::new(&mut tx).clear(customer.id).await?;
        debug!(customer_id = customer.id, cleared, "Cart consumed");

        if let Some(coupon) = &applied_coupon {
            let mut coupons = CouponRepository::new(&mut tx);
            coupons
                .insert_usage(coupon.id, order.id, user_id, totals.coupon_discount)
                .await
                .map_err(|e| match e {
                    DbError::UniqueViolation(_) => OrderError::Core(CoreError::CouponAlreadyUsed),
                    other => other.into(),
                })?;
            if !coupons.increment_used(coupon.id).await? {
                return Err(CoreError::CouponLimitReached.into());
            }
        }

        UserRepository::new(&mut tx).increment_order_count(customer.id).await?;

        let order_id = order.id;
        let details = load_details(&mut tx, vec![order])
            .await?
            .pop()
            .ok_or(CoreError::OrderNotFound(order_id))?;

        tx.commit().await?;

        info!(
            order_id = details.order.id,
            user_id,
            outlet_id = outlet.id,
            total = %totals.final_total,
            free_units = priced.quota.total_free,
            coupon = applied_coupon.as_ref().map(|c| c.code.as_str()).unwrap_or("-"),
            "Order placed"
        );

        Ok(PlacedOrder {
            details,
            breakdown: priced.breakdown,
            totals,
            wallet_transaction,
            stock_updates,
            quota: QuotaStatus::from_used(quota_used + priced.quota.total_free),
        })
    }

    /// Runs the coupon checks against a cart total without writing anything.
    pub async fn preview_coupon(
        &self,
        user_id: i64,
        code: &str,
        current_total: Money,
        outlet_id: i64,
    ) -> OrderResult<CouponPreview> {
        let code = validate_coupon_code(Some(code))?.ok_or_else(|| ValidationError::Required {
            field: "code".to_string(),
        })?;
        validate_id("outletId", outlet_id)?;
        if current_total.is_negative() {
            return Err(ValidationError::InvalidFormat {
                field: "currentTotal".to_string(),
                reason: "must not be negative".to_string(),
            }
            .into());
        }

        let mut conn = self.db().pool().acquire().await?;
        let mut coupons = CouponRepository::new(&mut conn);
        let found = coupons.get_by_code(&code).await?;
        let already_used = match &found {
            Some(c) => coupons.has_usage(user_id, c.id).await?,
            None => false,
        };

        let discount = coupon::evaluate(
            found.as_ref(),
            &CouponContext {
                now: Utc::now(),
                outlet_id,
                already_used_by_user: already_used,
                cart_total: current_total,
            },
        )?;
        let totals = OrderTotals::new(current_total, discount);

        debug!(user_id, code = %code, discount = %discount, "Coupon preview");
        Ok(CouponPreview {
            code,
            discount: totals.coupon_discount,
            total_after_discount: totals.final_total,
        })
    }

    /// Checks a gateway signature without placing anything.
    pub fn verify_gateway_payment(&self, details: &GatewayDetails) -> OrderResult<()> {
        verify_online_payment(PaymentMethod::Upi, Some(details), self.verifier())?;
        Ok(())
    }

    /// Today's quota for a user.
    pub async fn current_quota(&self, user_id: i64) -> OrderResult<QuotaStatus> {
        let today = self.business_day(Utc::now());
        let mut conn = self.db().pool().acquire().await?;
        let used = QuotaRepository::new(&mut conn).used(user_id, today).await?;
        Ok(QuotaStatus::from_used(used))
    }
}

/// Delivery date and pre-order flag for a requested date.
fn resolve_delivery_date(requested: Option<NaiveDate>, today: NaiveDate) -> Result<(NaiveDate, bool), ValidationError> {
    match requested {
        None => Ok((today, false)),
        Some(date) if date < today => Err(ValidationError::InvalidFormat {
            field: "requestedDeliveryDate".to_string(),
            reason: format!("must not be before {today}"),
        }),
        Some(date) => Ok((date, date > today)),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
