//! # Payment Settlement Rules
//!
//! Pure checks for the four payment methods. Balance mutation happens in
//! canteen-db inside the order transaction; this module only decides.
//!
//! ## Settlement Paths
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  WALLET ──► check_wallet_balance(balance, final) ──► debit + DEDUCT row │
//! │                                                                         │
//! │  UPI/CARD ──► require_gateway_details ──► PaymentVerifier::verify       │
//! │               (all 3 fields present)      HMAC-SHA256(order|payment)    │
//! │                                              │                          │
//! │                                              ▼                          │
//! │                                gateway payment id stored on the order   │
//! │                                                                         │
//! │  CASH ──► already settled at the counter                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Signature Format
//! `hex(HMAC-SHA256(key = gateway secret, msg = "<order_id>|<payment_id>"))`,
//! compared in constant time.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::PaymentMethod;

type HmacSha256 = Hmac<Sha256>;

// =============================================================================
// Gateway Details
// =============================================================================

/// Gateway references sent by the client for UPI / CARD orders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GatewayDetails {
    #[serde(default, alias = "gatewayOrderId")]
    pub razorpay_order_id: String,
    #[serde(default, alias = "gatewayPaymentId")]
    pub razorpay_payment_id: String,
    #[serde(default, alias = "gatewaySignature")]
    pub razorpay_signature: String,
}

impl GatewayDetails {
    fn is_complete(&self) -> bool {
        !self.razorpay_order_id.trim().is_empty()
            && !self.razorpay_payment_id.trim().is_empty()
            && !self.razorpay_signature.trim().is_empty()
    }
}

// =============================================================================
// Verifier
// =============================================================================

/// Verifies an online-payment signature.
///
/// Injected into the ordering service so tests can substitute a fake.
pub trait PaymentVerifier: Send + Sync {
    fn verify(&self, gateway_order_id: &str, gateway_payment_id: &str, signature: &str) -> bool;
}

/// Production verifier: HMAC-SHA256 with the gateway secret.
#[derive(Clone)]
pub struct HmacSignatureVerifier {
    secret: Vec<u8>,
}

impl HmacSignatureVerifier {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        HmacSignatureVerifier {
            secret: secret.into(),
        }
    }
}

impl std::fmt::Debug for HmacSignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSignatureVerifier")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl PaymentVerifier for HmacSignatureVerifier {
    fn verify(&self, gateway_order_id: &str, gateway_payment_id: &str, signature: &str) -> bool {
        // An unconfigured secret must never accept anything.
        if self.secret.is_empty() {
            return false;
        }
        let Some(expected) = sign(&self.secret, gateway_order_id, gateway_payment_id) else {
            return false;
        };
        let provided = signature.trim().to_ascii_lowercase();
        expected.as_bytes().ct_eq(provided.as_bytes()).into()
    }
}

/// Hex signature the gateway would produce for this order/payment pair.
///
/// ## Example
/// ```rust
/// use canteen_core::payment::{sign, HmacSignatureVerifier, PaymentVerifier};
///
/// let signature = sign(b"secret", "order_1", "pay_1").unwrap();
/// assert!(HmacSignatureVerifier::new("secret").verify("order_1", "pay_1", &signature));
/// ```
pub fn sign(secret: &[u8], gateway_order_id: &str, gateway_payment_id: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(gateway_order_id.as_bytes());
    mac.update(b"|");
    mac.update(gateway_payment_id.as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

// =============================================================================
// Settlement Checks
// =============================================================================

/// Checks that the wallet covers the amount.
pub fn check_wallet_balance(balance: Money, required: Money) -> CoreResult<()> {
    if balance < required {
        return Err(CoreError::InsufficientBalance {
            available: balance,
            required,
        });
    }
    Ok(())
}

/// Validates and verifies gateway details for an online payment.
///
/// Returns the gateway payment id to record on the order, or `None` for
/// methods that do not go through the gateway.
pub fn verify_online_payment(
    method: PaymentMethod,
    details: Option<&GatewayDetails>,
    verifier: &dyn PaymentVerifier,
) -> CoreResult<Option<String>> {
    if !method.is_online() {
        return Ok(None);
    }

    let details = details
        .filter(|d| d.is_complete())
        .ok_or(CoreError::MissingPaymentDetails)?;

    if !verifier.verify(
        &details.razorpay_order_id,
        &details.razorpay_payment_id,
        &details.razorpay_signature,
    ) {
        return Err(CoreError::SignatureInvalid);
    }

    Ok(Some(details.razorpay_payment_id.clone()))
}

// =============================================================================
// Unit Tests
// =============================================================================
