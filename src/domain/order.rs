use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::errors::DomainError;
use super::parse::check_len;
use super::product::Product;

/// Fulfilment status, in its usual order of progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub enum OrderStatus {
    Received,
    Processing,
    Shipping,
    Delivered,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Received => "Received",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipping => "Shipping",
            OrderStatus::Delivered => "Delivered",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Received" => Ok(OrderStatus::Received),
            "Processing" => Ok(OrderStatus::Processing),
            "Shipping" => Ok(OrderStatus::Shipping),
            "Delivered" => Ok(OrderStatus::Delivered),
            other => Err(DomainError::Validation(format!(
                "Invalid status '{other}' (expected Received, Processing, Shipping or Delivered)"
            ))),
        }
    }
}

/// Which status transitions the admin may perform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusPolicy {
    /// Any status may follow any other.
    #[default]
    Permissive,
    /// Status may stay put or move forward, never back.
    Forward,
}

impl StatusPolicy {
    pub fn allows(self, from: OrderStatus, to: OrderStatus) -> bool {
        match self {
            StatusPolicy::Permissive => true,
            StatusPolicy::Forward => to >= from,
        }
    }
}

impl FromStr for StatusPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive" => Ok(StatusPolicy::Permissive),
            "forward" => Ok(StatusPolicy::Forward),
            other => Err(DomainError::Validation(format!("Unknown status policy '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    BankTransfer,
    Cod,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Cod => "cod",
        }
    }

    /// Cash on delivery needs no manual verification.
    pub fn initial_payment_status(self) -> PaymentStatus {
        match self {
            PaymentMethod::BankTransfer => PaymentStatus::Pending,
            PaymentMethod::Cod => PaymentStatus::Verified,
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            "cod" => Ok(PaymentMethod::Cod),
            other => Err(DomainError::Validation(format!(
                "Invalid payment method '{other}' (expected bank_transfer or cod)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Verified,
    Rejected,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Verified => "verified",
            PaymentStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(PaymentStatus::Pending),
            "verified" => Ok(PaymentStatus::Verified),
            "rejected" => Ok(PaymentStatus::Rejected),
            _ => Err(DomainError::validation(
                "Valid payment status is required (pending, verified, rejected)",
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Province {
    Punjab,
    Sindh,
    Balochistan,
    Kpk,
    Gilgit,
    Islamabad,
}

/// Subtotal from which delivery is free.
pub const FREE_SHIPPING_THRESHOLD: i64 = 5000;

const COURIER_MAX: usize = 255;

impl Province {
    pub fn as_str(self) -> &'static str {
        match self {
            Province::Punjab => "punjab",
            Province::Sindh => "sindh",
            Province::Balochistan => "balochistan",
            Province::Kpk => "kpk",
            Province::Gilgit => "gilgit",
            Province::Islamabad => "islamabad",
        }
    }

    pub fn delivery_fee(self) -> i64 {
        match self {
            Province::Punjab => 250,
            Province::Sindh | Province::Kpk | Province::Islamabad => 300,
            Province::Balochistan => 350,
            Province::Gilgit => 380,
        }
    }

    pub fn shipping_quote(self, subtotal: &BigDecimal) -> BigDecimal {
        if *subtotal >= BigDecimal::from(FREE_SHIPPING_THRESHOLD) {
            BigDecimal::from(0)
        } else {
            BigDecimal::from(self.delivery_fee())
        }
    }
}

impl FromStr for Province {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "punjab" => Ok(Province::Punjab),
            "sindh" => Ok(Province::Sindh),
            "balochistan" => Ok(Province::Balochistan),
            "kpk" => Ok(Province::Kpk),
            "gilgit" => Ok(Province::Gilgit),
            "islamabad" => Ok(Province::Islamabad),
            other => Err(DomainError::Validation(format!("Invalid province '{other}'"))),
        }
    }
}

/// Bank account the customer transferred to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    #[serde(default)]
    pub account_name: Option<String>,
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub account_holder: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingAddress {
    pub street: String,
    pub city: String,
    pub province: Province,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payment {
    CashOnDelivery,
    BankTransfer {
        selected_account: String,
        details: PaymentDetails,
        proof_url: Option<String>,
    },
}

impl Payment {
    pub fn method(&self) -> PaymentMethod {
        match self {
            Payment::CashOnDelivery => PaymentMethod::Cod,
            Payment::BankTransfer { .. } => PaymentMethod::BankTransfer,
        }
    }
}

/// Line item frozen at order time.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    /// `None` when the item never referenced a catalog product.
    pub product_id: Option<Uuid>,
    pub title: String,
    pub price: BigDecimal,
    pub image: String,
    pub quantity: i32,
    pub selected_size: Option<String>,
    /// Live catalog product, joined at read time when the reference resolves.
    pub product: Option<Product>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusHistoryEntry {
    pub status: OrderStatus,
    pub description: String,
    pub courier_company: String,
    pub timestamp: DateTime<Utc>,
}

impl StatusHistoryEntry {
    pub fn order_placed(now: DateTime<Utc>) -> Self {
        StatusHistoryEntry {
            status: OrderStatus::Received,
            description: "Order placed successfully".to_string(),
            courier_company: String::new(),
            timestamp: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub tracking_number: String,
    pub customer: Customer,
    pub shipping: ShippingAddress,
    pub subtotal: BigDecimal,
    pub shipping_cost: BigDecimal,
    pub total_amount: BigDecimal,
    pub items: Vec<OrderItem>,
    pub payment: Payment,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub courier_company: String,
    pub shipment_description: String,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub actual_delivery: Option<DateTime<Utc>>,
    pub status_history: Vec<StatusHistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub status: OrderStatus,
    pub courier_company: Option<String>,
    pub shipment_description: Option<String>,
    pub estimated_delivery: Option<DateTime<Utc>>,
}

impl Order {
    /// Applies an admin status change and returns the history entry it produced.
    ///
    /// Courier and description are kept when the update omits them.
    /// `Delivered` stamps `actual_delivery`; other statuses leave it alone.
    pub fn apply_status_update(
        &mut self,
        update: StatusUpdate,
        policy: StatusPolicy,
        now: DateTime<Utc>,
    ) -> Result<StatusHistoryEntry, DomainError> {
        if !policy.allows(self.status, update.status) {
            return Err(DomainError::Validation(format!(
                "Cannot move order from {} back to {}",
                self.status, update.status
            )));
        }
        if let Some(courier) = &update.courier_company {
            check_len("courierCompany", courier.trim(), COURIER_MAX)?;
        }

        self.status = update.status;
        if let Some(courier) = update.courier_company {
            self.courier_company = courier.trim().to_string();
        }
        if let Some(description) = update.shipment_description {
            self.shipment_description = description.trim().to_string();
        }
        if let Some(eta) = update.estimated_delivery {
            self.estimated_delivery = Some(eta);
        }
        if update.status == OrderStatus::Delivered {
            self.actual_delivery = Some(now);
        }
        self.updated_at = now;

        let entry = StatusHistoryEntry {
            status: self.status,
            description: self.shipment_description.clone(),
            courier_company: self.courier_company.clone(),
            timestamp: now,
        };
        self.status_history.push(entry.clone());
        Ok(entry)
    }
}

/// Order ready to be persisted.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub tracking_number: String,
    pub customer: Customer,
    pub shipping: ShippingAddress,
    pub subtotal: BigDecimal,
    pub shipping_cost: BigDecimal,
    pub total_amount: BigDecimal,
    pub items: Vec<OrderItem>,
    pub payment: Payment,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub initial_history: StatusHistoryEntry,
}
