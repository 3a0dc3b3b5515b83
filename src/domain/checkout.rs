//! Decoding and validation of a checkout submission.

use bigdecimal::{BigDecimal, Zero};
use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;

use super::errors::DomainError;
use super::order::{Customer, PaymentDetails, PaymentMethod, Province, ShippingAddress};
use super::parse::{
    check_amount, check_len, decimal_from_value, int_from_value, json_from_value, non_blank,
};

const NAME_MAX: usize = 255;
const EMAIL_MAX: usize = 255;
const PHONE_MAX: usize = 50;
const PLACE_MAX: usize = 100;
const ACCOUNT_MAX: usize = 100;
const ITEM_TITLE_MAX: usize = 255;
const SIZE_MAX: usize = 20;
const PRODUCT_REF_MAX: usize = 100;

/// Checkout body as submitted by the storefront, either as JSON or as
/// multipart form fields. `orderItems` and `paymentDetails` may be
/// JSON-encoded strings; amounts may be numbers or numeric strings.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub customer_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub shipping_address: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub country: Option<String>,
    #[schema(value_type = Option<String>)]
    pub subtotal: Option<Value>,
    #[schema(value_type = Option<String>)]
    pub shipping_cost: Option<Value>,
    #[schema(value_type = Option<String>)]
    pub total_amount: Option<Value>,
    #[schema(value_type = Option<Vec<Object>>)]
    pub order_items: Option<Value>,
    pub payment_method: Option<String>,
    pub selected_account: Option<String>,
    #[schema(value_type = Option<PaymentDetails>)]
    pub payment_details: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawItem {
    #[serde(default)]
    product: Option<Value>,
    #[serde(default)]
    quantity: Option<Value>,
    #[serde(default)]
    selected_size: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    price: Option<Value>,
    #[serde(default)]
    image: Option<String>,
}

/// One requested line, before it is resolved against the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestedItem {
    /// Client-side product reference; may be anything.
    pub product_ref: String,
    pub quantity: i32,
    pub selected_size: Option<String>,
    pub title: Option<String>,
    pub price: Option<BigDecimal>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentChoice {
    CashOnDelivery,
    BankTransfer {
        selected_account: String,
        details: PaymentDetails,
    },
}

impl PaymentChoice {
    pub fn method(&self) -> PaymentMethod {
        match self {
            PaymentChoice::CashOnDelivery => PaymentMethod::Cod,
            PaymentChoice::BankTransfer { .. } => PaymentMethod::BankTransfer,
        }
    }
}

/// A checkout that passed field validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkout {
    pub customer: Customer,
    pub shipping: ShippingAddress,
    pub subtotal: BigDecimal,
    pub shipping_cost: BigDecimal,
    pub total_amount: BigDecimal,
    pub items: Vec<RequestedItem>,
    pub payment: PaymentChoice,
}

impl CheckoutRequest {
    pub fn validate(self) -> Result<Checkout, DomainError> {
        // JSON-encoded sub-payloads are decoded before anything else.
        let order_items = self.order_items.map(json_from_value).transpose()?;
        let payment_details = self
            .payment_details
            .filter(|v| !v.is_null() && v.as_str().map_or(true, |s| !s.trim().is_empty()))
            .map(json_from_value)
            .transpose()?;

        let subtotal = self
            .subtotal
            .as_ref()
            .map(|v| decimal_from_value("subtotal", v))
            .transpose()?
            .flatten();
        let total_amount = self
            .total_amount
            .as_ref()
            .map(|v| decimal_from_value("totalAmount", v))
            .transpose()?
            .flatten();
        let items_present = matches!(&order_items, Some(Value::Array(items)) if !items.is_empty());

        let required: [(&str, bool); 11] = [
            ("customerName", non_blank(self.customer_name.as_deref()).is_some()),
            ("email", non_blank(self.email.as_deref()).is_some()),
            ("phone", non_blank(self.phone.as_deref()).is_some()),
            ("shippingAddress", non_blank(self.shipping_address.as_deref()).is_some()),
            ("city", non_blank(self.city.as_deref()).is_some()),
            ("province", non_blank(self.province.as_deref()).is_some()),
            ("country", non_blank(self.country.as_deref()).is_some()),
            ("orderItems", items_present),
            ("subtotal", subtotal.is_some()),
            ("totalAmount", total_amount.is_some()),
            ("paymentMethod", non_blank(self.payment_method.as_deref()).is_some()),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, present)| !present)
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(DomainError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        for (name, value, max) in [
            ("customerName", &self.customer_name, NAME_MAX),
            ("email", &self.email, EMAIL_MAX),
            ("phone", &self.phone, PHONE_MAX),
            ("city", &self.city, PLACE_MAX),
            ("country", &self.country, PLACE_MAX),
        ] {
            check_len(name, value.as_deref().unwrap_or_default().trim(), max)?;
        }

        let method: PaymentMethod = self.payment_method.as_deref().unwrap_or_default().parse()?;
        let payment = match method {
            PaymentMethod::Cod => PaymentChoice::CashOnDelivery,
            PaymentMethod::BankTransfer => {
                let selected_account = non_blank(self.selected_account.as_deref())
                    .ok_or_else(|| {
                        DomainError::validation("Selected account is required for bank transfer")
                    })?
                    .to_string();
                check_len("selectedAccount", &selected_account, ACCOUNT_MAX)?;
                let details = payment_details.ok_or_else(|| {
                    DomainError::validation("Payment details are required for bank transfer")
                })?;
                let details: PaymentDetails = serde_json::from_value(details)
                    .map_err(|_| DomainError::validation("Invalid payment details"))?;
                PaymentChoice::BankTransfer {
                    selected_account,
                    details,
                }
            }
        };

        let shipping_cost = self
            .shipping_cost
            .as_ref()
            .map(|v| decimal_from_value("shippingCost", v))
            .transpose()?
            .flatten()
            .unwrap_or_else(BigDecimal::zero);

        // Presence was checked above.
        let subtotal = subtotal.unwrap_or_default();
        let total_amount = total_amount.unwrap_or_default();
        for (name, amount) in [
            ("subtotal", &subtotal),
            ("shippingCost", &shipping_cost),
            ("totalAmount", &total_amount),
        ] {
            if *amount < BigDecimal::zero() {
                return Err(DomainError::Validation(format!("{name} cannot be negative")));
            }
            check_amount(name, amount)?;
        }

        let items = match order_items {
            Some(Value::Array(items)) => items
                .into_iter()
                .map(parse_item)
                .collect::<Result<Vec<_>, _>>()?,
            _ => return Err(DomainError::validation("orderItems must be a list")),
        };

        Ok(Checkout {
            customer: Customer {
                name: owned(self.customer_name),
                email: owned(self.email),
                phone: owned(self.phone),
            },
            shipping: ShippingAddress {
                street: owned(self.shipping_address),
                city: owned(self.city),
                province: self.province.as_deref().unwrap_or_default().parse()?,
                country: owned(self.country),
            },
            subtotal,
            shipping_cost,
            total_amount,
            items,
            payment,
        })
    }
}

fn owned(value: Option<String>) -> String {
    value.unwrap_or_default().trim().to_string()
}

fn parse_item(value: Value) -> Result<RequestedItem, DomainError> {
    let raw: RawItem = serde_json::from_value(value)
        .map_err(|_| DomainError::validation("Invalid order item"))?;

    let quantity = raw
        .quantity
        .as_ref()
        .map(|v| int_from_value("quantity", v))
        .transpose()?
        .flatten()
        .ok_or_else(|| DomainError::validation("Each order item needs a quantity"))?;
    if quantity <= 0 {
        return Err(DomainError::validation("Order item quantity must be at least 1"));
    }

    let product_ref = match raw.product {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    check_len("Order item product", &product_ref, PRODUCT_REF_MAX)?;

    let selected_size = raw.selected_size.filter(|s| !s.trim().is_empty());
    if let Some(size) = &selected_size {
        check_len("Order item selectedSize", size, SIZE_MAX)?;
    }
    let title = raw.title.filter(|s| !s.trim().is_empty());
    if let Some(title) = &title {
        check_len("Order item title", title, ITEM_TITLE_MAX)?;
    }
    // A malformed fallback price is not worth rejecting the order over.
    let price = raw
        .price
        .as_ref()
        .and_then(|v| decimal_from_value("price", v).ok())
        .flatten();
    if let Some(price) = &price {
        check_amount("Order item price", price)?;
    }

    Ok(RequestedItem {
        product_ref,
        quantity,
        selected_size,
        title,
        price,
        image: raw.image,
    })
}
