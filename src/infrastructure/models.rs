use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::schema::{order_items, order_status_history, orders, products, users};

// ── Products ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: BigDecimal,
    pub category: String,
    pub subcategory: String,
    pub images: Vec<String>,
    pub quantity: i32,
    pub is_adjustable: bool,
    pub sized_small: i32,
    pub sized_medium: i32,
    pub sized_large: i32,
    pub is_featured: bool,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = products)]
pub struct NewProductRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: BigDecimal,
    pub category: String,
    pub subcategory: String,
    pub images: Vec<String>,
    pub quantity: i32,
    pub is_adjustable: bool,
    pub sized_small: i32,
    pub sized_medium: i32,
    pub sized_large: i32,
    pub is_featured: bool,
    pub tags: Vec<String>,
}

/// `None` fields are left out of the UPDATE.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = products)]
pub struct ProductChangeset {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<BigDecimal>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub images: Option<Vec<String>>,
    pub quantity: Option<i32>,
    pub is_adjustable: Option<bool>,
    pub sized_small: Option<i32>,
    pub sized_medium: Option<i32>,
    pub sized_large: Option<i32>,
    pub is_featured: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub updated_at: DateTime<Utc>,
}

// ── Orders ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub tracking_number: String,
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub shipping_address: String,
    pub city: String,
    pub province: String,
    pub country: String,
    pub subtotal: BigDecimal,
    pub shipping_cost: BigDecimal,
    pub total_amount: BigDecimal,
    pub payment_method: String,
    pub payment_status: String,
    pub selected_account: Option<String>,
    pub payment_details: Option<Value>,
    pub transaction_proof: Option<String>,
    pub status: String,
    pub courier_company: String,
    pub shipment_description: String,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub actual_delivery: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow {
    pub id: Uuid,
    pub tracking_number: String,
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub shipping_address: String,
    pub city: String,
    pub province: String,
    pub country: String,
    pub subtotal: BigDecimal,
    pub shipping_cost: BigDecimal,
    pub total_amount: BigDecimal,
    pub payment_method: String,
    pub payment_status: String,
    pub selected_account: Option<String>,
    pub payment_details: Option<Value>,
    pub transaction_proof: Option<String>,
    pub status: String,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = orders)]
pub struct OrderStatusChangeset {
    pub status: String,
    pub courier_company: String,
    pub shipment_description: String,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub actual_delivery: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = order_items)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub position: i32,
    pub product_id: Option<Uuid>,
    pub title: String,
    pub price: BigDecimal,
    pub image: String,
    pub quantity: i32,
    pub selected_size: Option<String>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_items)]
pub struct NewOrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub position: i32,
    pub product_id: Option<Uuid>,
    pub title: String,
    pub price: BigDecimal,
    pub image: String,
    pub quantity: i32,
    pub selected_size: Option<String>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = order_status_history)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StatusHistoryRow {
    pub id: i64,
    pub order_id: Uuid,
    pub status: String,
    pub description: String,
    pub courier_company: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_status_history)]
pub struct NewStatusHistoryRow {
    pub order_id: Uuid,
    pub status: String,
    pub description: String,
    pub courier_company: String,
    pub recorded_at: DateTime<Utc>,
}

// ── Users ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}
