use std::collections::HashMap;

use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{
    Customer, NewOrder, Order, OrderItem, Payment, PaymentMethod, PaymentStatus, ShippingAddress,
    StatusHistoryEntry,
};
use crate::domain::ports::OrderRepository;
use crate::domain::product::Product;
use crate::schema::{order_items, order_status_history, orders, products};

use super::models::{
    NewOrderItemRow, NewOrderRow, NewStatusHistoryRow, OrderItemRow, OrderRow,
    OrderStatusChangeset, ProductRow, StatusHistoryRow,
};
use super::product_repo::into_products;
use super::stored;

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn history_row(order_id: Uuid, entry: &StatusHistoryEntry) -> NewStatusHistoryRow {
    NewStatusHistoryRow {
        order_id,
        status: entry.status.as_str().to_string(),
        description: entry.description.clone(),
        courier_company: entry.courier_company.clone(),
        recorded_at: entry.timestamp,
    }
}

/// Loads items, history and the live products they reference for `rows`,
/// keeping the order of `rows`.
fn load_orders(conn: &mut PgConnection, rows: Vec<OrderRow>) -> Result<Vec<Order>, DomainError> {
    let items = OrderItemRow::belonging_to(&rows)
        .select(OrderItemRow::as_select())
        .order(order_items::position.asc())
        .load(conn)?;
    let history = StatusHistoryRow::belonging_to(&rows)
        .select(StatusHistoryRow::as_select())
        .order(order_status_history::id.asc())
        .load(conn)?;

    let product_ids: Vec<Uuid> = items.iter().filter_map(|i| i.product_id).collect();
    let live: HashMap<Uuid, Product> = if product_ids.is_empty() {
        HashMap::new()
    } else {
        let rows = products::table
            .filter(products::id.eq_any(product_ids))
            .select(ProductRow::as_select())
            .load(conn)?;
        into_products(rows)?.into_iter().map(|p| (p.id, p)).collect()
    };

    let items = items.grouped_by(&rows);
    let history = history.grouped_by(&rows);
    rows.into_iter()
        .zip(items)
        .zip(history)
        .map(|((row, items), history)| assemble(row, items, history, &live))
        .collect()
}

fn assemble(
    row: OrderRow,
    items: Vec<OrderItemRow>,
    history: Vec<StatusHistoryRow>,
    live: &HashMap<Uuid, Product>,
) -> Result<Order, DomainError> {
    let method: PaymentMethod = stored("payment_method", &row.payment_method)?;
    let payment = match method {
        PaymentMethod::Cod => Payment::CashOnDelivery,
        PaymentMethod::BankTransfer => Payment::BankTransfer {
            selected_account: row.selected_account.unwrap_or_default(),
            details: row
                .payment_details
                .map(serde_json::from_value)
                .transpose()
                .map_err(|e| DomainError::Internal(format!("bad payment_details: {e}")))?
                .unwrap_or_default(),
            proof_url: row.transaction_proof,
        },
    };

    let status_history = history
        .into_iter()
        .map(|h| {
            Ok(StatusHistoryEntry {
                status: stored("status", &h.status)?,
                description: h.description,
                courier_company: h.courier_company,
                timestamp: h.recorded_at,
            })
        })
        .collect::<Result<Vec<_>, DomainError>>()?;

    Ok(Order {
        id: row.id,
        tracking_number: row.tracking_number,
        customer: Customer {
            name: row.customer_name,
            email: row.email,
            phone: row.phone,
        },
        shipping: ShippingAddress {
            street: row.shipping_address,
            city: row.city,
            province: stored("province", &row.province)?,
            country: row.country,
        },
        subtotal: row.subtotal,
        shipping_cost: row.shipping_cost,
        total_amount: row.total_amount,
        items: items
            .into_iter()
            .map(|i| OrderItem {
                product: i.product_id.and_then(|id| live.get(&id).cloned()),
                product_id: i.product_id,
                title: i.title,
                price: i.price,
                image: i.image,
                quantity: i.quantity,
                selected_size: i.selected_size,
            })
            .collect(),
        payment,
        payment_status: stored("payment_status", &row.payment_status)?,
        status: stored("status", &row.status)?,
        courier_company: row.courier_company,
        shipment_description: row.shipment_description,
        estimated_delivery: row.estimated_delivery,
        actual_delivery: row.actual_delivery,
        status_history,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn find_one(conn: &mut PgConnection, row: Option<OrderRow>) -> Result<Option<Order>, DomainError> {
    let Some(row) = row else {
        return Ok(None);
    };
    Ok(load_orders(conn, vec![row])?.pop())
}

impl OrderRepository for DieselOrderRepository {
    fn create(&self, order: NewOrder) -> Result<Order, DomainError> {
        let mut conn = self.pool.get()?;
        let order_id = Uuid::new_v4();

        conn.transaction::<_, DomainError, _>(|conn| {
            let (selected_account, payment_details, transaction_proof) = match &order.payment {
                Payment::CashOnDelivery => (None, None, None),
                Payment::BankTransfer {
                    selected_account,
                    details,
                    proof_url,
                } => (
                    Some(selected_account.clone()),
                    Some(
                        serde_json::to_value(details)
                            .map_err(|e| DomainError::Internal(e.to_string()))?,
                    ),
                    proof_url.clone(),
                ),
            };

            // 1. The order itself; the unique index rejects a reused tracking number.
            diesel::insert_into(orders::table)
                .values(&NewOrderRow {
                    id: order_id,
                    tracking_number: order.tracking_number.clone(),
                    customer_name: order.customer.name.clone(),
                    email: order.customer.email.clone(),
                    phone: order.customer.phone.clone(),
                    shipping_address: order.shipping.street.clone(),
                    city: order.shipping.city.clone(),
                    province: order.shipping.province.as_str().to_string(),
                    country: order.shipping.country.clone(),
                    subtotal: order.subtotal.clone(),
                    shipping_cost: order.shipping_cost.clone(),
                    total_amount: order.total_amount.clone(),
                    payment_method: order.payment.method().as_str().to_string(),
                    payment_status: order.payment_status.as_str().to_string(),
                    selected_account,
                    payment_details,
                    transaction_proof,
                    status: order.status.as_str().to_string(),
                })
                .execute(conn)?;

            // 2. Line items, in submission order.
            let items: Vec<NewOrderItemRow> = order
                .items
                .iter()
                .zip(0..)
                .map(|(item, position)| NewOrderItemRow {
                    id: Uuid::new_v4(),
                    order_id,
                    position,
                    product_id: item.product_id,
                    title: item.title.clone(),
                    price: item.price.clone(),
                    image: item.image.clone(),
                    quantity: item.quantity,
                    selected_size: item.selected_size.clone(),
                })
                .collect();
            diesel::insert_into(order_items::table)
                .values(&items)
                .execute(conn)?;

            // 3. First history entry.
            diesel::insert_into(order_status_history::table)
                .values(&history_row(order_id, &order.initial_history))
                .execute(conn)?;

            let row = orders::table
                .find(order_id)
                .select(OrderRow::as_select())
                .first(conn)
                .optional()?;
            find_one(conn, row)?
                .ok_or_else(|| DomainError::Internal("inserted order vanished".to_string()))
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = orders::table
            .find(id)
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;
        find_one(&mut conn, row)
    }

    fn find_by_tracking_number(&self, tracking_number: &str) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = orders::table
            .filter(orders::tracking_number.eq(tracking_number))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;
        find_one(&mut conn, row)
    }

    fn list(&self) -> Result<Vec<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let rows = orders::table
                .select(OrderRow::as_select())
                .order(orders::created_at.desc())
                .load(conn)?;
            load_orders(conn, rows)
        })
    }

    fn record_status_change(
        &self,
        order: &Order,
        entry: &StatusHistoryEntry,
    ) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let updated = diesel::update(orders::table.find(order.id))
                .set(&OrderStatusChangeset {
                    status: order.status.as_str().to_string(),
                    courier_company: order.courier_company.clone(),
                    shipment_description: order.shipment_description.clone(),
                    estimated_delivery: order.estimated_delivery,
                    actual_delivery: order.actual_delivery,
                    updated_at: order.updated_at,
                })
                .execute(conn)?;
            if updated == 0 {
                return Err(DomainError::NotFound("Order not found".to_string()));
            }

            diesel::insert_into(order_status_history::table)
                .values(&history_row(order.id, entry))
                .execute(conn)?;
            Ok(())
        })
    }

    fn update_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
    ) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = diesel::update(orders::table.find(id))
            .set((
                orders::payment_status.eq(status.as_str()),
                orders::updated_at.eq(Utc::now()),
            ))
            .returning(OrderRow::as_returning())
            .get_result(&mut conn)
            .optional()?;
        find_one(&mut conn, row)
    }

    fn ping(&self) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        diesel::sql_query("SELECT 1").execute(&mut conn)?;
        Ok(())
    }
}
