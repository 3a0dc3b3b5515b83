use std::collections::HashMap;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::checkout::{Checkout, CheckoutRequest, PaymentChoice, RequestedItem};
use crate::domain::errors::DomainError;
use crate::domain::media::{Upload, PROOF_FOLDER};
use crate::domain::order::{
    NewOrder, Order, OrderItem, OrderStatus, Payment, PaymentStatus, Province, StatusHistoryEntry,
    StatusPolicy, StatusUpdate, FREE_SHIPPING_THRESHOLD,
};
use crate::domain::parse::{decimal_from_str, non_blank};
use crate::domain::ports::{MediaStore, OrderRepository};
use crate::domain::product::{Product, SizeBucket};
use crate::domain::tracking;

use super::catalog_service::CatalogService;

/// Inserts attempted before a tracking-number collision is reported.
pub const MAX_TRACKING_ATTEMPTS: usize = 5;

#[derive(Debug, Clone)]
pub struct OrderSettings {
    pub tracking_prefix: String,
    pub status_policy: StatusPolicy,
}

impl Default for OrderSettings {
    fn default() -> Self {
        OrderSettings {
            tracking_prefix: "AYOSI".to_string(),
            status_policy: StatusPolicy::default(),
        }
    }
}

/// Admin status change as submitted, before parsing.
#[derive(Debug, Clone, Default)]
pub struct StatusChange {
    pub status: Option<String>,
    pub courier_company: Option<String>,
    pub shipment_description: Option<String>,
    pub estimated_delivery: Option<String>,
}

impl StatusChange {
    fn into_update(self) -> Result<StatusUpdate, DomainError> {
        let status: OrderStatus = non_blank(self.status.as_deref())
            .ok_or_else(|| DomainError::validation("Status is required"))?
            .parse()?;
        let estimated_delivery = non_blank(self.estimated_delivery.as_deref())
            .map(parse_delivery_date)
            .transpose()?;
        Ok(StatusUpdate {
            status,
            courier_company: self.courier_company,
            shipment_description: self.shipment_description,
            estimated_delivery,
        })
    }
}

/// Accepts an RFC 3339 timestamp or a plain `YYYY-MM-DD` date (midnight UTC).
fn parse_delivery_date(raw: &str) -> Result<DateTime<Utc>, DomainError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| DomainError::Validation(format!("Invalid estimated delivery date '{raw}'")))
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShippingQuote {
    pub province: Province,
    pub subtotal: BigDecimal,
    pub shipping_cost: BigDecimal,
    pub free_shipping_threshold: BigDecimal,
}

/// A requested line after catalog resolution.
struct ResolvedLine {
    item: OrderItem,
    /// Set when the line references a live product.
    product: Option<Product>,
    bucket: Option<SizeBucket>,
}

#[derive(Clone)]
pub struct OrderService {
    repo: Arc<dyn OrderRepository>,
    catalog: CatalogService,
    media: Arc<dyn MediaStore>,
    settings: OrderSettings,
}

impl OrderService {
    pub fn new(
        repo: Arc<dyn OrderRepository>,
        catalog: CatalogService,
        media: Arc<dyn MediaStore>,
        settings: OrderSettings,
    ) -> Self {
        Self {
            repo,
            catalog,
            media,
            settings,
        }
    }

    /// Places an order. Validation and the stock check happen before anything
    /// is written; a failed check leaves both orders and stock untouched.
    pub fn create_order(
        &self,
        request: CheckoutRequest,
        proof: Option<Upload>,
    ) -> Result<Order, DomainError> {
        let checkout = request.validate()?;
        let proof = match checkout.payment {
            PaymentChoice::BankTransfer { .. } => proof,
            PaymentChoice::CashOnDelivery => None,
        };
        if let Some(upload) = &proof {
            upload.ensure_image()?;
        }

        let lines = self.resolve_items(&checkout.items)?;
        check_stock(&lines)?;

        let proof_url = proof
            .map(|upload| self.media.store(PROOF_FOLDER, &upload))
            .transpose()?;

        let order = match self.persist(checkout, &lines, proof_url.clone()) {
            Ok(order) => order,
            Err(e) => {
                if let Some(url) = proof_url {
                    if let Err(cleanup) = self.media.delete(&url) {
                        log::warn!("Failed to remove transaction proof {url}: {cleanup}");
                    }
                }
                return Err(e);
            }
        };

        self.decrement_stock(&lines);
        log::info!(
            "Order created: {} ({} items, total {})",
            order.tracking_number,
            order.items.len(),
            order.total_amount
        );

        // Re-read so the joined products reflect the decrements.
        Ok(match self.repo.find_by_id(order.id) {
            Ok(Some(fresh)) => fresh,
            _ => order,
        })
    }

    /// Numbers that could never have been issued are not looked up.
    pub fn get_by_tracking_number(&self, tracking_number: &str) -> Result<Order, DomainError> {
        let not_found =
            || DomainError::NotFound("Order not found with this tracking number".to_string());
        let tracking_number = tracking_number.trim();
        if !tracking::is_well_formed(tracking_number) {
            return Err(not_found());
        }
        self.repo
            .find_by_tracking_number(tracking_number)?
            .ok_or_else(not_found)
    }

    pub fn get_order(&self, id: Uuid) -> Result<Order, DomainError> {
        self.repo
            .find_by_id(id)?
            .ok_or_else(|| DomainError::NotFound("Order not found".to_string()))
    }

    pub fn list_orders(&self) -> Result<Vec<Order>, DomainError> {
        self.repo.list()
    }

    pub fn update_status(&self, id: Uuid, change: StatusChange) -> Result<Order, DomainError> {
        let update = change.into_update()?;
        let mut order = self.get_order(id)?;
        let entry = order.apply_status_update(update, self.settings.status_policy, Utc::now())?;
        self.repo.record_status_change(&order, &entry)?;
        log::info!("Order {} moved to {}", order.tracking_number, order.status);
        Ok(order)
    }

    pub fn update_payment_status(
        &self,
        id: Uuid,
        payment_status: Option<&str>,
    ) -> Result<Order, DomainError> {
        let status: PaymentStatus = payment_status.unwrap_or_default().parse()?;
        let order = self
            .repo
            .update_payment_status(id, status)?
            .ok_or_else(|| DomainError::NotFound("Order not found".to_string()))?;
        log::info!("Order {} payment marked {}", order.tracking_number, status.as_str());
        Ok(order)
    }

    pub fn shipping_quote(
        &self,
        province: Option<&str>,
        subtotal: Option<&str>,
    ) -> Result<ShippingQuote, DomainError> {
        let province: Province = non_blank(province)
            .ok_or_else(|| DomainError::validation("province is required"))?
            .parse()?;
        let subtotal = non_blank(subtotal)
            .map(|raw| decimal_from_str("subtotal", raw))
            .transpose()?
            .unwrap_or_default();
        Ok(ShippingQuote {
            province,
            shipping_cost: province.shipping_quote(&subtotal),
            subtotal,
            free_shipping_threshold: BigDecimal::from(FREE_SHIPPING_THRESHOLD),
        })
    }

    pub fn ping(&self) -> Result<(), DomainError> {
        self.repo.ping()
    }

    fn resolve_items(&self, items: &[RequestedItem]) -> Result<Vec<ResolvedLine>, DomainError> {
        let mut cache: HashMap<Uuid, Option<Product>> = HashMap::new();
        let mut lines = Vec::with_capacity(items.len());

        for requested in items {
            let product = match Uuid::parse_str(&requested.product_ref) {
                Ok(id) => {
                    if !cache.contains_key(&id) {
                        let found = self.catalog.find_product(id).unwrap_or_else(|e| {
                            log::warn!(
                                "Product lookup for {id} failed, keeping client snapshot: {e}"
                            );
                            None
                        });
                        cache.insert(id, found);
                    }
                    cache.get(&id).cloned().flatten()
                }
                Err(_) => None,
            };

            let line = match product {
                Some(product) => resolve_live(requested, product)?,
                None => ResolvedLine {
                    item: OrderItem {
                        product_id: None,
                        title: requested
                            .title
                            .clone()
                            .unwrap_or_else(|| format!("Product {}", requested.product_ref)),
                        price: requested.price.clone().unwrap_or_default(),
                        image: requested.image.clone().unwrap_or_default(),
                        quantity: requested.quantity,
                        selected_size: requested.selected_size.clone(),
                        product: None,
                    },
                    product: None,
                    bucket: None,
                },
            };
            lines.push(line);
        }
        Ok(lines)
    }

    fn persist(
        &self,
        checkout: Checkout,
        lines: &[ResolvedLine],
        proof_url: Option<String>,
    ) -> Result<Order, DomainError> {
        let payment = match checkout.payment {
            PaymentChoice::CashOnDelivery => Payment::CashOnDelivery,
            PaymentChoice::BankTransfer {
                selected_account,
                details,
            } => Payment::BankTransfer {
                selected_account,
                details,
                proof_url,
            },
        };
        let now = Utc::now();
        let mut new_order = NewOrder {
            tracking_number: String::new(),
            customer: checkout.customer,
            shipping: checkout.shipping,
            subtotal: checkout.subtotal,
            shipping_cost: checkout.shipping_cost,
            total_amount: checkout.total_amount,
            items: lines.iter().map(|l| l.item.clone()).collect(),
            payment_status: payment.method().initial_payment_status(),
            payment,
            status: OrderStatus::Received,
            initial_history: StatusHistoryEntry::order_placed(now),
        };

        let mut rng = rand::rng();
        let mut attempt = 1;
        loop {
            new_order.tracking_number =
                tracking::generate(&self.settings.tracking_prefix, Utc::now(), &mut rng);
            match self.repo.create(new_order.clone()) {
                Err(DomainError::Conflict(msg)) if attempt < MAX_TRACKING_ATTEMPTS => {
                    log::warn!(
                        "Tracking number {} already taken ({msg}), retrying",
                        new_order.tracking_number
                    );
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Best-effort: the order already exists, so failures are only logged.
    fn decrement_stock(&self, lines: &[ResolvedLine]) {
        for line in lines {
            let Some(product) = &line.product else {
                continue;
            };
            match self
                .catalog
                .decrement_stock(product.id, line.bucket, line.item.quantity)
            {
                Ok(()) => log::info!(
                    "Stock updated for {}{}: -{}",
                    product.title,
                    line.bucket
                        .map(|b| format!(" ({})", b.as_str()))
                        .unwrap_or_default(),
                    line.item.quantity
                ),
                Err(e) => log::warn!("Failed to update stock for {}: {e}", product.id),
            }
        }
    }
}

fn resolve_live(requested: &RequestedItem, product: Product) -> Result<ResolvedLine, DomainError> {
    let bucket = if product.is_sized_ring() {
        let size = requested.selected_size.as_deref().ok_or_else(|| {
            DomainError::Validation(format!("Please select a ring size for {}", product.title))
        })?;
        Some(SizeBucket::from_token(size).ok_or_else(|| {
            DomainError::Validation(format!("Invalid ring size '{size}' for {}", product.title))
        })?)
    } else {
        None
    };

    Ok(ResolvedLine {
        item: OrderItem {
            product_id: Some(product.id),
            title: product.title.clone(),
            price: product.price.clone(),
            image: product.primary_image().to_string(),
            quantity: requested.quantity,
            selected_size: requested.selected_size.clone(),
            product: None,
        },
        product: Some(product),
        bucket,
    })
}

/// Sums requests per product and size bucket, then fails on the first
/// shortfall in request order.
fn check_stock(lines: &[ResolvedLine]) -> Result<(), DomainError> {
    let mut demand: Vec<((Uuid, Option<SizeBucket>), i64, &ResolvedLine)> = Vec::new();
    for line in lines {
        let Some(product) = &line.product else {
            continue;
        };
        let key = (product.id, line.bucket);
        match demand.iter_mut().find(|(k, _, _)| *k == key) {
            Some((_, total, _)) => *total += i64::from(line.item.quantity),
            None => demand.push((key, i64::from(line.item.quantity), line)),
        }
    }

    for (_, requested, line) in demand {
        let Some(product) = &line.product else {
            continue;
        };
        let available = product.available(line.bucket);
        if requested > i64::from(available) {
            return Err(DomainError::InsufficientStock {
                product: product.title.clone(),
                size: line.bucket.and(line.item.selected_size.clone()),
                available,
            });
        }
    }
    Ok(())
}
