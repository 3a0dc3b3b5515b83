//! In-memory port implementations and fixtures for unit tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bigdecimal::BigDecimal;
use chrono::Utc;
use uuid::Uuid;

use crate::application::auth_service::AuthService;
use crate::application::catalog_service::CatalogService;
use crate::application::order_service::{OrderService, OrderSettings};
use crate::application::token::TokenSigner;
use crate::domain::errors::DomainError;
use crate::domain::media::Upload;
use crate::domain::order::{NewOrder, Order, PaymentStatus, StatusHistoryEntry};
use crate::domain::ports::{MediaStore, OrderRepository, ProductRepository, UserRepository};
use crate::domain::product::{
    Category, NewProduct, Product, ProductChanges, ProductFilter, SizeBucket, SizedStock,
};
use crate::domain::user::{NewUser, User};

pub const TEST_SECRET: &str = "test-secret-that-is-long-enough-for-hs256";

// ── Fixtures ──────────────────────────────────────────────────────────────────

pub fn necklace(quantity: i32) -> NewProduct {
    NewProduct {
        title: "Pearl Necklace".to_string(),
        description: "Freshwater pearls".to_string(),
        price: BigDecimal::from(2500),
        category: Category::Necklaces,
        subcategory: "Silver".to_string(),
        images: vec!["http://media.test/products/pearl.jpg".to_string()],
        quantity,
        is_adjustable: false,
        sized_stock: SizedStock::default(),
        is_featured: true,
        tags: vec!["pearl".to_string()],
    }
}

pub fn sized_ring(small: i32, medium: i32, large: i32) -> NewProduct {
    NewProduct {
        title: "Moon Ring".to_string(),
        description: "Sterling silver band".to_string(),
        price: BigDecimal::from(1500),
        category: Category::Rings,
        subcategory: "Silver".to_string(),
        images: vec!["http://media.test/products/moon.jpg".to_string()],
        quantity: 0,
        is_adjustable: false,
        sized_stock: SizedStock { small, medium, large },
        is_featured: false,
        tags: vec![],
    }
}

pub fn image_upload(name: &str) -> Upload {
    Upload {
        file_name: name.to_string(),
        content_type: "image/png".to_string(),
        bytes: vec![0x89, 0x50, 0x4e, 0x47],
    }
}

// ── Products ──────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryProducts {
    products: Mutex<Vec<Product>>,
    failing_decrements: Mutex<HashSet<Uuid>>,
}

impl InMemoryProducts {
    pub fn insert(&self, product: NewProduct) -> Product {
        self.create(product).expect("in-memory create")
    }

    pub fn get(&self, id: Uuid) -> Option<Product> {
        self.find_by_id(id).expect("in-memory find")
    }

    pub fn fail_decrements_for(&self, id: Uuid) {
        self.failing_decrements.lock().unwrap().insert(id);
    }
}

fn clamp_sub(value: &mut i32, amount: i32) {
    *value = (*value - amount).max(0);
}

impl ProductRepository for InMemoryProducts {
    fn list(&self, filter: ProductFilter) -> Result<Vec<Product>, DomainError> {
        let products = self.products.lock().unwrap();
        Ok(products
            .iter()
            .rev()
            .filter(|p| match filter {
                ProductFilter::All => true,
                ProductFilter::Featured => p.is_featured,
                ProductFilter::Category(c) => p.category == c,
            })
            .cloned()
            .collect())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        let products = self.products.lock().unwrap();
        Ok(products.iter().find(|p| p.id == id).cloned())
    }

    fn create(&self, p: NewProduct) -> Result<Product, DomainError> {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            title: p.title,
            description: p.description,
            price: p.price,
            category: p.category,
            subcategory: p.subcategory,
            images: p.images,
            quantity: p.quantity,
            is_adjustable: p.is_adjustable,
            sized_stock: p.sized_stock,
            is_featured: p.is_featured,
            tags: p.tags,
            created_at: now,
            updated_at: now,
        };
        self.products.lock().unwrap().push(product.clone());
        Ok(product)
    }

    fn update(&self, id: Uuid, c: ProductChanges) -> Result<Option<Product>, DomainError> {
        let mut products = self.products.lock().unwrap();
        let Some(p) = products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(v) = c.title {
            p.title = v;
        }
        if let Some(v) = c.description {
            p.description = v;
        }
        if let Some(v) = c.price {
            p.price = v;
        }
        if let Some(v) = c.category {
            p.category = v;
        }
        if let Some(v) = c.subcategory {
            p.subcategory = v;
        }
        if let Some(v) = c.images {
            p.images = v;
        }
        if let Some(v) = c.quantity {
            p.quantity = v;
        }
        if let Some(v) = c.is_adjustable {
            p.is_adjustable = v;
        }
        if let Some(v) = c.sized_stock {
            p.sized_stock = v;
        }
        if let Some(v) = c.is_featured {
            p.is_featured = v;
        }
        if let Some(v) = c.tags {
            p.tags = v;
        }
        p.updated_at = Utc::now();
        Ok(Some(p.clone()))
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut products = self.products.lock().unwrap();
        let before = products.len();
        products.retain(|p| p.id != id);
        Ok(products.len() != before)
    }

    fn decrement_stock(
        &self,
        id: Uuid,
        bucket: Option<SizeBucket>,
        amount: i32,
    ) -> Result<(), DomainError> {
        if self.failing_decrements.lock().unwrap().contains(&id) {
            return Err(DomainError::Internal("simulated decrement failure".to_string()));
        }
        let mut products = self.products.lock().unwrap();
        let p = products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| DomainError::NotFound("Product not found".to_string()))?;
        match bucket {
            Some(SizeBucket::Small) => clamp_sub(&mut p.sized_stock.small, amount),
            Some(SizeBucket::Medium) => clamp_sub(&mut p.sized_stock.medium, amount),
            Some(SizeBucket::Large) => clamp_sub(&mut p.sized_stock.large, amount),
            None => clamp_sub(&mut p.quantity, amount),
        }
        Ok(())
    }
}

// ── Orders ────────────────────────────────────────────────────────────────────

pub struct InMemoryOrders {
    orders: Mutex<Vec<Order>>,
    products: Arc<InMemoryProducts>,
    conflicts_to_raise: AtomicUsize,
    fail_creates: AtomicBool,
}

impl InMemoryOrders {
    pub fn new(products: Arc<InMemoryProducts>) -> Self {
        InMemoryOrders {
            orders: Mutex::new(Vec::new()),
            products,
            conflicts_to_raise: AtomicUsize::new(0),
            fail_creates: AtomicBool::new(false),
        }
    }

    /// The next `n` creates fail as if the tracking number already existed.
    pub fn raise_conflicts(&self, n: usize) {
        self.conflicts_to_raise.store(n, Ordering::SeqCst);
    }

    pub fn fail_creates(&self) {
        self.fail_creates.store(true, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.orders.lock().unwrap().len()
    }

    fn joined(&self, mut order: Order) -> Order {
        for item in &mut order.items {
            item.product = item.product_id.and_then(|id| self.products.get(id));
        }
        order
    }
}

impl OrderRepository for InMemoryOrders {
    fn create(&self, new: NewOrder) -> Result<Order, DomainError> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(DomainError::Internal("simulated insert failure".to_string()));
        }
        let pending = self.conflicts_to_raise.load(Ordering::SeqCst);
        if pending > 0 {
            self.conflicts_to_raise.store(pending - 1, Ordering::SeqCst);
            return Err(DomainError::Conflict("duplicate tracking number".to_string()));
        }
        let mut orders = self.orders.lock().unwrap();
        if orders.iter().any(|o| o.tracking_number == new.tracking_number) {
            return Err(DomainError::Conflict("duplicate tracking number".to_string()));
        }
        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            tracking_number: new.tracking_number,
            customer: new.customer,
            shipping: new.shipping,
            subtotal: new.subtotal,
            shipping_cost: new.shipping_cost,
            total_amount: new.total_amount,
            items: new.items,
            payment: new.payment,
            payment_status: new.payment_status,
            status: new.status,
            courier_company: String::new(),
            shipment_description: String::new(),
            estimated_delivery: None,
            actual_delivery: None,
            status_history: vec![new.initial_history],
            created_at: now,
            updated_at: now,
        };
        orders.push(order.clone());
        drop(orders);
        Ok(self.joined(order))
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        let found = self.orders.lock().unwrap().iter().find(|o| o.id == id).cloned();
        Ok(found.map(|o| self.joined(o)))
    }

    fn find_by_tracking_number(&self, tracking_number: &str) -> Result<Option<Order>, DomainError> {
        let found = self
            .orders
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.tracking_number == tracking_number)
            .cloned();
        Ok(found.map(|o| self.joined(o)))
    }

    fn list(&self) -> Result<Vec<Order>, DomainError> {
        let orders: Vec<Order> = self.orders.lock().unwrap().iter().rev().cloned().collect();
        Ok(orders.into_iter().map(|o| self.joined(o)).collect())
    }

    fn record_status_change(
        &self,
        order: &Order,
        entry: &StatusHistoryEntry,
    ) -> Result<(), DomainError> {
        let mut orders = self.orders.lock().unwrap();
        let stored = orders
            .iter_mut()
            .find(|o| o.id == order.id)
            .ok_or_else(|| DomainError::NotFound("Order not found".to_string()))?;
        stored.status = order.status;
        stored.courier_company = order.courier_company.clone();
        stored.shipment_description = order.shipment_description.clone();
        stored.estimated_delivery = order.estimated_delivery;
        stored.actual_delivery = order.actual_delivery;
        stored.updated_at = order.updated_at;
        stored.status_history.push(entry.clone());
        Ok(())
    }

    fn update_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
    ) -> Result<Option<Order>, DomainError> {
        let mut orders = self.orders.lock().unwrap();
        let Some(order) = orders.iter_mut().find(|o| o.id == id) else {
            return Ok(None);
        };
        order.payment_status = status;
        order.updated_at = Utc::now();
        let order = order.clone();
        drop(orders);
        Ok(Some(self.joined(order)))
    }

    fn ping(&self) -> Result<(), DomainError> {
        Ok(())
    }
}

// ── Users ─────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryUsers {
    users: Mutex<Vec<(User, String)>>,
}

impl UserRepository for InMemoryUsers {
    fn create(&self, new: NewUser) -> Result<User, DomainError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|(u, _)| u.email == new.email) {
            return Err(DomainError::Conflict("User already exists".to_string()));
        }
        let user = User {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            created_at: Utc::now(),
        };
        users.push((user.clone(), new.password_hash));
        Ok(user)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<(User, String)>, DomainError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|(u, _)| u.email == email).cloned())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|(u, _)| u.id == id).map(|(u, _)| u.clone()))
    }

    fn count(&self) -> Result<i64, DomainError> {
        Ok(self.users.lock().unwrap().len() as i64)
    }
}

// ── Media ─────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryMedia {
    stored: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
    fail_deletes: AtomicBool,
}

impl InMemoryMedia {
    pub fn stored(&self) -> Vec<String> {
        self.stored.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }
}

impl MediaStore for InMemoryMedia {
    fn store(&self, folder: &str, upload: &Upload) -> Result<String, DomainError> {
        let url = format!(
            "http://media.test/{folder}/{}.{}",
            Uuid::new_v4(),
            upload.extension()
        );
        self.stored.lock().unwrap().push(url.clone());
        Ok(url)
    }

    fn delete(&self, url: &str) -> Result<(), DomainError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(DomainError::Internal("simulated delete failure".to_string()));
        }
        self.deleted.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

// ── Wiring ────────────────────────────────────────────────────────────────────

/// Services over shared in-memory stores, with handles to inspect them.
pub struct TestContext {
    pub products: Arc<InMemoryProducts>,
    pub orders: Arc<InMemoryOrders>,
    pub users: Arc<InMemoryUsers>,
    pub media: Arc<InMemoryMedia>,
    pub catalog: CatalogService,
    pub order_service: OrderService,
    pub auth: AuthService,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_settings(OrderSettings::default())
    }

    pub fn with_settings(settings: OrderSettings) -> Self {
        let products = Arc::new(InMemoryProducts::default());
        let orders = Arc::new(InMemoryOrders::new(products.clone()));
        let users = Arc::new(InMemoryUsers::default());
        let media = Arc::new(InMemoryMedia::default());
        let catalog = CatalogService::new(products.clone(), media.clone());
        let order_service =
            OrderService::new(orders.clone(), catalog.clone(), media.clone(), settings);
        let auth = AuthService::new(
            users.clone(),
            TokenSigner::new(TEST_SECRET.as_bytes(), chrono::Duration::hours(3))
                .expect("valid key"),
            false,
        );
        TestContext {
            products,
            orders,
            users,
            media,
            catalog,
            order_service,
            auth,
        }
    }
}
