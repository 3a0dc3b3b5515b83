use uuid::Uuid;

use super::errors::DomainError;
use super::media::Upload;
use super::order::{NewOrder, Order, PaymentStatus, StatusHistoryEntry};
use super::product::{NewProduct, Product, ProductChanges, ProductFilter, SizeBucket};
use super::user::{NewUser, User};

pub trait ProductRepository: Send + Sync + 'static {
    /// Newest first.
    fn list(&self, filter: ProductFilter) -> Result<Vec<Product>, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, DomainError>;
    fn create(&self, product: NewProduct) -> Result<Product, DomainError>;
    fn update(&self, id: Uuid, changes: ProductChanges) -> Result<Option<Product>, DomainError>;
    fn delete(&self, id: Uuid) -> Result<bool, DomainError>;
    /// Decrements `quantity`, or the given size bucket, by `amount`, clamped
    /// at zero in a single step. Fails with `NotFound` when the product is gone.
    fn decrement_stock(
        &self,
        id: Uuid,
        bucket: Option<SizeBucket>,
        amount: i32,
    ) -> Result<(), DomainError>;
}

pub trait OrderRepository: Send + Sync + 'static {
    /// Persists the order, its items and its first history entry together.
    /// A tracking-number collision fails with `Conflict`.
    fn create(&self, order: NewOrder) -> Result<Order, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError>;
    fn find_by_tracking_number(&self, tracking_number: &str)
        -> Result<Option<Order>, DomainError>;
    /// Newest first.
    fn list(&self) -> Result<Vec<Order>, DomainError>;
    /// Stores the status fields of `order` and appends `entry` to its history.
    fn record_status_change(
        &self,
        order: &Order,
        entry: &StatusHistoryEntry,
    ) -> Result<(), DomainError>;
    fn update_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
    ) -> Result<Option<Order>, DomainError>;
    fn ping(&self) -> Result<(), DomainError>;
}

pub trait UserRepository: Send + Sync + 'static {
    /// A duplicate email fails with `Conflict`.
    fn create(&self, user: NewUser) -> Result<User, DomainError>;
    /// Returns the user with their password hash.
    fn find_by_email(&self, email: &str) -> Result<Option<(User, String)>, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError>;
    fn count(&self) -> Result<i64, DomainError>;
}

/// Object storage for product images and payment proofs.
pub trait MediaStore: Send + Sync + 'static {
    /// Stores the upload under `folder` and returns its public URL.
    fn store(&self, folder: &str, upload: &Upload) -> Result<String, DomainError>;
    /// Removes a previously stored URL. URLs the store does not own are ignored.
    fn delete(&self, url: &str) -> Result<(), DomainError>;
}
