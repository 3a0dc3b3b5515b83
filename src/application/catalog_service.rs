use std::sync::Arc;

use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::media::{Upload, PRODUCT_FOLDER};
use crate::domain::ports::{MediaStore, ProductRepository};
use crate::domain::product::{Category, Product, ProductFilter, ProductForm, SizeBucket};

/// Most images accepted in a single product request.
pub const MAX_IMAGES_PER_REQUEST: usize = 5;

#[derive(Clone)]
pub struct CatalogService {
    repo: Arc<dyn ProductRepository>,
    media: Arc<dyn MediaStore>,
}

impl CatalogService {
    pub fn new(repo: Arc<dyn ProductRepository>, media: Arc<dyn MediaStore>) -> Self {
        Self { repo, media }
    }

    pub fn list_products(&self) -> Result<Vec<Product>, DomainError> {
        self.repo.list(ProductFilter::All)
    }

    pub fn list_featured(&self) -> Result<Vec<Product>, DomainError> {
        self.repo.list(ProductFilter::Featured)
    }

    pub fn list_by_category(&self, category: Category) -> Result<Vec<Product>, DomainError> {
        self.repo.list(ProductFilter::Category(category))
    }

    pub fn categories(&self) -> Vec<(Category, &'static [&'static str])> {
        Category::ALL
            .iter()
            .map(|c| (*c, c.subcategories()))
            .collect()
    }

    pub fn get_product(&self, id: Uuid) -> Result<Product, DomainError> {
        self.repo
            .find_by_id(id)?
            .ok_or_else(|| DomainError::NotFound("Product not found".to_string()))
    }

    /// Lookup used by checkout, where a missing product is not an error.
    pub fn find_product(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        self.repo.find_by_id(id)
    }

    pub fn decrement_stock(
        &self,
        id: Uuid,
        bucket: Option<SizeBucket>,
        amount: i32,
    ) -> Result<(), DomainError> {
        self.repo.decrement_stock(id, bucket, amount)
    }

    pub fn create_product(
        &self,
        form: ProductForm,
        uploads: Vec<Upload>,
    ) -> Result<Product, DomainError> {
        let stored = self.store_images(&uploads)?;
        let created = form
            .into_new_product(stored.clone())
            .and_then(|product| self.repo.create(product));
        match created {
            Ok(product) => {
                log::info!("Product created: {} ({})", product.title, product.id);
                Ok(product)
            }
            Err(e) => {
                self.discard_images(&stored);
                Err(e)
            }
        }
    }

    pub fn update_product(
        &self,
        id: Uuid,
        form: ProductForm,
        uploads: Vec<Upload>,
    ) -> Result<Product, DomainError> {
        let current = self.get_product(id)?;
        let stored = self.store_images(&uploads)?;

        let updated = form
            .into_changes(stored.clone())
            .and_then(|changes| self.repo.update(id, changes))
            .and_then(|updated| {
                updated.ok_or_else(|| DomainError::NotFound("Product not found".to_string()))
            });
        let updated = match updated {
            Ok(product) => product,
            Err(e) => {
                self.discard_images(&stored);
                return Err(e);
            }
        };

        let dropped: Vec<String> = current
            .images
            .into_iter()
            .filter(|url| !updated.images.contains(url))
            .collect();
        self.discard_images(&dropped);
        Ok(updated)
    }

    pub fn delete_product(&self, id: Uuid) -> Result<(), DomainError> {
        let product = self.get_product(id)?;
        self.discard_images(&product.images);
        if !self.repo.delete(id)? {
            return Err(DomainError::NotFound("Product not found".to_string()));
        }
        log::info!("Product deleted: {} ({})", product.title, product.id);
        Ok(())
    }

    fn store_images(&self, uploads: &[Upload]) -> Result<Vec<String>, DomainError> {
        if uploads.len() > MAX_IMAGES_PER_REQUEST {
            return Err(DomainError::Validation(format!(
                "At most {MAX_IMAGES_PER_REQUEST} images can be uploaded at once"
            )));
        }
        for upload in uploads {
            upload.ensure_image()?;
        }

        let mut stored = Vec::with_capacity(uploads.len());
        for upload in uploads {
            match self.media.store(PRODUCT_FOLDER, upload) {
                Ok(url) => stored.push(url),
                Err(e) => {
                    self.discard_images(&stored);
                    return Err(e);
                }
            }
        }
        Ok(stored)
    }

    /// Best-effort removal; failures are only logged.
    fn discard_images(&self, urls: &[String]) {
        for url in urls {
            if let Err(e) = self.media.delete(url) {
                log::warn!("Failed to delete image {url}: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::errors::DomainError;
    use crate::domain::product::{Category, ProductForm, SizeBucket};
    use crate::test_utils::{image_upload, necklace, sized_ring, TestContext};

    fn form(fields: &[(&str, &str)]) -> ProductForm {
        ProductForm::from_fields(fields.iter().map(|(k, v)| (*k, v.to_string())))
    }

    fn necklace_form() -> ProductForm {
        form(&[
            ("title", "Pearl Drop"),
            ("description", "Single pearl pendant"),
            ("price", "3200"),
            ("category", "Necklaces"),
            ("quantity", "4"),
            ("tags", "pearl, pendant"),
        ])
    }

    #[test]
    fn lists_newest_first_and_filters() {
        let ctx = TestContext::new();
        let first = ctx.products.insert(necklace(3));
        let second = ctx.products.insert(sized_ring(1, 1, 1));

        let all = ctx.catalog.list_products().unwrap();
        assert_eq!(
            all.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );

        let featured = ctx.catalog.list_featured().unwrap();
        assert_eq!(featured.len(), 1);
        assert_eq!(featured[0].id, first.id);

        let rings = ctx.catalog.list_by_category(Category::Rings).unwrap();
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].id, second.id);
    }

    #[test]
    fn get_product_reports_missing_products() {
        let ctx = TestContext::new();
        let err = ctx.catalog.get_product(uuid::Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, DomainError::NotFound(msg) if msg == "Product not found"));
    }

    #[test]
    fn create_stores_uploads_in_product_folder() {
        let ctx = TestContext::new();
        let product = ctx
            .catalog
            .create_product(necklace_form(), vec![image_upload("a.png"), image_upload("b.png")])
            .unwrap();

        assert_eq!(product.images.len(), 2);
        assert!(product.images.iter().all(|u| u.contains("/products/")));
        assert_eq!(product.tags, vec!["pearl", "pendant"]);
        assert_eq!(ctx.media.stored(), product.images);
    }

    #[test]
    fn create_without_images_is_rejected() {
        let ctx = TestContext::new();
        let err = ctx.catalog.create_product(necklace_form(), vec![]).unwrap_err();
        assert!(matches!(
            err,
            DomainError::Validation(msg) if msg == "At least one image is required"
        ));
    }

    #[test]
    fn create_rejects_non_images_before_storing() {
        let ctx = TestContext::new();
        let mut upload = image_upload("notes.txt");
        upload.content_type = "text/plain".to_string();

        let err = ctx.catalog.create_product(necklace_form(), vec![upload]).unwrap_err();

        assert!(matches!(
            err,
            DomainError::Validation(msg) if msg == "Only image files are allowed!"
        ));
        assert!(ctx.media.stored().is_empty());
    }

    #[test]
    fn create_rejects_more_than_five_images() {
        let ctx = TestContext::new();
        let uploads = (0..6).map(|i| image_upload(&format!("{i}.png"))).collect();
        let err = ctx.catalog.create_product(necklace_form(), uploads).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(ctx.media.stored().is_empty());
    }

    #[test]
    fn failed_create_discards_uploaded_images() {
        let ctx = TestContext::new();
        let invalid = form(&[
            ("title", "Pearl Drop"),
            ("description", "Single pearl pendant"),
            ("price", "-1"),
            ("category", "Necklaces"),
            ("quantity", "4"),
        ]);

        assert!(ctx.catalog.create_product(invalid, vec![image_upload("a.png")]).is_err());
        assert_eq!(ctx.media.stored().len(), 1);
        assert_eq!(ctx.media.deleted(), ctx.media.stored());
    }

    #[test]
    fn sized_ring_needs_no_quantity() {
        let ctx = TestContext::new();
        let ring = form(&[
            ("title", "Moon Ring"),
            ("description", "Band"),
            ("price", "1500"),
            ("category", "Rings"),
            ("isAdjustable", "false"),
            ("sizedStock", r#"{"small":2,"medium":0,"large":5}"#),
        ]);
        let product = ctx.catalog.create_product(ring, vec![image_upload("r.png")]).unwrap();
        assert!(product.is_sized_ring());
        assert_eq!(product.total_stock(), 7);
    }

    #[test]
    fn update_replaces_images_and_drops_unused_ones() {
        let ctx = TestContext::new();
        let mut seed = necklace(2);
        seed.images = vec![
            "http://media.test/products/keep.jpg".to_string(),
            "http://media.test/products/drop.jpg".to_string(),
        ];
        let product = ctx.products.insert(seed);

        let changes = form(&[
            ("existingImages", "http://media.test/products/keep.jpg"),
            ("price", "2750"),
        ]);
        let updated = ctx
            .catalog
            .update_product(product.id, changes, vec![image_upload("new.png")])
            .unwrap();

        assert_eq!(updated.images.len(), 2);
        assert_eq!(updated.images[0], "http://media.test/products/keep.jpg");
        assert_eq!(updated.price, bigdecimal::BigDecimal::from(2750));
        assert_eq!(ctx.media.deleted(), vec!["http://media.test/products/drop.jpg"]);
    }

    #[test]
    fn update_without_images_keeps_stored_list() {
        let ctx = TestContext::new();
        let product = ctx.products.insert(necklace(2));
        let updated = ctx
            .catalog
            .update_product(product.id, form(&[("title", "Renamed")]), vec![])
            .unwrap();
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.images, product.images);
        assert!(ctx.media.deleted().is_empty());
    }

    #[test]
    fn update_of_missing_product_is_not_found() {
        let ctx = TestContext::new();
        let err = ctx
            .catalog
            .update_product(uuid::Uuid::new_v4(), form(&[("title", "x")]), vec![])
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn delete_removes_images_even_when_cleanup_fails() {
        let ctx = TestContext::new();
        let product = ctx.products.insert(necklace(2));
        ctx.media.fail_deletes();

        ctx.catalog.delete_product(product.id).unwrap();

        assert!(ctx.products.get(product.id).is_none());
    }

    #[test]
    fn delete_cleans_up_images() {
        let ctx = TestContext::new();
        let product = ctx.products.insert(necklace(2));
        ctx.catalog.delete_product(product.id).unwrap();
        assert_eq!(ctx.media.deleted(), product.images);
    }

    #[test]
    fn decrement_is_clamped_at_zero() {
        let ctx = TestContext::new();
        let ring = ctx.products.insert(sized_ring(2, 0, 5));
        ctx.catalog
            .decrement_stock(ring.id, Some(SizeBucket::Small), 3)
            .unwrap();
        assert_eq!(ctx.products.get(ring.id).unwrap().sized_stock.small, 0);
    }

    #[test]
    fn categories_expose_suggested_subcategories() {
        let ctx = TestContext::new();
        let categories = ctx.catalog.categories();
        assert_eq!(categories.len(), 6);
        let (_, earrings) = categories
            .iter()
            .find(|(c, _)| *c == Category::Earrings)
            .unwrap();
        assert!(earrings.contains(&"Jhumkay"));
    }
}
