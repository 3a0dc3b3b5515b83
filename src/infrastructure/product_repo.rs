use chrono::Utc;
use diesel::prelude::*;
use diesel::sql_types::Integer;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::ProductRepository;
use crate::domain::product::{
    NewProduct, Product, ProductChanges, ProductFilter, SizeBucket, SizedStock,
};
use crate::schema::products;

use super::models::{NewProductRow, ProductChangeset, ProductRow};
use super::stored;

diesel::define_sql_function!(fn greatest(a: Integer, b: Integer) -> Integer);

impl TryFrom<ProductRow> for Product {
    type Error = DomainError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Product {
            id: row.id,
            category: stored("category", &row.category)?,
            title: row.title,
            description: row.description,
            price: row.price,
            subcategory: row.subcategory,
            images: row.images,
            quantity: row.quantity,
            is_adjustable: row.is_adjustable,
            sized_stock: SizedStock {
                small: row.sized_small,
                medium: row.sized_medium,
                large: row.sized_large,
            },
            is_featured: row.is_featured,
            tags: row.tags,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub(crate) fn into_products(rows: Vec<ProductRow>) -> Result<Vec<Product>, DomainError> {
    rows.into_iter().map(Product::try_from).collect()
}

pub struct DieselProductRepository {
    pool: DbPool,
}

impl DieselProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl ProductRepository for DieselProductRepository {
    fn list(&self, filter: ProductFilter) -> Result<Vec<Product>, DomainError> {
        let mut conn = self.pool.get()?;

        let mut query = products::table
            .select(ProductRow::as_select())
            .order(products::created_at.desc())
            .into_boxed();
        query = match filter {
            ProductFilter::All => query,
            ProductFilter::Featured => query.filter(products::is_featured.eq(true)),
            ProductFilter::Category(category) => {
                query.filter(products::category.eq(category.as_str()))
            }
        };

        into_products(query.load(&mut conn)?)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        let mut conn = self.pool.get()?;

        products::table
            .find(id)
            .select(ProductRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Product::try_from)
            .transpose()
    }

    fn create(&self, p: NewProduct) -> Result<Product, DomainError> {
        let mut conn = self.pool.get()?;

        let row = diesel::insert_into(products::table)
            .values(&NewProductRow {
                id: Uuid::new_v4(),
                title: p.title,
                description: p.description,
                price: p.price,
                category: p.category.as_str().to_string(),
                subcategory: p.subcategory,
                images: p.images,
                quantity: p.quantity,
                is_adjustable: p.is_adjustable,
                sized_small: p.sized_stock.small,
                sized_medium: p.sized_stock.medium,
                sized_large: p.sized_stock.large,
                is_featured: p.is_featured,
                tags: p.tags,
            })
            .returning(ProductRow::as_returning())
            .get_result(&mut conn)?;
        row.try_into()
    }

    fn update(&self, id: Uuid, c: ProductChanges) -> Result<Option<Product>, DomainError> {
        let mut conn = self.pool.get()?;

        let changeset = ProductChangeset {
            title: c.title,
            description: c.description,
            price: c.price,
            category: c.category.map(|cat| cat.as_str().to_string()),
            subcategory: c.subcategory,
            images: c.images,
            quantity: c.quantity,
            is_adjustable: c.is_adjustable,
            sized_small: c.sized_stock.map(|s| s.small),
            sized_medium: c.sized_stock.map(|s| s.medium),
            sized_large: c.sized_stock.map(|s| s.large),
            is_featured: c.is_featured,
            tags: c.tags,
            updated_at: Utc::now(),
        };
        diesel::update(products::table.find(id))
            .set(&changeset)
            .returning(ProductRow::as_returning())
            .get_result(&mut conn)
            .optional()?
            .map(Product::try_from)
            .transpose()
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        let deleted = diesel::delete(products::table.find(id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }

    fn decrement_stock(
        &self,
        id: Uuid,
        bucket: Option<SizeBucket>,
        amount: i32,
    ) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        let target = diesel::update(products::table.find(id));
        let now = Utc::now();

        // Each decrement is a single clamped statement, so concurrent
        // decrements never lose updates.
        let updated = match bucket {
            None => target
                .set((
                    products::quantity.eq(greatest(products::quantity - amount, 0)),
                    products::updated_at.eq(now),
                ))
                .execute(&mut conn)?,
            Some(SizeBucket::Small) => target
                .set((
                    products::sized_small.eq(greatest(products::sized_small - amount, 0)),
                    products::updated_at.eq(now),
                ))
                .execute(&mut conn)?,
            Some(SizeBucket::Medium) => target
                .set((
                    products::sized_medium.eq(greatest(products::sized_medium - amount, 0)),
                    products::updated_at.eq(now),
                ))
                .execute(&mut conn)?,
            Some(SizeBucket::Large) => target
                .set((
                    products::sized_large.eq(greatest(products::sized_large - amount, 0)),
                    products::updated_at.eq(now),
                ))
                .execute(&mut conn)?,
        };

        if updated == 0 {
            return Err(DomainError::NotFound("Product not found".to_string()));
        }
        Ok(())
    }
}
