use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use super::errors::DomainError;
use super::parse::{
    bool_from_str, check_amount, check_len, decimal_from_str, int_from_str, json_from_value,
    non_blank,
};

const TITLE_MAX: usize = 255;
const SUBCATEGORY_MAX: usize = 100;
const MAX_STOCK: i32 = i32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Category {
    Rings,
    Necklaces,
    Bracelets,
    Earrings,
    #[serde(rename = "Jewellery Box")]
    JewelleryBox,
    Accessories,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Rings,
        Category::Necklaces,
        Category::Bracelets,
        Category::Earrings,
        Category::JewelleryBox,
        Category::Accessories,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Rings => "Rings",
            Category::Necklaces => "Necklaces",
            Category::Bracelets => "Bracelets",
            Category::Earrings => "Earrings",
            Category::JewelleryBox => "Jewellery Box",
            Category::Accessories => "Accessories",
        }
    }

    /// Suggested subcategories shown by the admin UI. Not enforced.
    pub fn subcategories(self) -> &'static [&'static str] {
        match self {
            Category::Rings | Category::Necklaces => &["Golden", "Silver"],
            Category::Bracelets => &["Golden", "Silver", "Arm Cuffs"],
            Category::Earrings => &["Golden", "Silver", "Jhumkay"],
            Category::JewelleryBox => &["Box", "Gift Boxes"],
            Category::Accessories => &[],
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DomainError::Validation(format!("Unknown category '{s}'")))
    }
}

/// Stock bucket of a sized ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SizeBucket {
    Small,
    Medium,
    Large,
}

impl SizeBucket {
    /// Maps a ring-size token (`5-6`, `7-8`, `9-10`) or a bucket name to its bucket.
    pub fn from_token(token: &str) -> Option<SizeBucket> {
        match token.trim().to_ascii_lowercase().as_str() {
            "5-6" | "small" => Some(SizeBucket::Small),
            "7-8" | "medium" => Some(SizeBucket::Medium),
            "9-10" | "large" => Some(SizeBucket::Large),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SizeBucket::Small => "small",
            SizeBucket::Medium => "medium",
            SizeBucket::Large => "large",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SizedStock {
    #[serde(default)]
    pub small: i32,
    #[serde(default)]
    pub medium: i32,
    #[serde(default)]
    pub large: i32,
}

impl SizedStock {
    pub fn get(&self, bucket: SizeBucket) -> i32 {
        match bucket {
            SizeBucket::Small => self.small,
            SizeBucket::Medium => self.medium,
            SizeBucket::Large => self.large,
        }
    }

    /// Saturates at `i32::MAX`; validated stock never gets there.
    pub fn total(&self) -> i32 {
        self.small.saturating_add(self.medium).saturating_add(self.large)
    }

    fn validate(&self) -> Result<(), DomainError> {
        if self.small < 0 || self.medium < 0 || self.large < 0 {
            return Err(DomainError::validation("sizedStock values cannot be negative"));
        }
        let total = i64::from(self.small) + i64::from(self.medium) + i64::from(self.large);
        if total > i64::from(MAX_STOCK) {
            return Err(DomainError::Validation(format!(
                "sizedStock cannot exceed {MAX_STOCK} items in total"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: BigDecimal,
    pub category: Category,
    pub subcategory: String,
    pub images: Vec<String>,
    pub quantity: i32,
    pub is_adjustable: bool,
    pub sized_stock: SizedStock,
    pub is_featured: bool,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// A ring whose stock is tracked per size bucket.
    pub fn is_sized_ring(&self) -> bool {
        is_sized_ring(self.category, self.is_adjustable)
    }

    pub fn total_stock(&self) -> i32 {
        if self.is_sized_ring() {
            self.sized_stock.total()
        } else {
            self.quantity
        }
    }

    /// Units available for the given bucket. The bucket is ignored for
    /// products that are not sized rings.
    pub fn available(&self, bucket: Option<SizeBucket>) -> i32 {
        match bucket {
            Some(bucket) if self.is_sized_ring() => self.sized_stock.get(bucket),
            _ => self.quantity,
        }
    }

    pub fn primary_image(&self) -> &str {
        self.images.first().map(String::as_str).unwrap_or_default()
    }
}

fn is_sized_ring(category: Category, is_adjustable: bool) -> bool {
    category == Category::Rings && !is_adjustable
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub title: String,
    pub description: String,
    pub price: BigDecimal,
    pub category: Category,
    pub subcategory: String,
    pub images: Vec<String>,
    pub quantity: i32,
    pub is_adjustable: bool,
    pub sized_stock: SizedStock,
    pub is_featured: bool,
    pub tags: Vec<String>,
}

/// Partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<BigDecimal>,
    pub category: Option<Category>,
    pub subcategory: Option<String>,
    pub images: Option<Vec<String>>,
    pub quantity: Option<i32>,
    pub is_adjustable: Option<bool>,
    pub sized_stock: Option<SizedStock>,
    pub is_featured: Option<bool>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductFilter {
    All,
    Featured,
    Category(Category),
}

/// Raw product fields as submitted by the admin form.
#[derive(Debug, Clone, Default)]
pub struct ProductForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub quantity: Option<String>,
    pub is_adjustable: Option<String>,
    pub sized_stock: Option<String>,
    pub is_featured: Option<String>,
    pub tags: Option<String>,
    pub existing_images: Vec<String>,
}

impl ProductForm {
    /// Builds a form from `(name, value)` pairs. Unknown names are ignored;
    /// `existingImages` may repeat.
    pub fn from_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut form = ProductForm::default();
        for (name, value) in fields {
            let value = value.into();
            match name.as_ref() {
                "title" => form.title = Some(value),
                "description" => form.description = Some(value),
                "price" => form.price = Some(value),
                "category" => form.category = Some(value),
                "subcategory" => form.subcategory = Some(value),
                "quantity" => form.quantity = Some(value),
                "isAdjustable" => form.is_adjustable = Some(value),
                "sizedStock" => form.sized_stock = Some(value),
                "isFeatured" => form.is_featured = Some(value),
                "tags" => form.tags = Some(value),
                "existingImages" | "existingImages[]" => {
                    if !value.trim().is_empty() {
                        form.existing_images.push(value)
                    }
                }
                _ => {}
            }
        }
        form
    }

    pub fn into_new_product(self, images: Vec<String>) -> Result<NewProduct, DomainError> {
        let title = non_blank(self.title.as_deref());
        let description = non_blank(self.description.as_deref());
        let price = non_blank(self.price.as_deref());
        let category = non_blank(self.category.as_deref());
        let (Some(title), Some(description), Some(price), Some(category)) =
            (title, description, price, category)
        else {
            return Err(DomainError::validation(
                "Missing required fields: title, description, price, category",
            ));
        };

        let mut images: Vec<String> = self.existing_images.into_iter().chain(images).collect();
        images.retain(|url| !url.trim().is_empty());
        if images.is_empty() {
            return Err(DomainError::validation("At least one image is required"));
        }

        check_len("title", title, TITLE_MAX)?;
        let subcategory = self.subcategory.unwrap_or_default().trim().to_string();
        check_len("subcategory", &subcategory, SUBCATEGORY_MAX)?;
        let category = Category::from_str(category)?;
        let is_adjustable = parse_opt(self.is_adjustable.as_deref(), |s| {
            bool_from_str("isAdjustable", s)
        })?
        .unwrap_or(false);
        let quantity = parse_opt(self.quantity.as_deref(), |s| int_from_str("quantity", s))?;
        let quantity = match quantity {
            Some(q) => q,
            None if is_sized_ring(category, is_adjustable) => 0,
            None => return Err(DomainError::validation("quantity is required")),
        };
        if quantity < 0 {
            return Err(DomainError::validation("quantity cannot be negative"));
        }
        let sized_stock = self
            .sized_stock
            .as_deref()
            .and_then(|s| non_blank(Some(s)))
            .map(parse_sized_stock)
            .transpose()?
            .unwrap_or_default();

        Ok(NewProduct {
            title: title.to_string(),
            description: description.to_string(),
            price: parse_price(price)?,
            category,
            subcategory,
            images,
            quantity,
            is_adjustable,
            sized_stock,
            is_featured: parse_opt(self.is_featured.as_deref(), |s| bool_from_str("isFeatured", s))?
                .unwrap_or(false),
            tags: self.tags.as_deref().map(parse_tags).transpose()?.unwrap_or_default(),
        })
    }

    /// Converts the form into a partial update. `uploaded` are URLs of images
    /// attached to this request; together with `existingImages` they replace
    /// the stored list when non-empty.
    pub fn into_changes(self, uploaded: Vec<String>) -> Result<ProductChanges, DomainError> {
        let images: Vec<String> = self
            .existing_images
            .into_iter()
            .chain(uploaded)
            .filter(|url| !url.trim().is_empty())
            .collect();

        let quantity = parse_opt(self.quantity.as_deref(), |s| int_from_str("quantity", s))?;
        if quantity.is_some_and(|q| q < 0) {
            return Err(DomainError::validation("quantity cannot be negative"));
        }

        let title = trimmed(self.title);
        if let Some(title) = &title {
            check_len("title", title, TITLE_MAX)?;
        }
        let subcategory = self.subcategory.map(|s| s.trim().to_string());
        if let Some(subcategory) = &subcategory {
            check_len("subcategory", subcategory, SUBCATEGORY_MAX)?;
        }

        Ok(ProductChanges {
            title,
            description: trimmed(self.description),
            price: non_blank(self.price.as_deref()).map(parse_price).transpose()?,
            category: non_blank(self.category.as_deref())
                .map(Category::from_str)
                .transpose()?,
            subcategory,
            images: (!images.is_empty()).then_some(images),
            quantity,
            is_adjustable: parse_opt(self.is_adjustable.as_deref(), |s| {
                bool_from_str("isAdjustable", s)
            })?,
            sized_stock: self
                .sized_stock
                .as_deref()
                .and_then(|s| non_blank(Some(s)))
                .map(parse_sized_stock)
                .transpose()?,
            is_featured: parse_opt(self.is_featured.as_deref(), |s| {
                bool_from_str("isFeatured", s)
            })?,
            tags: self.tags.as_deref().map(parse_tags).transpose()?,
        })
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    non_blank(value.as_deref()).map(str::to_string)
}

fn parse_opt<T>(
    raw: Option<&str>,
    parse: impl FnOnce(&str) -> Result<T, DomainError>,
) -> Result<Option<T>, DomainError> {
    non_blank(raw).map(parse).transpose()
}

fn parse_price(raw: &str) -> Result<BigDecimal, DomainError> {
    let price = decimal_from_str("price", raw)?;
    if price <= BigDecimal::zero() {
        return Err(DomainError::validation("price must be greater than zero"));
    }
    check_amount("price", &price)?;
    Ok(price)
}

fn parse_sized_stock(raw: &str) -> Result<SizedStock, DomainError> {
    let stock: SizedStock = serde_json::from_str(raw)
        .map_err(|_| DomainError::validation("sizedStock must be a JSON object"))?;
    stock.validate()?;
    Ok(stock)
}

/// Tags arrive either as a JSON array or as a comma-separated list.
fn parse_tags(raw: &str) -> Result<Vec<String>, DomainError> {
    let raw = raw.trim();
    let tags: Vec<String> = if raw.starts_with('[') {
        match json_from_value(Value::String(raw.to_string()))? {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => return Err(DomainError::validation("tags must be a list")),
        }
    } else {
        raw.split(',').map(str::to_string).collect()
    };
    Ok(tags
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect())
}
