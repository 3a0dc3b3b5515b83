use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::application::catalog_service::CatalogService;
use crate::domain::media::Upload;
use crate::domain::product::{Category, Product, ProductForm, SizedStock};
use crate::errors::AppError;

use super::auth::AdminSession;
use super::forms::{read_body, RequestBody};

/// File part names accepted for product images.
const IMAGE_FIELDS: [&str; 2] = ["images", "images[]"];

// ── Response DTOs ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// Decimal string, e.g. "2500.00"
    pub price: String,
    pub category: Category,
    pub subcategory: String,
    pub images: Vec<String>,
    pub quantity: i32,
    pub is_adjustable: bool,
    pub sized_stock: SizedStock,
    /// Sum of the size buckets for sized rings, `quantity` otherwise.
    pub total_stock: i32,
    pub is_featured: bool,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        ProductResponse {
            id: p.id,
            total_stock: p.total_stock(),
            title: p.title,
            description: p.description,
            price: p.price.to_string(),
            category: p.category,
            subcategory: p.subcategory,
            images: p.images,
            quantity: p.quantity,
            is_adjustable: p.is_adjustable,
            sized_stock: p.sized_stock,
            is_featured: p.is_featured,
            tags: p.tags,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductEnvelope {
    pub success: bool,
    pub product: ProductResponse,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryResponse {
    pub name: Category,
    pub subcategories: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductQuery {
    /// Restrict the listing to one category, e.g. `Rings`.
    pub category: Option<String>,
}

fn product_list(products: Vec<Product>) -> Vec<ProductResponse> {
    products.into_iter().map(Into::into).collect()
}

/// Reads a product form from multipart or JSON. JSON values that are not
/// strings are passed on in their JSON text form.
async fn read_product_form(
    req: &HttpRequest,
    payload: web::Payload,
) -> Result<(ProductForm, Vec<Upload>), AppError> {
    match read_body(req, payload).await? {
        RequestBody::Form(mut form) => {
            let uploads = form.take_files(&IMAGE_FIELDS);
            Ok((ProductForm::from_fields(form.fields), uploads))
        }
        RequestBody::Json(bytes) => {
            let Value::Object(map) = serde_json::from_slice::<Value>(&bytes)
                .map_err(|_| AppError::BadRequest("Invalid JSON data in request".to_string()))?
            else {
                return Err(AppError::BadRequest("Expected a JSON object".to_string()));
            };
            let mut fields = Vec::new();
            for (name, value) in map {
                match value {
                    Value::Null => {}
                    Value::String(s) => fields.push((name, s)),
                    Value::Array(items) if name == "existingImages" => fields.extend(
                        items
                            .into_iter()
                            .filter_map(|v| v.as_str().map(str::to_string))
                            .map(|url| (name.clone(), url)),
                    ),
                    other => fields.push((name, other.to_string())),
                }
            }
            Ok((ProductForm::from_fields(fields), Vec::new()))
        }
    }
}

// ── Public catalog ────────────────────────────────────────────────────────────

/// GET /api/products
#[utoipa::path(
    get,
    path = "/api/products",
    params(ProductQuery),
    responses(
        (status = 200, description = "Products, newest first", body = Vec<ProductResponse>),
        (status = 400, description = "Unknown category"),
    ),
    tag = "products"
)]
pub async fn list_products(
    service: web::Data<CatalogService>,
    query: web::Query<ProductQuery>,
) -> Result<HttpResponse, AppError> {
    let category = query
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::parse::<Category>)
        .transpose()?;
    let products = web::block(move || match category {
        Some(category) => service.list_by_category(category),
        None => service.list_products(),
    })
    .await??;
    Ok(HttpResponse::Ok().json(product_list(products)))
}

/// GET /api/products/featured
#[utoipa::path(
    get,
    path = "/api/products/featured",
    responses((status = 200, description = "Featured products", body = Vec<ProductResponse>)),
    tag = "products"
)]
pub async fn list_featured(service: web::Data<CatalogService>) -> Result<HttpResponse, AppError> {
    let products = web::block(move || service.list_featured()).await??;
    Ok(HttpResponse::Ok().json(product_list(products)))
}

/// GET /api/products/categories
#[utoipa::path(
    get,
    path = "/api/products/categories",
    responses(
        (status = 200, description = "Categories with their subcategories", body = Vec<CategoryResponse>),
    ),
    tag = "products"
)]
pub async fn list_categories(service: web::Data<CatalogService>) -> HttpResponse {
    let categories: Vec<CategoryResponse> = service
        .categories()
        .into_iter()
        .map(|(name, subs)| CategoryResponse {
            name,
            subcategories: subs.iter().map(|s| s.to_string()).collect(),
        })
        .collect();
    HttpResponse::Ok().json(categories)
}

/// GET /api/products/{id}
#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product UUID")),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 404, description = "Product not found"),
    ),
    tag = "products"
)]
pub async fn get_product(
    service: web::Data<CatalogService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let product = web::block(move || service.get_product(id)).await??;
    Ok(HttpResponse::Ok().json(ProductResponse::from(product)))
}

// ── Admin ─────────────────────────────────────────────────────────────────────

/// POST /api/products
///
/// `multipart/form-data` with up to five `images` file parts.
#[utoipa::path(
    post,
    path = "/api/products",
    responses(
        (status = 201, description = "Product created", body = ProductEnvelope),
        (status = 400, description = "Missing fields or bad upload"),
        (status = 401, description = "Not signed in"),
    ),
    security(("bearer" = [])),
    tag = "products"
)]
pub async fn create_product(
    _admin: AdminSession,
    service: web::Data<CatalogService>,
    req: HttpRequest,
    payload: web::Payload,
) -> Result<HttpResponse, AppError> {
    let (form, uploads) = read_product_form(&req, payload).await?;
    let product = web::block(move || service.create_product(form, uploads)).await??;
    Ok(HttpResponse::Created().json(ProductEnvelope {
        success: true,
        product: product.into(),
        message: "Product created successfully".to_string(),
    }))
}

/// PUT /api/products/{id}
///
/// Only submitted fields change. `existingImages` plus new uploads replace
/// the image list when non-empty.
#[utoipa::path(
    put,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product UUID")),
    responses(
        (status = 200, description = "Product updated", body = ProductEnvelope),
        (status = 400, description = "Invalid field or upload"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer" = [])),
    tag = "products"
)]
pub async fn update_product(
    _admin: AdminSession,
    service: web::Data<CatalogService>,
    path: web::Path<Uuid>,
    req: HttpRequest,
    payload: web::Payload,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let (form, uploads) = read_product_form(&req, payload).await?;
    let product = web::block(move || service.update_product(id, form, uploads)).await??;
    Ok(HttpResponse::Ok().json(ProductEnvelope {
        success: true,
        product: product.into(),
        message: "Product updated successfully".to_string(),
    }))
}

/// DELETE /api/products/{id}
#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product UUID")),
    responses(
        (status = 200, description = "Product removed", body = MessageResponse),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer" = [])),
    tag = "products"
)]
pub async fn delete_product(
    _admin: AdminSession,
    service: web::Data<CatalogService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    web::block(move || service.delete_product(id)).await??;
    Ok(HttpResponse::Ok().json(MessageResponse {
        success: true,
        message: "Product removed".to_string(),
    }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/products")
            .route("", web::get().to(list_products))
            .route("", web::post().to(create_product))
            .route("/featured", web::get().to(list_featured))
            .route("/categories", web::get().to(list_categories))
            .route("/{id}", web::get().to(get_product))
            .route("/{id}", web::put().to(update_product))
            .route("/{id}", web::delete().to(delete_product)),
    );
}
