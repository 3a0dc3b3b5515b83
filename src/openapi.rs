use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::checkout::CheckoutRequest;
use crate::domain::order::{OrderStatus, PaymentDetails, PaymentMethod, PaymentStatus, Province};
use crate::domain::product::{Category, SizedStock};
use crate::handlers::{health, orders, products, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Jewellery Store API",
        description = "Catalog, checkout, order tracking and admin back office"
    ),
    paths(
        orders::create_order,
        orders::track_order,
        orders::shipping_quote,
        orders::list_orders,
        orders::get_order,
        orders::update_order_status,
        orders::update_payment_status,
        products::list_products,
        products::list_featured,
        products::list_categories,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        users::register,
        users::login,
        users::logout,
        users::refresh,
        health::health,
    ),
    components(schemas(
        CheckoutRequest,
        PaymentDetails,
        OrderStatus,
        PaymentMethod,
        PaymentStatus,
        Province,
        Category,
        SizedStock,
        orders::OrderResponse,
        orders::OrderItemResponse,
        orders::StatusHistoryResponse,
        orders::CreateOrderResponse,
        orders::OrderEnvelope,
        orders::OrderListResponse,
        orders::UpdateStatusRequest,
        orders::UpdatePaymentStatusRequest,
        orders::ShippingQuoteResponse,
        products::ProductResponse,
        products::ProductEnvelope,
        products::CategoryResponse,
        products::MessageResponse,
        users::RegisterRequest,
        users::LoginRequest,
        users::UserResponse,
        users::SessionResponse,
        health::HealthResponse,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "orders", description = "Checkout and order tracking"),
        (name = "products", description = "Catalog"),
        (name = "users", description = "Admin accounts"),
        (name = "health", description = "Liveness"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
