use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::application::order_service::{OrderService, StatusChange};
use crate::domain::checkout::CheckoutRequest;
use crate::domain::order::{
    Order, OrderItem, OrderStatus, Payment, PaymentDetails, PaymentMethod, PaymentStatus,
    Province, StatusHistoryEntry,
};
use crate::errors::AppError;

use super::auth::AdminSession;
use super::forms::{read_body, RequestBody};
use super::products::ProductResponse;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    /// `null` for items that never referenced a catalog product.
    pub product_id: Option<Uuid>,
    /// Current catalog product, `null` once it has been deleted.
    pub product: Option<ProductResponse>,
    pub title: String,
    /// Unit price at order time, e.g. "2500.00"
    pub price: String,
    pub image: String,
    pub quantity: i32,
    pub selected_size: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryResponse {
    pub status: OrderStatus,
    pub description: String,
    pub courier_company: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: Uuid,
    pub tracking_number: String,
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub shipping_address: String,
    pub city: String,
    pub province: Province,
    pub country: String,
    pub order_items: Vec<OrderItemResponse>,
    pub subtotal: String,
    pub shipping_cost: String,
    pub total_amount: String,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub selected_account: Option<String>,
    pub payment_details: Option<PaymentDetails>,
    /// URL of the uploaded bank-transfer receipt.
    pub transaction_proof: Option<String>,
    pub status: OrderStatus,
    pub courier_company: String,
    pub shipment_description: String,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub actual_delivery: Option<DateTime<Utc>>,
    pub status_history: Vec<StatusHistoryResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OrderItem> for OrderItemResponse {
    fn from(item: OrderItem) -> Self {
        OrderItemResponse {
            product_id: item.product_id,
            product: item.product.map(ProductResponse::from),
            title: item.title,
            price: item.price.to_string(),
            image: item.image,
            quantity: item.quantity,
            selected_size: item.selected_size,
        }
    }
}

impl From<StatusHistoryEntry> for StatusHistoryResponse {
    fn from(entry: StatusHistoryEntry) -> Self {
        StatusHistoryResponse {
            status: entry.status,
            description: entry.description,
            courier_company: entry.courier_company,
            timestamp: entry.timestamp,
        }
    }
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        let payment_method = order.payment.method();
        let (selected_account, payment_details, transaction_proof) = match order.payment {
            Payment::CashOnDelivery => (None, None, None),
            Payment::BankTransfer {
                selected_account,
                details,
                proof_url,
            } => (Some(selected_account), Some(details), proof_url),
        };
        OrderResponse {
            id: order.id,
            tracking_number: order.tracking_number,
            customer_name: order.customer.name,
            email: order.customer.email,
            phone: order.customer.phone,
            shipping_address: order.shipping.street,
            city: order.shipping.city,
            province: order.shipping.province,
            country: order.shipping.country,
            order_items: order.items.into_iter().map(Into::into).collect(),
            subtotal: order.subtotal.to_string(),
            shipping_cost: order.shipping_cost.to_string(),
            total_amount: order.total_amount.to_string(),
            payment_method,
            payment_status: order.payment_status,
            selected_account,
            payment_details,
            transaction_proof,
            status: order.status,
            courier_company: order.courier_company,
            shipment_description: order.shipment_description,
            estimated_delivery: order.estimated_delivery,
            actual_delivery: order.actual_delivery,
            status_history: order.status_history.into_iter().map(Into::into).collect(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub success: bool,
    pub order: OrderResponse,
    pub tracking_number: String,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderEnvelope {
    pub success: bool,
    pub order: OrderResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderListResponse {
    pub success: bool,
    pub orders: Vec<OrderResponse>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
    pub courier_company: Option<String>,
    pub shipment_description: Option<String>,
    /// RFC 3339 timestamp or `YYYY-MM-DD`.
    pub estimated_delivery: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentStatusRequest {
    /// One of `pending`, `verified`, `rejected`.
    pub payment_status: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ShippingQuoteParams {
    pub province: Option<String>,
    pub subtotal: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShippingQuoteResponse {
    pub success: bool,
    pub province: Province,
    pub subtotal: String,
    pub shipping_cost: String,
    pub free_shipping_threshold: String,
}

fn envelope(order: Order) -> OrderEnvelope {
    OrderEnvelope {
        success: true,
        order: order.into(),
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /api/orders
///
/// Accepts JSON or `multipart/form-data`. A bank-transfer receipt may be
/// attached as the `transactionProof` file part.
#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Order placed", body = CreateOrderResponse),
        (status = 400, description = "Invalid order or insufficient stock"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn create_order(
    service: web::Data<OrderService>,
    req: HttpRequest,
    payload: web::Payload,
) -> Result<HttpResponse, AppError> {
    let (request, proof) = match read_body(&req, payload).await? {
        RequestBody::Json(bytes) => {
            let request: CheckoutRequest = serde_json::from_slice(&bytes)
                .map_err(|_| AppError::BadRequest("Invalid JSON data in request".to_string()))?;
            (request, None)
        }
        RequestBody::Form(mut form) => {
            let proof = form.take_files(&["transactionProof"]).into_iter().next();
            let request: CheckoutRequest = serde_json::from_value(form.fields_as_json())
                .map_err(|_| AppError::BadRequest("Invalid JSON data in request".to_string()))?;
            (request, proof)
        }
    };

    let order = web::block(move || service.create_order(request, proof)).await??;

    Ok(HttpResponse::Created().json(CreateOrderResponse {
        success: true,
        tracking_number: order.tracking_number.clone(),
        order: order.into(),
        message: "Order placed successfully".to_string(),
    }))
}

/// GET /api/orders/track/{trackingNumber}
#[utoipa::path(
    get,
    path = "/api/orders/track/{trackingNumber}",
    params(
        ("trackingNumber" = String, Path, description = "Tracking number, e.g. AYOSI-34821190-K7QM"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderEnvelope),
        (status = 404, description = "No order with this tracking number"),
    ),
    tag = "orders"
)]
pub async fn track_order(
    service: web::Data<OrderService>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let tracking_number = path.into_inner();
    let order = web::block(move || service.get_by_tracking_number(&tracking_number)).await??;
    Ok(HttpResponse::Ok().json(envelope(order)))
}

/// GET /api/orders/shipping-quote
///
/// Delivery fee for a province; informational only.
#[utoipa::path(
    get,
    path = "/api/orders/shipping-quote",
    params(ShippingQuoteParams),
    responses(
        (status = 200, description = "Quote", body = ShippingQuoteResponse),
        (status = 400, description = "Unknown province or bad subtotal"),
    ),
    tag = "orders"
)]
pub async fn shipping_quote(
    service: web::Data<OrderService>,
    query: web::Query<ShippingQuoteParams>,
) -> Result<HttpResponse, AppError> {
    let quote = service.shipping_quote(query.province.as_deref(), query.subtotal.as_deref())?;
    Ok(HttpResponse::Ok().json(ShippingQuoteResponse {
        success: true,
        province: quote.province,
        subtotal: quote.subtotal.to_string(),
        shipping_cost: quote.shipping_cost.to_string(),
        free_shipping_threshold: quote.free_shipping_threshold.to_string(),
    }))
}

/// GET /api/orders
#[utoipa::path(
    get,
    path = "/api/orders",
    responses(
        (status = 200, description = "All orders, newest first", body = OrderListResponse),
        (status = 401, description = "Not signed in"),
    ),
    security(("bearer" = [])),
    tag = "orders"
)]
pub async fn list_orders(
    _admin: AdminSession,
    service: web::Data<OrderService>,
) -> Result<HttpResponse, AppError> {
    let orders = web::block(move || service.list_orders()).await??;
    Ok(HttpResponse::Ok().json(OrderListResponse {
        success: true,
        orders: orders.into_iter().map(Into::into).collect(),
    }))
}

/// GET /api/orders/{id}
#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Order found", body = OrderEnvelope),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer" = [])),
    tag = "orders"
)]
pub async fn get_order(
    _admin: AdminSession,
    service: web::Data<OrderService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let order = web::block(move || service.get_order(id)).await??;
    Ok(HttpResponse::Ok().json(envelope(order)))
}

/// PUT /api/orders/{id}/status
///
/// Every accepted call appends one status history entry.
#[utoipa::path(
    put,
    path = "/api/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = OrderEnvelope),
        (status = 400, description = "Invalid status or date"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer" = [])),
    tag = "orders"
)]
pub async fn update_order_status(
    _admin: AdminSession,
    service: web::Data<OrderService>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let body = body.into_inner();
    let change = StatusChange {
        status: body.status,
        courier_company: body.courier_company,
        shipment_description: body.shipment_description,
        estimated_delivery: body.estimated_delivery,
    };
    let order = web::block(move || service.update_status(id, change)).await??;
    Ok(HttpResponse::Ok().json(envelope(order)))
}

/// PUT /api/orders/{id}/payment-status
#[utoipa::path(
    put,
    path = "/api/orders/{id}/payment-status",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = UpdatePaymentStatusRequest,
    responses(
        (status = 200, description = "Payment status updated", body = OrderEnvelope),
        (status = 400, description = "Not one of pending, verified, rejected"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer" = [])),
    tag = "orders"
)]
pub async fn update_payment_status(
    _admin: AdminSession,
    service: web::Data<OrderService>,
    path: web::Path<Uuid>,
    body: web::Json<UpdatePaymentStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let status = body.into_inner().payment_status;
    let order =
        web::block(move || service.update_payment_status(id, status.as_deref())).await??;
    Ok(HttpResponse::Ok().json(envelope(order)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/orders")
            .route("", web::post().to(create_order))
            .route("", web::get().to(list_orders))
            .route("/track/{tracking_number}", web::get().to(track_order))
            .route("/shipping-quote", web::get().to(shipping_quote))
            .route("/{id}", web::get().to(get_order))
            .route("/{id}/status", web::put().to(update_order_status))
            .route("/{id}/payment-status", web::put().to(update_payment_status)),
    );
}

#[cfg(test)]
mod tests {
    use actix_web::http::{header, StatusCode};
    use actix_web::{test, App};
    use serde_json::{json, Value};

    use crate::handlers::test_support::{admin_token, app_data};
    use crate::test_utils::{necklace, sized_ring, TestContext};

    fn checkout_body(product: &str, quantity: i32, size: Option<&str>) -> Value {
        json!({
            "customerName": "Ayesha Khan",
            "email": "ayesha@example.com",
            "phone": "03001234567",
            "shippingAddress": "12 Mall Road",
            "city": "Lahore",
            "province": "punjab",
            "country": "Pakistan",
            "subtotal": "2500",
            "shippingCost": "250",
            "totalAmount": "2750",
            "orderItems": [{ "product": product, "quantity": quantity, "selectedSize": size }],
            "paymentMethod": "cod"
        })
    }

    #[actix_web::test]
    async fn create_and_track_order() {
        let ctx = TestContext::new();
        let product = ctx.products.insert(necklace(3));
        let app = test::init_service(App::new().configure(|cfg| app_data(&ctx, cfg))).await;

        let req = test::TestRequest::post()
            .uri("/api/orders")
            .set_json(checkout_body(&product.id.to_string(), 1, None))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Order placed successfully");
        assert_eq!(body["order"]["status"], "Received");
        assert_eq!(body["order"]["paymentStatus"], "verified");
        assert_eq!(body["order"]["orderItems"][0]["product"]["quantity"], 2);
        let tracking = body["trackingNumber"].as_str().unwrap().to_string();

        let req = test::TestRequest::get()
            .uri(&format!("/api/orders/track/{tracking}"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["order"]["trackingNumber"], tracking);
        assert_eq!(body["order"]["statusHistory"].as_array().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn multipart_checkout_with_proof() {
        let ctx = TestContext::new();
        let product = ctx.products.insert(necklace(3));
        let app = test::init_service(App::new().configure(|cfg| app_data(&ctx, cfg))).await;

        let boundary = "XBOUNDARYX";
        let items = json!([{ "product": product.id, "quantity": 1 }]).to_string();
        let details = json!({
            "accountName": "Meezan",
            "accountNumber": "0101",
            "accountHolder": "Ayosi"
        })
        .to_string();
        let mut body = String::new();
        for (name, value) in [
            ("customerName", "Ayesha Khan"),
            ("email", "ayesha@example.com"),
            ("phone", "03001234567"),
            ("shippingAddress", "12 Mall Road"),
            ("city", "Lahore"),
            ("province", "sindh"),
            ("country", "Pakistan"),
            ("subtotal", "2500"),
            ("totalAmount", "2800"),
            ("orderItems", items.as_str()),
            ("paymentMethod", "bank_transfer"),
            ("selectedAccount", "meezan"),
            ("paymentDetails", details.as_str()),
        ] {
            body.push_str(&format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"transactionProof\"; filename=\"proof.png\"\r\nContent-Type: image/png\r\n\r\nPNGDATA\r\n--{boundary}--\r\n"
        ));

        let req = test::TestRequest::post()
            .uri("/api/orders")
            .insert_header((
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            ))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["order"]["paymentStatus"], "pending");
        assert_eq!(body["order"]["paymentDetails"]["accountNumber"], "0101");
        assert!(body["order"]["transactionProof"]
            .as_str()
            .unwrap()
            .contains("/transaction-proofs/"));
        assert_eq!(ctx.media.stored().len(), 1);
    }

    #[actix_web::test]
    async fn stock_shortfall_is_a_400_with_message() {
        let ctx = TestContext::new();
        let ring = ctx.products.insert(sized_ring(2, 0, 5));
        let app = test::init_service(App::new().configure(|cfg| app_data(&ctx, cfg))).await;

        let req = test::TestRequest::post()
            .uri("/api/orders")
            .set_json(checkout_body(&ring.id.to_string(), 3, Some("7-8")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(
            body["message"],
            "Insufficient stock for Moon Ring in size 7-8. Only 0 items available."
        );
        assert_eq!(ctx.orders.count(), 0);
    }

    #[actix_web::test]
    async fn malformed_json_is_rejected() {
        let ctx = TestContext::new();
        let app = test::init_service(App::new().configure(|cfg| app_data(&ctx, cfg))).await;

        let req = test::TestRequest::post()
            .uri("/api/orders")
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Invalid JSON data in request");
    }

    #[actix_web::test]
    async fn oversized_checkout_fields_are_400() {
        let ctx = TestContext::new();
        let product = ctx.products.insert(necklace(3));
        let app = test::init_service(App::new().configure(|cfg| app_data(&ctx, cfg))).await;

        let mut body = checkout_body(&product.id.to_string(), 1, None);
        body["phone"] = json!("3".repeat(51));
        let req = test::TestRequest::post()
            .uri("/api/orders")
            .set_json(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "phone must be at most 50 characters");

        let mut body = checkout_body(&product.id.to_string(), 1, None);
        body["totalAmount"] = json!("99999999999");
        let req = test::TestRequest::post()
            .uri("/api/orders")
            .set_json(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ctx.orders.count(), 0);
    }

    #[actix_web::test]
    async fn unknown_tracking_number_is_404() {
        let ctx = TestContext::new();
        let app = test::init_service(App::new().configure(|cfg| app_data(&ctx, cfg))).await;
        let req = test::TestRequest::get()
            .uri("/api/orders/track/AYOSI-00000000-XXXX")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get()
            .uri("/api/orders/track/not-a-tracking-number")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Order not found with this tracking number");
    }

    #[actix_web::test]
    async fn admin_routes_require_a_token() {
        let ctx = TestContext::new();
        let app = test::init_service(App::new().configure(|cfg| app_data(&ctx, cfg))).await;
        let req = test::TestRequest::get().uri("/api/orders").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn admin_updates_status_and_payment() {
        let ctx = TestContext::new();
        let token = admin_token(&ctx);
        let app = test::init_service(App::new().configure(|cfg| app_data(&ctx, cfg))).await;

        let req = test::TestRequest::post()
            .uri("/api/orders")
            .set_json(checkout_body("external-1", 1, None))
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        let id = created["order"]["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::put()
            .uri(&format!("/api/orders/{id}/status"))
            .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
            .set_json(json!({ "status": "Delivered", "courierCompany": "TCS" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["order"]["status"], "Delivered");
        assert!(!body["order"]["actualDelivery"].is_null());
        assert_eq!(body["order"]["statusHistory"].as_array().unwrap().len(), 2);

        let req = test::TestRequest::put()
            .uri(&format!("/api/orders/{id}/payment-status"))
            .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
            .set_json(json!({ "paymentStatus": "refunded" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get()
            .uri("/api/orders")
            .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["orders"].as_array().unwrap().len(), 1);
        assert_eq!(body["orders"][0]["paymentStatus"], "verified");
    }

    #[actix_web::test]
    async fn shipping_quote_endpoint() {
        let ctx = TestContext::new();
        let app = test::init_service(App::new().configure(|cfg| app_data(&ctx, cfg))).await;
        let req = test::TestRequest::get()
            .uri("/api/orders/shipping-quote?province=balochistan&subtotal=1000")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["shippingCost"], "350");
        assert_eq!(body["province"], "balochistan");
    }
}
