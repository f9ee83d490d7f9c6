//! Integration test harness for Bazaar.
//!
//! [`MockUpstream`] serves an in-memory imitation of the upstream storefront
//! API on an ephemeral local port. Its responses reproduce the upstream's
//! quirks: products carrying `_id`, `id` or both, enveloped and bare lists,
//! and a 404 for a user who has never had a cart. Every request is recorded
//! along with the `token` header it carried.
//!
//! # Example
//!
//! ```rust,ignore
//! let upstream = MockUpstream::start().await?;
//! let storefront = upstream.storefront()?;
//!
//! storefront.sign_in(&MockUpstream::shopper_sign_in()).await?;
//! storefront.cart().add_item(&ProductId::new("p1")).await?;
//! assert!(upstream.requests().iter().all(|r| r.path == "/auth/signin" || r.token.is_some()));
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use bazaar_storefront::{AppError, Storefront};
use bazaar_storefront::api::TOKEN_HEADER;
use bazaar_storefront::config::StorefrontConfig;
use bazaar_storefront::session::SessionStore;
use bazaar_storefront::validation::SignInForm;
use chrono::{TimeDelta, Utc};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Path prefix the mock API is mounted under.
pub const API_PREFIX: &str = "/api/v1";

pub const SHOPPER_ID: &str = "u1";
pub const SHOPPER_NAME: &str = "Sam Shopper";
pub const SHOPPER_EMAIL: &str = "shopper@example.com";
pub const SHOPPER_PASSWORD: &str = "secret123";

/// Return URL configured for hosted card checkout.
pub const CHECKOUT_RETURN_URL: &str = "http://localhost:3000";

type Shared = Arc<Mutex<MockState>>;
type Reply = Result<Response, Response>;

/// A request as the mock saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    /// Path below [`API_PREFIX`].
    pub path: String,
    pub query: Option<String>,
    /// Value of the `token` header, if sent.
    pub token: Option<String>,
}

impl RecordedRequest {
    #[must_use]
    pub fn is(&self, method: &str, path: &str) -> bool {
        self.method == method && self.path == path
    }
}

// =============================================================================
// State
// =============================================================================

#[derive(Debug, Clone)]
struct MockUser {
    id: String,
    name: String,
    email: String,
    password: String,
    phone: Option<String>,
}

#[derive(Debug, Clone)]
struct CartLine {
    id: String,
    product: String,
    count: u32,
}

#[derive(Debug, Clone)]
struct MockCart {
    id: String,
    lines: Vec<CartLine>,
}

#[derive(Debug, Default)]
struct MockState {
    products: Vec<Value>,
    users: Vec<MockUser>,
    /// token -> user id
    sessions: HashMap<String, String>,
    /// user id -> cart
    carts: HashMap<String, MockCart>,
    /// user id -> canonical product ids
    wishlists: HashMap<String, Vec<String>>,
    addresses: HashMap<String, Vec<Value>>,
    orders: Vec<Value>,
    checkout_returns: Vec<String>,
    omit_checkout_url: bool,
    /// Cart mutations answer with bare product ids instead of products.
    unpopulated_cart_replies: bool,
    /// One-shot failures keyed by (method, path).
    failures: HashMap<(String, String), StatusCode>,
    requests: Vec<RecordedRequest>,
    counter: u32,
}

impl MockState {
    fn seeded() -> Self {
        Self {
            products: seed_products(),
            users: vec![MockUser {
                id: SHOPPER_ID.to_string(),
                name: SHOPPER_NAME.to_string(),
                email: SHOPPER_EMAIL.to_string(),
                password: SHOPPER_PASSWORD.to_string(),
                phone: Some("01012345678".to_string()),
            }],
            ..Self::default()
        }
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.counter += 1;
        format!("{prefix}{}", self.counter)
    }

    fn issue_token(&mut self, user_id: &str) -> String {
        self.counter += 1;
        let name = self
            .users
            .iter()
            .find(|user| user.id == user_id)
            .map_or("", |user| user.name.as_str());
        let token = encode_token(user_id, name, self.counter);
        self.sessions.insert(token.clone(), user_id.to_string());
        token
    }

    fn user_for(&self, headers: &HeaderMap) -> Result<String, Response> {
        headers
            .get(TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|token| self.sessions.get(token))
            .cloned()
            .ok_or_else(|| failure(StatusCode::UNAUTHORIZED, "Invalid Token. please login again"))
    }

    fn product(&self, id: &str) -> Option<&Value> {
        self.products.iter().find(|product| product_matches(product, id))
    }

    fn priced_lines<'a>(&'a self, cart: &'a MockCart) -> Vec<(&'a CartLine, &'a Value, i64)> {
        cart.lines
            .iter()
            .filter_map(|line| {
                let product = self.product(&line.product)?;
                Some((line, product, unit_price(product)))
            })
            .collect()
    }

    fn cart_reply(&self, user: &str) -> Reply {
        self.render_cart(user, true)
    }

    fn cart_mutation_reply(&self, user: &str) -> Reply {
        self.render_cart(user, !self.unpopulated_cart_replies)
    }

    fn render_cart(&self, user: &str, populated: bool) -> Reply {
        let cart = self.carts.get(user).ok_or_else(|| no_cart(user))?;
        let lines = self.priced_lines(cart);
        let total: i64 = lines
            .iter()
            .map(|(line, _, price)| price * i64::from(line.count))
            .sum();
        let products: Vec<Value> = lines
            .iter()
            .map(|(line, product, price)| {
                let product = if populated {
                    (*product).clone()
                } else {
                    Value::String(product_key(product))
                };
                json!({ "_id": line.id, "count": line.count, "price": price, "product": product })
            })
            .collect();

        Ok(Json(json!({
            "status": "success",
            "numOfCartItems": products.len(),
            "cartId": cart.id,
            "data": {
                "_id": cart.id,
                "cartOwner": user,
                "products": products,
                "totalCartPrice": total,
                "updatedAt": Utc::now().to_rfc3339(),
            }
        }))
        .into_response())
    }

    fn owned_cart(&self, user: &str, cart_id: &str) -> Result<&MockCart, Response> {
        self.carts
            .get(user)
            .filter(|cart| cart.id == cart_id)
            .ok_or_else(|| {
                failure(
                    StatusCode::NOT_FOUND,
                    &format!("There is no such cart with id {cart_id}"),
                )
            })
    }
}

fn lock(state: &Shared) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn failure(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "statusMsg": "fail", "message": message }))).into_response()
}

fn no_cart(user: &str) -> Response {
    failure(
        StatusCode::NOT_FOUND,
        &format!("No cart exist for this user: {user}"),
    )
}

fn product_matches(product: &Value, id: &str) -> bool {
    ["_id", "id"]
        .iter()
        .any(|key| product.get(key).and_then(Value::as_str) == Some(id))
}

fn product_key(product: &Value) -> String {
    ["_id", "id"]
        .iter()
        .find_map(|key| product.get(key).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}

fn unit_price(product: &Value) -> i64 {
    product
        .get("priceAfterDiscount")
        .and_then(Value::as_i64)
        .or_else(|| product.get("price").and_then(Value::as_i64))
        .unwrap_or_default()
}

/// A JWT-shaped token with a readable payload and a fake signature.
fn encode_token(user_id: &str, name: &str, serial: u32) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let now = Utc::now();
    let claims = json!({
        "id": user_id,
        "name": name,
        "role": "user",
        "iat": now.timestamp(),
        "exp": (now + TimeDelta::days(90)).timestamp(),
    });
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.mock-signature-{serial}")
}

/// Four products covering every id shape the upstream produces.
fn seed_products() -> Vec<Value> {
    vec![
        json!({
            "_id": "p1", "id": "p1",
            "title": "Cotton Shirt", "slug": "cotton-shirt",
            "description": "Breathable everyday shirt",
            "quantity": 20, "price": 40, "sold": 12,
            "ratingsAverage": 4.2, "ratingsQuantity": 10,
            "imageCover": "https://cdn.example.com/p1.jpg", "images": [],
            "category": { "_id": "c1", "name": "Men's Fashion", "slug": "men-s-fashion" },
            "brand": { "_id": "b1", "name": "Defacto", "slug": "defacto" },
            "createdAt": "2024-01-10T09:00:00.000Z"
        }),
        json!({
            "_id": "p2", "id": "legacy-2",
            "title": "Leather Boots", "slug": "leather-boots",
            "description": "Waterproof leather boots",
            "quantity": 5, "price": 80, "priceAfterDiscount": 65, "sold": 40,
            "ratingsAverage": 4.8, "ratingsQuantity": 31,
            "category": { "_id": "c1", "name": "Men's Fashion", "slug": "men-s-fashion" },
            "brand": { "_id": "b2", "name": "Timberland", "slug": "timberland" },
            "createdAt": "2024-03-02T09:00:00.000Z"
        }),
        json!({
            "id": "p3",
            "title": "Wireless Mouse", "slug": "wireless-mouse",
            "description": "Quiet clicks, long battery",
            "quantity": 50, "price": 25,
            "ratingsAverage": 3.9,
            "category": { "_id": "c2", "name": "Electronics", "slug": "electronics" },
            "brand": { "_id": "b3", "name": "Logi", "slug": "logi" },
            "createdAt": "2024-02-14T09:00:00.000Z"
        }),
        json!({
            "_id": "p4",
            "title": "Desk Lamp", "slug": "desk-lamp",
            "description": "Warm light for late nights",
            "quantity": 8, "price": 120, "sold": 3,
            "ratingsAverage": null,
            "category": { "_id": "c3", "name": "Home", "slug": "home" },
            "createdAt": "2024-04-20T09:00:00.000Z"
        }),
    ]
}

// =============================================================================
// Request bodies
// =============================================================================

#[derive(Debug, Deserialize)]
struct SignInBody {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterBody {
    name: String,
    email: String,
    password: String,
    re_password: String,
    phone: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductRef {
    product_id: String,
}

#[derive(Debug, Deserialize)]
struct CountBody {
    count: u32,
}

#[derive(Debug, Deserialize)]
struct AddressBody {
    name: String,
    details: String,
    phone: String,
    city: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CashOrderBody {
    shipping_address: Value,
}

// =============================================================================
// Handlers
// =============================================================================

async fn record(State(state): State<Shared>, request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let full_path = request.uri().path();
    let path = full_path
        .strip_prefix(API_PREFIX)
        .unwrap_or(full_path)
        .to_string();
    let query = request.uri().query().map(str::to_string);
    let token = request
        .headers()
        .get(TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let injected = {
        let mut mock = lock(&state);
        mock.requests.push(RecordedRequest {
            method: method.clone(),
            path: path.clone(),
            query,
            token,
        });
        mock.failures.remove(&(method, path))
    };

    match injected {
        Some(status) => failure(status, "Internal server error"),
        None => next.run(request).await,
    }
}

async fn sign_in(State(state): State<Shared>, Json(body): Json<SignInBody>) -> Reply {
    let mut mock = lock(&state);
    let user = mock
        .users
        .iter()
        .find(|user| user.email == body.email && user.password == body.password)
        .cloned()
        .ok_or_else(|| failure(StatusCode::UNAUTHORIZED, "Incorrect email or password"))?;
    let token = mock.issue_token(&user.id);

    Ok(Json(json!({
        "message": "success",
        "user": { "name": user.name, "email": user.email, "role": "user" },
        "token": token,
    }))
    .into_response())
}

async fn register(State(state): State<Shared>, Json(body): Json<RegisterBody>) -> Reply {
    let mut mock = lock(&state);
    if mock.users.iter().any(|user| user.email == body.email) {
        return Err(failure(StatusCode::CONFLICT, "Account Already Exists"));
    }
    if body.password != body.re_password {
        return Err(failure(StatusCode::BAD_REQUEST, "Password confirmation incorrect"));
    }

    let id = mock.next_id("u");
    mock.users.push(MockUser {
        id: id.clone(),
        name: body.name.clone(),
        email: body.email.clone(),
        password: body.password,
        phone: Some(body.phone),
    });
    let token = mock.issue_token(&id);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "success",
            "user": { "name": body.name, "email": body.email, "role": "user" },
            "token": token,
        })),
    )
        .into_response())
}

async fn me(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    let mock = lock(&state);
    let id = mock.user_for(&headers)?;
    let user = mock
        .users
        .iter()
        .find(|user| user.id == id)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "User not found"))?;

    Ok(Json(json!({
        "data": { "name": user.name, "email": user.email, "phone": user.phone, "role": "user" }
    }))
    .into_response())
}

async fn list_products(State(state): State<Shared>) -> Response {
    let mock = lock(&state);
    Json(json!({
        "results": mock.products.len(),
        "metadata": { "currentPage": 1, "numberOfPages": 1, "limit": 40 },
        "data": mock.products,
    }))
    .into_response()
}

async fn get_product(State(state): State<Shared>, Path(id): Path<String>) -> Reply {
    let mock = lock(&state);
    let product = mock
        .product(&id)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, &format!("No product for this id {id}")))?;
    Ok(Json(json!({ "data": product })).into_response())
}

async fn get_cart(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    let mock = lock(&state);
    let user = mock.user_for(&headers)?;
    mock.cart_reply(&user)
}

async fn add_to_cart(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<ProductRef>,
) -> Reply {
    let mut mock = lock(&state);
    let user = mock.user_for(&headers)?;
    let key = mock
        .product(&body.product_id)
        .map(product_key)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "No product for this id"))?;

    let cart_id = mock.next_id("cart-");
    let line_id = mock.next_id("line-");
    let cart = mock.carts.entry(user.clone()).or_insert_with(|| MockCart {
        id: cart_id,
        lines: Vec::new(),
    });
    match cart.lines.iter_mut().find(|line| line.product == key) {
        Some(line) => line.count += 1,
        None => cart.lines.push(CartLine {
            id: line_id,
            product: key,
            count: 1,
        }),
    }
    mock.cart_mutation_reply(&user)
}

async fn update_cart_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<CountBody>,
) -> Reply {
    let mut mock = lock(&state);
    let user = mock.user_for(&headers)?;
    let line = mock
        .carts
        .get_mut(&user)
        .and_then(|cart| cart.lines.iter_mut().find(|line| line.id == id))
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "There is no item for this id"))?;
    line.count = body.count;
    mock.cart_mutation_reply(&user)
}

async fn remove_cart_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    let mut mock = lock(&state);
    let user = mock.user_for(&headers)?;
    let cart = mock.carts.get_mut(&user).ok_or_else(|| no_cart(&user))?;
    cart.lines.retain(|line| line.id != id);
    mock.cart_mutation_reply(&user)
}

async fn clear_cart(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    let mut mock = lock(&state);
    let user = mock.user_for(&headers)?;
    mock.carts.remove(&user);
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn get_wishlist(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    let mock = lock(&state);
    let user = mock.user_for(&headers)?;
    let items: Vec<&Value> = mock
        .wishlists
        .get(&user)
        .into_iter()
        .flatten()
        .filter_map(|id| mock.product(id))
        .collect();

    Ok(Json(json!({ "status": "success", "count": items.len(), "data": items })).into_response())
}

async fn add_to_wishlist(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<ProductRef>,
) -> Reply {
    let mut mock = lock(&state);
    let user = mock.user_for(&headers)?;
    let key = mock
        .product(&body.product_id)
        .map(product_key)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "No product for this id"))?;

    let list = mock.wishlists.entry(user).or_default();
    if !list.contains(&key) {
        list.push(key);
    }
    Ok(Json(json!({
        "status": "success",
        "message": "Product added successfully to your wishlist",
        "data": list,
    }))
    .into_response())
}

async fn remove_from_wishlist(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    let mut mock = lock(&state);
    let user = mock.user_for(&headers)?;
    let key = mock.product(&id).map_or(id, product_key);

    let list = mock.wishlists.entry(user).or_default();
    list.retain(|stored| *stored != key);
    Ok(Json(json!({
        "status": "success",
        "message": "Product removed successfully from your wishlist",
        "data": list,
    }))
    .into_response())
}

async fn list_addresses(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    let mock = lock(&state);
    let user = mock.user_for(&headers)?;
    let list = mock.addresses.get(&user).cloned().unwrap_or_default();
    Ok(Json(json!({ "status": "success", "results": list.len(), "data": list })).into_response())
}

async fn add_address(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<AddressBody>,
) -> Reply {
    let mut mock = lock(&state);
    let user = mock.user_for(&headers)?;
    let id = mock.next_id("addr-");

    let list = mock.addresses.entry(user).or_default();
    list.push(json!({
        "_id": id,
        "name": body.name,
        "details": body.details,
        "phone": body.phone,
        "city": body.city,
    }));
    Ok(Json(json!({
        "status": "success",
        "message": "Address added successfully.",
        "data": list,
    }))
    .into_response())
}

async fn delete_address(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    let mut mock = lock(&state);
    let user = mock.user_for(&headers)?;
    let list = mock.addresses.entry(user).or_default();
    list.retain(|address| address.get("_id").and_then(Value::as_str) != Some(id.as_str()));
    Ok(Json(json!({ "status": "success", "data": list })).into_response())
}

/// Orders for a user, as a bare array.
async fn user_orders(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    let mock = lock(&state);
    mock.user_for(&headers)?;
    let orders: Vec<&Value> = mock
        .orders
        .iter()
        .filter(|order| order.get("user").and_then(Value::as_str) == Some(id.as_str()))
        .collect();
    Ok(Json(orders).into_response())
}

/// Consumes the cart.
async fn create_cash_order(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(cart_id): Path<String>,
    Json(body): Json<CashOrderBody>,
) -> Reply {
    let mut mock = lock(&state);
    let user = mock.user_for(&headers)?;
    let cart = mock.owned_cart(&user, &cart_id)?;

    let lines = mock.priced_lines(cart);
    let total: i64 = lines
        .iter()
        .map(|(line, _, price)| price * i64::from(line.count))
        .sum();
    let cart_items: Vec<Value> = lines
        .iter()
        .map(|(line, _, price)| {
            json!({ "count": line.count, "price": price, "product": line.product })
        })
        .collect();

    let number = mock.orders.len() + 1;
    let id = mock.next_id("order-");
    let order = json!({
        "_id": id,
        "id": number,
        "user": user,
        "cartItems": cart_items,
        "shippingAddress": body.shipping_address,
        "taxPrice": 0,
        "shippingPrice": 0,
        "totalOrderPrice": total,
        "paymentMethodType": "cash",
        "isPaid": false,
        "isDelivered": false,
        "createdAt": Utc::now().to_rfc3339(),
    });
    mock.orders.push(order.clone());
    mock.carts.remove(&user);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": "success", "data": order })),
    )
        .into_response())
}

async fn checkout_session(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(cart_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Reply {
    let mut mock = lock(&state);
    let user = mock.user_for(&headers)?;
    mock.owned_cart(&user, &cart_id)?;

    if let Some(url) = params.get("url") {
        mock.checkout_returns.push(url.clone());
    }
    let session_id = mock.next_id("cs_test_");
    let url = if mock.omit_checkout_url {
        Value::Null
    } else {
        Value::String(format!("https://checkout.stripe.test/c/pay/{session_id}"))
    };

    Ok(Json(json!({
        "status": "success",
        "session": { "id": session_id, "url": url },
    }))
    .into_response())
}

fn router(state: Shared) -> Router {
    let api = Router::new()
        .route("/auth/signin", post(sign_in))
        .route("/auth/register", post(register))
        .route("/users/me", get(me))
        .route("/products", get(list_products))
        .route("/products/{id}", get(get_product))
        .route("/cart", get(get_cart).post(add_to_cart).delete(clear_cart))
        .route("/cart/{id}", put(update_cart_item).delete(remove_cart_item))
        .route("/wishlist", get(get_wishlist).post(add_to_wishlist))
        .route("/wishlist/{id}", delete(remove_from_wishlist))
        .route("/addresses", get(list_addresses).post(add_address))
        .route("/addresses/{id}", delete(delete_address))
        .route("/orders/user/{id}", get(user_orders))
        .route("/orders/checkout-session/{id}", post(checkout_session))
        .route("/orders/{id}", post(create_cash_order));

    Router::new()
        .nest(API_PREFIX, api)
        .layer(middleware::from_fn_with_state(state.clone(), record))
        .with_state(state)
}

// =============================================================================
// MockUpstream
// =============================================================================

/// A running mock upstream. The server stops when this is dropped.
pub struct MockUpstream {
    base_url: String,
    state: Shared,
    server: JoinHandle<()>,
}

impl MockUpstream {
    /// Bind an ephemeral port and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state: Shared = Arc::new(Mutex::new(MockState::seeded()));

        let app = router(state.clone());
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Mock upstream stopped");
            }
        });

        Ok(Self {
            base_url: format!("http://{addr}{API_PREFIX}"),
            state,
            server,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Storefront configuration pointing at this mock.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is rejected.
    pub fn config(&self) -> bazaar_storefront::Result<StorefrontConfig> {
        let base_url = self.base_url.clone();
        StorefrontConfig::from_lookup(|key| match key {
            "BAZAAR_API_BASE_URL" => Some(base_url.clone()),
            "BAZAAR_CHECKOUT_RETURN_URL" => Some(CHECKOUT_RETURN_URL.to_string()),
            "BAZAAR_REQUEST_TIMEOUT_SECS" => Some("5".to_string()),
            _ => None,
        })
        .map_err(AppError::from)
    }

    /// A storefront with an in-memory session.
    ///
    /// # Errors
    ///
    /// Returns an error if the storefront cannot be built.
    pub fn storefront(&self) -> bazaar_storefront::Result<Storefront> {
        self.storefront_with(SessionStore::in_memory(TimeDelta::days(7)))
    }

    /// A storefront over the given session store.
    ///
    /// # Errors
    ///
    /// Returns an error if the storefront cannot be built.
    pub fn storefront_with(&self, store: SessionStore) -> bazaar_storefront::Result<Storefront> {
        Storefront::with_session_store(self.config()?, store)
    }

    /// Credentials the mock accepts.
    #[must_use]
    pub fn shopper_sign_in() -> SignInForm {
        SignInForm {
            email: SHOPPER_EMAIL.to_string(),
            password: SecretString::from(SHOPPER_PASSWORD),
        }
    }

    /// Issue a token for `user_id` without going through sign-in.
    #[must_use]
    pub fn issue_token(&self, user_id: &str) -> String {
        lock(&self.state).issue_token(user_id)
    }

    /// Tokens issued so far that belong to `user_id`.
    #[must_use]
    pub fn tokens_of(&self, user_id: &str) -> Vec<String> {
        lock(&self.state)
            .sessions
            .iter()
            .filter(|(_, user)| user.as_str() == user_id)
            .map(|(token, _)| token.clone())
            .collect()
    }

    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state).requests.clone()
    }

    pub fn clear_requests(&self) {
        lock(&self.state).requests.clear();
    }

    /// Answer the next `method path` request with `status`.
    pub fn fail_next(&self, method: &str, path: &str, status: StatusCode) {
        lock(&self.state)
            .failures
            .insert((method.to_string(), path.to_string()), status);
    }

    /// Make checkout sessions come back without a URL.
    pub fn omit_checkout_url(&self) {
        lock(&self.state).omit_checkout_url = true;
    }

    /// Make cart mutations answer with bare product ids in each line.
    pub fn unpopulated_cart_replies(&self) {
        lock(&self.state).unpopulated_cart_replies = true;
    }

    /// Return URLs sent with checkout session requests.
    #[must_use]
    pub fn checkout_return_urls(&self) -> Vec<String> {
        lock(&self.state).checkout_returns.clone()
    }

    #[must_use]
    pub fn orders(&self) -> Vec<Value> {
        lock(&self.state).orders.clone()
    }

    /// Whether the server holds a cart for `user_id`.
    #[must_use]
    pub fn has_cart(&self, user_id: &str) -> bool {
        lock(&self.state).carts.contains_key(user_id)
    }

    /// Canonical product ids in the server-side wishlist.
    #[must_use]
    pub fn wishlist_of(&self, user_id: &str) -> Vec<String> {
        lock(&self.state)
            .wishlists
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.server.abort();
    }
}
