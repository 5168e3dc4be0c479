//! End-to-end basket and checkout against a scratch database.
//!
//! Requires a scratch database: run with `PLANBE_TEST_DATABASE_URL` set and
//! `-- --ignored`. Every test registers its own users and products, so runs
//! do not interfere.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use planbe_core::{
    CoreError, DeliveryDetails, Email, NewOrder, Price, Product, ProductId, UserId,
};
use planbe_integration_tests::{TestApp, test_pool, unique};
use planbe_server::db;
use planbe_server::db::users::UserRepository;
use planbe_server::models::NewUser;
use planbe_server::services::ShopError;
use planbe_server::services::catalog::CatalogService;
use planbe_server::services::checkout::CheckoutService;
use planbe_server::services::email::{EmailError, Notification, Notifier};

const PASSWORD: &str = "tostadas-con-aceite";

async fn seed_product(app: &TestApp, cents: i64) -> String {
    insert_product(&app.pool, cents).await
}

async fn insert_product(pool: &sqlx::PgPool, cents: i64) -> String {
    let id = unique("p-");
    let product = Product {
        id: ProductId::new(id.clone()),
        kind: "pastry".to_owned(),
        name: format!("Croissant {id}"),
        price: Price::from_cents(cents),
        image: "/img/croissant.jpg".to_owned(),
        description: "Butter croissant".to_owned(),
    };
    db::products::upsert(pool, &product).await.unwrap();
    id
}

/// Register and log in; returns the user id.
async fn sign_in(app: &mut TestApp) -> String {
    let username = unique("user");
    let resp = app
        .send(
            Method::POST,
            "/users",
            Some(&json!({
                "name": "Ana",
                "surname": "Ruiz",
                "email": format!("{username}@example.com"),
                "username": username,
                "password": PASSWORD
            })),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text);
    let id = resp.body["data"]["id"].as_str().unwrap().to_owned();
    assert!(resp.body["data"].get("password_hash").is_none());

    let resp = app
        .send(
            Method::POST,
            "/auth",
            Some(&json!({ "username": username, "password": PASSWORD })),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text);
    assert_eq!(resp.body["data"]["id"], id.as_str());

    id
}

fn line<'a>(basket: &'a Value, product: &str) -> &'a Value {
    basket["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|item| item["id"] == product)
        .unwrap()
}

fn delivery() -> Value {
    json!({
        "place": "Calle Mayor 1, Madrid",
        "day": "14",
        "month": "February",
        "year": "2027",
        "time": "08:00-09:00",
        "comments": "  Ring twice  ",
        "paid": true
    })
}

#[tokio::test]
#[ignore = "Requires PLANBE_TEST_DATABASE_URL"]
async fn test_basket_to_finalized_order() {
    let mut app = TestApp::online().await;
    let croissant = seed_product(&app, 180).await;
    let juice = seed_product(&app, 250).await;
    let id = sign_in(&mut app).await;

    // Basket starts empty
    let resp = app.send(Method::GET, &format!("/cart/{id}"), None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["data"]["items"], json!([]));

    // Two croissants and a juice, aggregated one line per product
    for uri in [
        format!("/cart/{id}/product/{croissant}"),
        format!("/cart/{id}/product/{juice}"),
        format!("/cart/{id}/more/{croissant}"),
    ] {
        let resp = app.send(Method::PATCH, &uri, None).await;
        assert_eq!(resp.status, StatusCode::OK, "{uri}: {}", resp.text);
    }
    let resp = app.send(Method::GET, &format!("/cart/{id}"), None).await;
    assert_eq!(resp.body["data"]["items"].as_array().unwrap().len(), 2);
    assert_eq!(line(&resp.body, &croissant)["quantity"], 2);
    assert_eq!(line(&resp.body, &juice)["quantity"], 1);
    assert_eq!(resp.body["data"]["total"], "6.10");

    // Removing one unit keeps the other
    let resp = app
        .send(Method::DELETE, &format!("/cart/product/{croissant}"), None)
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(line(&resp.body, &croissant)["quantity"], 1);
    assert_eq!(resp.body["data"]["total"], "4.30");
    app.send(Method::PATCH, &format!("/cart/{id}/more/{croissant}"), None)
        .await;

    // Open the order; a second pending order is refused
    let order = json!({ "products": [croissant, croissant, juice], "total": "6.10" });
    let resp = app.send(Method::POST, &format!("/cart/{id}"), Some(&order)).await;
    assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text);
    let order_id = resp.body["data"]["id"].as_str().unwrap().to_owned();
    assert_eq!(resp.body["data"]["paid"], false);

    let resp = app.send(Method::POST, &format!("/cart/{id}"), Some(&order)).await;
    assert_eq!(resp.status, StatusCode::CONFLICT);

    // Finalize: delivery attached, basket emptied
    let resp = app
        .send(Method::PATCH, &format!("/setorder/{id}"), Some(&delivery()))
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text);
    assert_eq!(resp.body["data"]["id"], order_id.as_str());
    assert_eq!(resp.body["data"]["comments"], "Ring twice");
    assert_eq!(resp.body["data"]["paid"], true);

    let resp = app.send(Method::GET, &format!("/cart/{id}"), None).await;
    assert_eq!(resp.body["data"]["items"], json!([]));

    // Nothing pending anymore
    let resp = app
        .send(Method::PATCH, &format!("/setorder/{id}"), Some(&delivery()))
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    // History resolves products
    let resp = app.send(Method::GET, &format!("/vieworders/{id}"), None).await;
    assert_eq!(resp.status, StatusCode::OK);
    let orders = resp.body["data"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["state"], "finalized");
    assert_eq!(orders[0]["products"].as_array().unwrap().len(), 3);
    assert_eq!(orders[0]["products"][2]["id"], juice.as_str());
}

#[tokio::test]
#[ignore = "Requires PLANBE_TEST_DATABASE_URL"]
async fn test_discard_unfinished_orders() {
    let mut app = TestApp::online().await;
    let product = seed_product(&app, 390).await;
    let id = sign_in(&mut app).await;

    let resp = app
        .send(
            Method::POST,
            &format!("/cart/{id}"),
            Some(&json!({ "products": [product], "total": "3.90" })),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);
    let order_id = resp.body["data"]["id"].clone();

    let resp = app.send(Method::DELETE, &format!("/setorder/{id}"), None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["data"]["discarded"], json!([order_id]));

    // Idempotent
    let resp = app.send(Method::DELETE, &format!("/setorder/{id}"), None).await;
    assert_eq!(resp.body["data"]["discarded"], json!([]));

    let resp = app.send(Method::GET, &format!("/vieworders/{id}"), None).await;
    assert_eq!(resp.body["data"], json!([]));
}

#[tokio::test]
#[ignore = "Requires PLANBE_TEST_DATABASE_URL"]
async fn test_order_validation() {
    let mut app = TestApp::online().await;
    let product = seed_product(&app, 120).await;
    let id = sign_in(&mut app).await;

    let resp = app
        .send(
            Method::POST,
            &format!("/cart/{id}"),
            Some(&json!({ "products": [], "total": "0" })),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = app
        .send(
            Method::POST,
            &format!("/cart/{id}"),
            Some(&json!({ "products": ["no-such-product"], "total": "1.00" })),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let resp = app
        .send(Method::PATCH, &format!("/cart/{id}/product/no-such-product"), None)
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    // Unpaid delivery cannot finalize
    app.send(
        Method::POST,
        &format!("/cart/{id}"),
        Some(&json!({ "products": [product], "total": "1.20" })),
    )
    .await;
    let mut unpaid = delivery();
    unpaid["paid"] = json!(false);
    let resp = app
        .send(Method::PATCH, &format!("/setorder/{id}"), Some(&unpaid))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires PLANBE_TEST_DATABASE_URL"]
async fn test_users_cannot_touch_each_other() {
    let mut ana = TestApp::online().await;
    let mut luis = TestApp::online().await;
    let ana_id = sign_in(&mut ana).await;
    let luis_id = sign_in(&mut luis).await;

    for (method, uri) in [
        (Method::GET, format!("/cart/{luis_id}")),
        (Method::GET, format!("/vieworders/{luis_id}")),
        (Method::GET, format!("/users/{luis_id}")),
        (Method::DELETE, format!("/setorder/{luis_id}")),
    ] {
        let resp = ana.send(method.clone(), &uri, None).await;
        assert_eq!(resp.status, StatusCode::FORBIDDEN, "{method} {uri}");
    }

    let resp = ana.send(Method::GET, &format!("/users/{ana_id}"), None).await;
    assert_eq!(resp.status, StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires PLANBE_TEST_DATABASE_URL"]
async fn test_duplicate_registration_and_bad_login() {
    let mut app = TestApp::online().await;
    let username = unique("dup");
    let form = json!({
        "name": "Ana",
        "surname": "Ruiz",
        "email": format!("{username}@example.com"),
        "username": username,
        "password": PASSWORD
    });

    let resp = app.send(Method::POST, "/users", Some(&form)).await;
    assert_eq!(resp.status, StatusCode::CREATED);
    let resp = app.send(Method::POST, "/users", Some(&form)).await;
    assert_eq!(resp.status, StatusCode::CONFLICT);

    let resp = app
        .send(
            Method::POST,
            "/auth",
            Some(&json!({ "username": username, "password": "wrong-password" })),
        )
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.body["error"], "Invalid username or password");
}

#[tokio::test]
#[ignore = "Requires PLANBE_TEST_DATABASE_URL"]
async fn test_profile_update_and_logout() {
    let mut app = TestApp::online().await;
    let id = sign_in(&mut app).await;
    let username = unique("renamed");

    let resp = app
        .send(
            Method::PATCH,
            &format!("/update/{id}"),
            Some(&json!({
                "name": "Ana María",
                "surname": "Ruiz",
                "email": format!("{username}@example.com"),
                "username": username,
                "password": PASSWORD
            })),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text);
    assert_eq!(resp.body["data"]["name"], "Ana María");
    assert_eq!(resp.body["data"]["username"], username.as_str());

    // Wrong current password
    let resp = app
        .send(
            Method::PATCH,
            &format!("/update/{id}"),
            Some(&json!({
                "name": "Ana",
                "surname": "Ruiz",
                "email": format!("{username}@example.com"),
                "username": username,
                "password": "not-my-password"
            })),
        )
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);

    let resp = app.send(Method::POST, "/auth/logout", None).await;
    assert_eq!(resp.status, StatusCode::OK);
    app.forget_session();

    let resp = app.send(Method::GET, &format!("/users/{id}"), None).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

/// Drops every notification.
struct Silent;

impl Notifier for Silent {
    async fn send(&self, _notification: Notification) -> Result<(), EmailError> {
        Ok(())
    }
}

const CONCURRENT_REQUESTS: usize = 8;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "Requires PLANBE_TEST_DATABASE_URL"]
async fn test_concurrent_checkout_has_one_winner() {
    let pool = test_pool().await;
    let catalog = CatalogService::new(pool.clone());
    let product = ProductId::new(insert_product(&pool, 250).await);

    let username = unique("race");
    let user = UserId::generate();
    UserRepository::new(&pool)
        .create(
            &user,
            &NewUser {
                kind: "customer".to_owned(),
                name: "Ana".to_owned(),
                surname: "Ruiz".to_owned(),
                email: Email::parse(&format!("{username}@example.com")).unwrap(),
                username,
                password_hash: "unused".to_owned(),
            },
        )
        .await
        .unwrap();
    db::baskets::push(&pool, &user, &product).await.unwrap();

    // Phase 1: parallel order creation for one user
    let mut handles = Vec::new();
    for _ in 0..CONCURRENT_REQUESTS {
        let (pool, catalog, user) = (pool.clone(), catalog.clone(), user.clone());
        let new = NewOrder {
            products: vec![product.clone()],
            total: Price::from_cents(250),
        };
        handles.push(tokio::spawn(async move {
            CheckoutService::new(&pool, &catalog, &Silent)
                .create_order(&user, new)
                .await
                .map(|_| ())
        }));
    }
    let (mut created, mut conflicts) = (0, 0);
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => created += 1,
            Err(ShopError::Core(CoreError::Conflict(_))) => conflicts += 1,
            Err(err) => panic!("unexpected create error: {err}"),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(conflicts, CONCURRENT_REQUESTS - 1);

    // Phase 2: parallel finalize of the single pending order
    let mut handles = Vec::new();
    for _ in 0..CONCURRENT_REQUESTS {
        let (pool, catalog, user) = (pool.clone(), catalog.clone(), user.clone());
        let details = DeliveryDetails {
            place: "Calle Mayor 1, Madrid".to_owned(),
            day: "14".to_owned(),
            month: "2".to_owned(),
            year: "2027".to_owned(),
            time: "08:00-09:00".to_owned(),
            comments: None,
            paid: true,
        };
        handles.push(tokio::spawn(async move {
            CheckoutService::new(&pool, &catalog, &Silent)
                .finalize(&user, details)
                .await
                .map(|_| ())
        }));
    }
    let (mut finalized, mut missing) = (0, 0);
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => finalized += 1,
            Err(ShopError::Core(CoreError::NotFound(_))) => missing += 1,
            Err(err) => panic!("unexpected finalize error: {err}"),
        }
    }
    assert_eq!(finalized, 1);
    assert_eq!(missing, CONCURRENT_REQUESTS - 1);

    let basket = db::baskets::load(&pool, &user).await.unwrap();
    assert!(basket.ids().is_empty());

    let orders = db::orders::list(&pool, &user).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert!(!orders[0].is_pending());
}
