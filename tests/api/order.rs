use diesel::{ExpressionMethods, QueryDsl, RunQueryDsl};
use reqwest::Method;
use watchstore::{db_interaction::OrderWithItems, routes::CartView, schema::{orders, products}};
use wiremock::{matchers::{method, path}, Mock, ResponseTemplate};

use crate::helpers::{ReceiveEmailRequest, TestApp, TestUser};

fn cod_checkout() -> serde_json::Value{
    serde_json::json!({ "payment_method": "cod" })
}

pub async fn place_order(app: &TestApp, user: &TestUser, payment_method: &str, quantity: i32) -> OrderWithItems{
    let product = app.insert_product("Presage", "Seiko", 150_000, 10);
    app.add_to_cart(&user.token, product.product_id, quantity).await;

    let response = app.checkout(&user.token, &serde_json::json!({ "payment_method": payment_method }), None).await;
    assert_eq!(response.status().as_u16(), 201);
    response.json::<OrderWithItems>().await.unwrap()
}

#[actix_web::test]
async fn checkout_creates_order_from_cart(){
    let app = TestApp::spawn_app().await;
    let user = app.create_user(false).await;
    let product = app.insert_product("Presage", "Seiko", 150_000, 5);

    Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_api)
        .await;

    app.add_to_cart(&user.token, product.product_id, 2).await;

    let response = app.checkout(&user.token, &cod_checkout(), None).await;
    assert_eq!(response.status().as_u16(), 201);

    let placed = response.json::<OrderWithItems>().await.unwrap();
    assert!(placed.order.order_number.starts_with("WS-"));
    assert_eq!(placed.order.status, "pending");
    assert_eq!(placed.order.payment_status, "pending");
    assert_eq!(placed.order.subtotal, 300_000);
    assert_eq!(placed.order.shipping_fee, 7_500);
    assert_eq!(placed.order.cod_fee, 2_000);
    assert_eq!(placed.order.total, 309_500);
    assert_eq!(placed.order.shipping_city, "Cairo");
    assert_eq!(placed.order.shipping_phone, "+201012345678");

    assert_eq!(placed.items.len(), 1);
    assert_eq!(placed.items[0].product_name, "Seiko Presage");
    assert_eq!(placed.items[0].unit_price, 150_000);
    assert_eq!(placed.items[0].quantity, 2);

    assert_eq!(app.product_stock(product.product_id), 3);

    let cart = app.get_as("/user/cart", &user.token).await.json::<CartView>().await.unwrap();
    assert!(cart.items.is_empty());
}

#[actix_web::test]
async fn checkout_sends_order_confirmation_email(){
    let app = TestApp::spawn_app().await;
    let user = app.create_user(false).await;

    let guard = Mock::given(path("/email"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount_as_scoped(&app.email_api)
        .await;

    let placed = place_order(&app, &user, "cod", 1).await;

    let requests = guard.received_requests().await;
    let email: ReceiveEmailRequest = requests[0].body_json().unwrap();
    assert_eq!(email.to, user.email);
    assert!(email.subject.contains(&placed.order.order_number));
    assert!(email.text_body.contains("Seiko Presage"));
}

#[actix_web::test]
async fn checkout_succeeds_when_email_fails(){
    let app = TestApp::spawn_app().await;
    let user = app.create_user(false).await;

    Mock::given(path("/email"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&app.email_api)
        .await;

    place_order(&app, &user, "cod", 1).await;
}

#[actix_web::test]
async fn free_shipping_applies_above_threshold(){
    let app = TestApp::spawn_app().await;
    app.accept_emails().await;
    let user = app.create_user(false).await;

    let placed = place_order(&app, &user, "bank_transfer", 4).await;

    assert_eq!(placed.order.subtotal, 600_000);
    assert_eq!(placed.order.shipping_fee, 0);
    assert_eq!(placed.order.cod_fee, 0);
    assert_eq!(placed.order.total, 600_000);
}

#[actix_web::test]
async fn checkout_with_empty_cart_is_400(){
    let app = TestApp::spawn_app().await;
    let user = app.create_user(false).await;

    let response = app.checkout(&user.token, &cod_checkout(), None).await;
    assert_eq!(response.status().as_u16(), 400);
}

#[actix_web::test]
async fn checkout_validates_payment_and_shipping(){
    let app = TestApp::spawn_app().await;
    let user = app.create_user(false).await;
    let product = app.insert_product("Presage", "Seiko", 150_000, 5);
    app.add_to_cart(&user.token, product.product_id, 1).await;

    let test_cases = vec![
        (serde_json::json!({ "payment_method": "mobile_wallet" }), "wallet without provider"),
        (serde_json::json!({ "payment_method": "mobile_wallet", "wallet_provider": "paypal" }), "unknown wallet"),
        (serde_json::json!({ "payment_method": "cod", "shipping": { "phone": "12" } }), "invalid phone"),
        (serde_json::json!({ "payment_method": "cod", "shipping": { "address": "  " } }), "blank address"),
    ];

    for (body, description) in test_cases {
        let response = app.checkout(&user.token, &body, None).await;
        assert_eq!(response.status().as_u16(), 400, "The API did not reject {}", description);
    }

    // Nothing was ordered so the stock is untouched
    assert_eq!(app.product_stock(product.product_id), 5);
}

#[actix_web::test]
async fn checkout_with_insufficient_stock_is_409(){
    let app = TestApp::spawn_app().await;
    let user = app.create_user(false).await;
    let product = app.insert_product("Presage", "Seiko", 150_000, 5);
    app.add_to_cart(&user.token, product.product_id, 3).await;

    // Someone else bought most of the stock after it was added to the cart
    let mut conn = app.pool.get().unwrap();
    diesel::update(products::table.find(product.product_id))
        .set(products::stock.eq(1))
        .execute(&mut conn)
        .unwrap();

    let response = app.checkout(&user.token, &cod_checkout(), None).await;
    assert_eq!(response.status().as_u16(), 409);

    let body = response.json::<serde_json::Value>().await.unwrap();
    assert_eq!(body["shortages"][0]["product_id"], product.product_id.to_string());
    assert_eq!(body["shortages"][0]["requested"], 3);
    assert_eq!(body["shortages"][0]["available"], 1);

    assert_eq!(app.product_stock(product.product_id), 1);
    let cart = app.get_as("/user/cart", &user.token).await.json::<CartView>().await.unwrap();
    assert_eq!(cart.items.len(), 1);
}

#[actix_web::test]
async fn replayed_idempotency_key_returns_the_same_order(){
    let app = TestApp::spawn_app().await;
    app.accept_emails().await;
    let user = app.create_user(false).await;
    let product = app.insert_product("Presage", "Seiko", 150_000, 5);
    app.add_to_cart(&user.token, product.product_id, 2).await;

    let first = app.checkout(&user.token, &cod_checkout(), Some("checkout-1")).await;
    assert_eq!(first.status().as_u16(), 201);
    let first = first.json::<OrderWithItems>().await.unwrap();

    let second = app.checkout(&user.token, &cod_checkout(), Some("checkout-1")).await;
    assert_eq!(second.status().as_u16(), 200);
    let second = second.json::<OrderWithItems>().await.unwrap();

    assert_eq!(first.order.order_id, second.order.order_id);
    assert_eq!(app.product_stock(product.product_id), 3);

    let orders = app.get_as("/user/orders", &user.token).await
        .json::<Vec<OrderWithItems>>()
        .await
        .unwrap();
    assert_eq!(orders.len(), 1);
}

#[actix_web::test]
async fn orders_are_listed_newest_first(){
    let app = TestApp::spawn_app().await;
    app.accept_emails().await;
    let user = app.create_user(false).await;

    let older = place_order(&app, &user, "cod", 1).await;
    let newer = place_order(&app, &user, "bank_transfer", 1).await;

    let orders = app.get_as("/user/orders", &user.token).await
        .json::<Vec<OrderWithItems>>()
        .await
        .unwrap();

    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].order.order_id, newer.order.order_id);
    assert_eq!(orders[1].order.order_id, older.order.order_id);
    assert_eq!(orders[1].items.len(), 1);
}

#[actix_web::test]
async fn orders_are_only_visible_to_owner_and_admins(){
    let app = TestApp::spawn_app().await;
    app.accept_emails().await;
    let owner = app.create_user(false).await;
    let stranger = app.create_user(false).await;
    let admin = app.create_user(true).await;

    let placed = place_order(&app, &owner, "cod", 1).await;
    let order_path = format!("/user/orders/{}", placed.order.order_id);

    assert_eq!(app.get_as(&order_path, &owner.token).await.status().as_u16(), 200);
    assert_eq!(app.get_as(&order_path, &stranger.token).await.status().as_u16(), 404);
    assert_eq!(app.get_as(&order_path, &admin.token).await.status().as_u16(), 200);
}

#[actix_web::test]
async fn cancelling_pending_order_restores_stock(){
    let app = TestApp::spawn_app().await;
    app.accept_emails().await;
    let user = app.create_user(false).await;
    let product = app.insert_product("Presage", "Seiko", 150_000, 5);
    app.add_to_cart(&user.token, product.product_id, 2).await;

    let placed = app.checkout(&user.token, &cod_checkout(), None).await
        .json::<OrderWithItems>()
        .await
        .unwrap();
    assert_eq!(app.product_stock(product.product_id), 3);

    let cancel_path = format!("/user/orders/{}/cancel", placed.order.order_id);
    let response = app.send_json_as(Method::POST, &cancel_path, &user.token, &serde_json::json!({})).await;
    assert_eq!(response.status().as_u16(), 200);
    let cancelled = response.json::<OrderWithItems>().await.unwrap();
    assert_eq!(cancelled.order.status, "cancelled");
    assert_eq!(app.product_stock(product.product_id), 5);

    // A cancelled order cannot be cancelled again
    let response = app.send_json_as(Method::POST, &cancel_path, &user.token, &serde_json::json!({})).await;
    assert_eq!(response.status().as_u16(), 409);
    assert_eq!(app.product_stock(product.product_id), 5);
}

#[actix_web::test]
async fn customers_cannot_cancel_other_orders(){
    let app = TestApp::spawn_app().await;
    app.accept_emails().await;
    let owner = app.create_user(false).await;
    let stranger = app.create_user(false).await;

    let placed = place_order(&app, &owner, "cod", 1).await;

    let response = app.send_json_as(
        Method::POST,
        &format!("/user/orders/{}/cancel", placed.order.order_id),
        &stranger.token,
        &serde_json::json!({})
    ).await;
    assert_eq!(response.status().as_u16(), 404);
}

#[actix_web::test]
async fn payment_proof_moves_payment_to_verification(){
    let app = TestApp::spawn_app().await;
    app.accept_emails().await;
    let user = app.create_user(false).await;

    let placed = place_order(&app, &user, "bank_transfer", 1).await;
    let proof_path = format!("/user/orders/{}/payment", placed.order.order_id);

    let response = app.send_json_as(Method::POST, &proof_path, &user.token, &serde_json::json!({
        "reference": "TRX-20241102-77",
        "proof_url": "https://img.example.com/receipt.png"
    })).await;
    assert_eq!(response.status().as_u16(), 200);

    let updated = response.json::<OrderWithItems>().await.unwrap();
    assert_eq!(updated.order.payment_status, "awaiting_verification");
    assert_eq!(updated.order.payment_reference.as_deref(), Some("TRX-20241102-77"));

    // Already waiting for an admin
    let response = app.send_json_as(Method::POST, &proof_path, &user.token, &serde_json::json!({
        "reference": "TRX-20241102-78"
    })).await;
    assert_eq!(response.status().as_u16(), 409);
}

#[actix_web::test]
async fn payment_proof_is_refused_for_cod_orders(){
    let app = TestApp::spawn_app().await;
    app.accept_emails().await;
    let user = app.create_user(false).await;

    let placed = place_order(&app, &user, "cod", 1).await;

    let response = app.send_json_as(
        Method::POST,
        &format!("/user/orders/{}/payment", placed.order.order_id),
        &user.token,
        &serde_json::json!({ "reference": "TRX-1" })
    ).await;
    assert_eq!(response.status().as_u16(), 409);
}

#[actix_web::test]
async fn wallet_checkout_records_provider(){
    let app = TestApp::spawn_app().await;
    app.accept_emails().await;
    let user = app.create_user(false).await;
    let product = app.insert_product("Presage", "Seiko", 150_000, 5);
    app.add_to_cart(&user.token, product.product_id, 1).await;

    let response = app.checkout(&user.token, &serde_json::json!({
        "payment_method": "mobile_wallet",
        "wallet_provider": "Vodafone_Cash",
        "notes": "  call before delivery  "
    }), None).await;
    assert_eq!(response.status().as_u16(), 201);

    let placed = response.json::<OrderWithItems>().await.unwrap();
    assert_eq!(placed.order.payment_method, "mobile_wallet");
    assert_eq!(placed.order.wallet_provider.as_deref(), Some("vodafone_cash"));
    assert_eq!(placed.order.notes.as_deref(), Some("call before delivery"));
}

#[actix_web::test]
async fn payment_methods_lists_store_accounts(){
    let app = TestApp::spawn_app().await;

    let body = app.api_client.get(format!("{}/payment-methods", app.get_app_url()))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();

    assert_eq!(body["currency"], "EGP");
    let methods = body["methods"].as_array().unwrap();
    assert_eq!(methods.len(), 3);
    assert_eq!(methods[0]["method"], "cod");
    assert_eq!(methods[0]["fee"], 2_000);
    assert_eq!(methods[2]["wallets"].as_array().unwrap().len(), 2);
}

#[actix_web::test]
async fn payment_proof_for_another_customers_order_is_404(){
    let app = TestApp::spawn_app().await;
    app.accept_emails().await;
    let owner = app.create_user(false).await;
    let stranger = app.create_user(false).await;

    for method in ["cod", "bank_transfer"] {
        let placed = place_order(&app, &owner, method, 1).await;

        let response = app.send_json_as(
            Method::POST,
            &format!("/user/orders/{}/payment", placed.order.order_id),
            &stranger.token,
            &serde_json::json!({ "reference": "TRX-1" })
        ).await;
        assert_eq!(response.status().as_u16(), 404, "{} order was exposed", method);
    }
}

#[actix_web::test]
async fn concurrent_checkouts_cannot_oversell(){
    let app = TestApp::spawn_app().await;
    app.accept_emails().await;
    let first = app.create_user(false).await;
    let second = app.create_user(false).await;
    let product = app.insert_product("Royal Oak", "Audemars Piguet", 9_000_000, 1);

    app.add_to_cart(&first.token, product.product_id, 1).await;
    app.add_to_cart(&second.token, product.product_id, 1).await;

    let body = cod_checkout();
    let (a, b) = futures_util::join!(
        app.checkout(&first.token, &body, None),
        app.checkout(&second.token, &body, None)
    );

    let mut statuses = vec![a.status().as_u16(), b.status().as_u16()];
    statuses.sort();
    assert_eq!(statuses, vec![201, 409]);
    assert_eq!(app.product_stock(product.product_id), 0);

    let mut conn = app.pool.get().unwrap();
    let placed: i64 = orders::table.count().get_result(&mut conn).unwrap();
    assert_eq!(placed, 1);
}

#[actix_web::test]
async fn concurrent_requests_with_one_key_place_one_order(){
    let app = TestApp::spawn_app().await;
    app.accept_emails().await;
    let user = app.create_user(false).await;
    let product = app.insert_product("Presage", "Seiko", 150_000, 5);
    app.add_to_cart(&user.token, product.product_id, 2).await;

    let body = cod_checkout();
    let (a, b) = futures_util::join!(
        app.checkout(&user.token, &body, Some("double-click")),
        app.checkout(&user.token, &body, Some("double-click"))
    );

    let mut statuses = vec![a.status().as_u16(), b.status().as_u16()];
    statuses.sort();
    assert_eq!(statuses, vec![200, 201]);

    let a = a.json::<OrderWithItems>().await.unwrap();
    let b = b.json::<OrderWithItems>().await.unwrap();
    assert_eq!(a.order.order_id, b.order.order_id);

    let mut conn = app.pool.get().unwrap();
    let placed: i64 = orders::table
        .filter(orders::user_id.eq(user.user_id))
        .count()
        .get_result(&mut conn)
        .unwrap();
    assert_eq!(placed, 1);
    assert_eq!(app.product_stock(product.product_id), 3);
}
