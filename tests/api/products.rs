use reqwest::Method;
use watchstore::{db_interaction::{OrderWithItems, ProductPage}, models::Product, routes::CartView};

use crate::helpers::TestApp;

#[actix_web::test]
async fn products_can_be_filtered_and_sorted(){
    let app = TestApp::spawn_app().await;
    app.insert_product("Presage", "Seiko", 1_500_000, 4);
    app.insert_product("Seamaster", "Omega", 25_000_000, 1);
    app.insert_product("Khaki Field", "Hamilton", 2_200_000, 0);

    let response = app.api_client.get(format!("{}/products?sort=price_asc", app.get_app_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let page = response.json::<ProductPage>().await.unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.page, 1);
    let names: Vec<&str> = page.items.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Presage", "Khaki Field", "Seamaster"]);

    let page = app.api_client.get(format!("{}/products?in_stock=true&max_price=3000000", app.get_app_url()))
        .send()
        .await
        .unwrap()
        .json::<ProductPage>()
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].brand, "Seiko");

    let page = app.api_client.get(format!("{}/products?search=sea", app.get_app_url()))
        .send()
        .await
        .unwrap()
        .json::<ProductPage>()
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].name, "Seamaster");
}

#[actix_web::test]
async fn products_are_paginated(){
    let app = TestApp::spawn_app().await;
    for i in 0..5 {
        app.insert_product(&format!("Model {}", i), "Casio", 100_000 + i, 3);
    }

    let page = app.api_client.get(format!("{}/products?sort=name&page=2&limit=2", app.get_app_url()))
        .send()
        .await
        .unwrap()
        .json::<ProductPage>()
        .await
        .unwrap();

    assert_eq!(page.total, 5);
    assert_eq!(page.limit, 2);
    let names: Vec<&str> = page.items.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Model 2", "Model 3"]);
}

#[actix_web::test]
async fn invalid_price_range_is_400(){
    let app = TestApp::spawn_app().await;

    let response = app.api_client.get(format!("{}/products?min_price=500&max_price=100", app.get_app_url()))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
}

#[actix_web::test]
async fn brands_are_distinct_and_sorted(){
    let app = TestApp::spawn_app().await;
    app.insert_product("Presage", "Seiko", 1_500_000, 4);
    app.insert_product("5 Sports", "Seiko", 1_000_000, 4);
    app.insert_product("Seamaster", "Omega", 25_000_000, 1);

    let brands = app.api_client.get(format!("{}/products/brands", app.get_app_url()))
        .send()
        .await
        .unwrap()
        .json::<Vec<String>>()
        .await
        .unwrap();

    assert_eq!(brands, vec!["Omega", "Seiko"]);
}

#[actix_web::test]
async fn get_product_by_id(){
    let app = TestApp::spawn_app().await;
    let product = app.insert_product("Presage", "Seiko", 1_500_000, 4);

    let response = app.api_client.get(format!("{}/products/{}", app.get_app_url(), product.product_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.json::<Product>().await.unwrap().product_id, product.product_id);

    let response = app.api_client.get(format!("{}/products/{}", app.get_app_url(), uuid::Uuid::new_v4()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[actix_web::test]
async fn admin_can_create_update_and_delete_products(){
    let app = TestApp::spawn_app().await;
    let admin = app.create_user(true).await;

    let response = app.send_json_as(Method::POST, "/admin/products", &admin.token, &serde_json::json!({
        "name": "Tank Must",
        "brand": "Cartier",
        "category": "Quartz",
        "gender": "women",
        "price": 15_000_000,
        "compare_at_price": 17_000_000,
        "stock": 2,
        "images": ["https://img.example.com/tank.jpg"]
    })).await;
    assert_eq!(response.status().as_u16(), 201);
    let product = response.json::<Product>().await.unwrap();
    assert_eq!(product.category, "quartz");
    assert_eq!(product.gender, "women");

    let response = app.send_json_as(
        Method::PUT,
        &format!("/admin/products/{}", product.product_id),
        &admin.token,
        &serde_json::json!({ "stock": 7, "is_featured": true })
    ).await;
    assert_eq!(response.status().as_u16(), 200);
    let updated = response.json::<Product>().await.unwrap();
    assert_eq!(updated.stock, 7);
    assert!(updated.is_featured);
    assert_eq!(updated.name, "Tank Must");

    // compare-at price must stay above the price
    let response = app.send_json_as(
        Method::PUT,
        &format!("/admin/products/{}", product.product_id),
        &admin.token,
        &serde_json::json!({ "price": 18_000_000 })
    ).await;
    assert_eq!(response.status().as_u16(), 400);

    let response = app.delete_as(&format!("/admin/products/{}", product.product_id), &admin.token).await;
    assert_eq!(response.status().as_u16(), 204);

    let response = app.delete_as(&format!("/admin/products/{}", product.product_id), &admin.token).await;
    assert_eq!(response.status().as_u16(), 404);
}

#[actix_web::test]
async fn invalid_products_are_rejected(){
    let app = TestApp::spawn_app().await;
    let admin = app.create_user(true).await;

    let test_cases = vec![
        (serde_json::json!({ "name": "", "brand": "Seiko", "category": "automatic", "price": 100, "stock": 1 }), "empty name"),
        (serde_json::json!({ "name": "A", "brand": "Seiko", "category": "automatic", "price": 0, "stock": 1 }), "zero price"),
        (serde_json::json!({ "name": "A", "brand": "Seiko", "category": "automatic", "price": 100, "stock": -1 }), "negative stock"),
        (serde_json::json!({ "name": "A", "brand": "Seiko", "category": "automatic", "price": 100, "stock": 1, "images": ["nope"] }), "bad image url"),
    ];

    for (body, description) in test_cases {
        let response = app.send_json_as(Method::POST, "/admin/products", &admin.token, &body).await;
        assert_eq!(response.status().as_u16(), 400, "The API did not reject {}", description);
    }
}

#[actix_web::test]
async fn customers_cannot_manage_products(){
    let app = TestApp::spawn_app().await;
    let user = app.create_user(false).await;

    let response = app.send_json_as(Method::POST, "/admin/products", &user.token, &serde_json::json!({
        "name": "Presage",
        "brand": "Seiko",
        "category": "automatic",
        "price": 1_500_000,
        "stock": 1
    })).await;

    assert_eq!(response.status().as_u16(), 403);
}

#[actix_web::test]
async fn deleting_product_empties_carts_and_keeps_order_snapshot(){
    let app = TestApp::spawn_app().await;
    app.accept_emails().await;
    let admin = app.create_user(true).await;
    let browsing = app.create_user(false).await;
    let buyer = app.create_user(false).await;
    let product = app.insert_product("Submariner", "Rolex", 45_000_000, 5);

    app.add_to_cart(&browsing.token, product.product_id, 1).await;
    app.add_to_cart(&buyer.token, product.product_id, 2).await;
    let placed = app.checkout(&buyer.token, &serde_json::json!({ "payment_method": "cod" }), None).await
        .json::<OrderWithItems>()
        .await
        .unwrap();

    let response = app.delete_as(&format!("/admin/products/{}", product.product_id), &admin.token).await;
    assert_eq!(response.status().as_u16(), 204);

    let cart = app.get_as("/user/cart", &browsing.token).await.json::<CartView>().await.unwrap();
    assert!(cart.items.is_empty());

    let order = app.get_as(&format!("/user/orders/{}", placed.order.order_id), &buyer.token).await
        .json::<OrderWithItems>()
        .await
        .unwrap();
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].product_name, "Rolex Submariner");
    assert_eq!(order.items[0].unit_price, 45_000_000);
    assert_eq!(order.items[0].quantity, 2);
    assert_eq!(order.items[0].product_id, None);
}

#[actix_web::test]
async fn admin_can_end_a_sale(){
    let app = TestApp::spawn_app().await;
    let admin = app.create_user(true).await;

    let response = app.send_json_as(Method::POST, "/admin/products", &admin.token, &serde_json::json!({
        "name": "Khaki Field",
        "brand": "Hamilton",
        "description": "Hand wound",
        "category": "manual",
        "price": 2_000_000,
        "compare_at_price": 2_400_000,
        "stock": 4
    })).await;
    let product = response.json::<Product>().await.unwrap();

    let response = app.send_json_as(
        Method::PUT,
        &format!("/admin/products/{}", product.product_id),
        &admin.token,
        &serde_json::json!({ "compare_at_price": null, "description": "" })
    ).await;
    assert_eq!(response.status().as_u16(), 200);

    let updated = response.json::<Product>().await.unwrap();
    assert_eq!(updated.compare_at_price, None);
    assert_eq!(updated.description, None);
    assert_eq!(updated.price, 2_000_000);
}

#[actix_web::test]
async fn huge_page_returns_an_empty_page(){
    let app = TestApp::spawn_app().await;
    app.insert_product("Presage", "Seiko", 150_000, 3);

    let response = app.api_client.get(format!("{}/products?page={}", app.get_app_url(), i64::MAX))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let page = response.json::<ProductPage>().await.unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.total, 1);
}
