use std::net::TcpListener;

use actix_web::{dev::Server, web, App, HttpServer};
use anyhow::Context;
use diesel::{r2d2::ConnectionManager, PgConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use r2d2::Pool;
use tracing_actix_web::TracingLogger;

use crate::{auth::jwt::Tokenizer, configuration::{DatabaseSettings, JWTSettings, Settings, StoreSettings}, email_client::EmailClient, routes::*, utils::DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

// Largest JSON body accepted by any endpoint
const JSON_LIMIT: usize = 64 * 1024;

// Wrapper so the base url can be told apart from other `String` app data
pub struct BaseUrl(pub String);

pub struct Application{
    pub host: String,
    pub port: u16,
    pub server: Server
}

impl Application {
    pub async fn new(settings: Settings) -> Result<Self, anyhow::Error>{
        let pool = get_connection_pool(&settings.database)?;
        run_migrations(&pool)?;

        let email_client = settings.email.client()?;

        let listener = TcpListener::bind((settings.application.host.as_str(), settings.application.port))
            .context("Failed to bind address")?;
        let port = listener.local_addr()?.port();

        tracing::info!(host = %settings.application.host, port, "Starting server");

        let server = run(
            listener,
            pool,
            email_client,
            settings.application.base_url,
            settings.jwt,
            settings.store
        )?;

        Ok(Self{
            host: settings.application.host,
            port,
            server
        })
    }
}

pub fn get_connection_pool(settings: &DatabaseSettings) -> Result<DbPool, anyhow::Error>{
    Pool::builder()
        .build(ConnectionManager::<PgConnection>::new(settings.get_database_table_url()))
        .context("Failed to build connection pool")
}

fn run_migrations(pool: &DbPool) -> Result<(), anyhow::Error>{
    let mut conn = pool.get()
        .context("Failed to get connection to run migrations")?;

    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;

    Ok(())
}

fn run(
    listener: TcpListener,
    pool: DbPool,
    email_client: EmailClient,
    base_url: String,
    jwt: JWTSettings,
    store: StoreSettings
) -> Result<Server, anyhow::Error>{
    let pool = web::Data::new(pool);
    let email_client = web::Data::new(email_client);
    let base_url = web::Data::new(BaseUrl(base_url));
    let tokenizer = web::Data::new(Tokenizer::new(&jwt));
    let store = web::Data::new(store);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(web::JsonConfig::default().limit(JSON_LIMIT))
            .app_data(pool.clone())
            .app_data(email_client.clone())
            .app_data(base_url.clone())
            .app_data(tokenizer.clone())
            .app_data(store.clone())
            .route("/health", web::get().to(health_check))
            .route("/register", web::post().to(register))
            .route("/confirm", web::get().to(confirm))
            .route("/login", web::post().to(login))
            .route("/payment-methods", web::get().to(get_payment_methods))
            .service(
                web::scope("/products")
                    .route("", web::get().to(get_products))
                    .route("/brands", web::get().to(get_brands))
                    .route("/{product_id}", web::get().to(get_product))
            )
            .service(
                web::scope("/user")
                    .route("/profile", web::get().to(get_profile))
                    .route("/profile", web::post().to(post_profile))
                    .route("/cart", web::get().to(get_cart_items))
                    .route("/cart", web::post().to(add_cart_item))
                    .route("/cart", web::put().to(replace_cart_items))
                    .route("/cart", web::delete().to(clear_cart_items))
                    .route("/cart/{product_id}", web::patch().to(update_cart_item))
                    .route("/cart/{product_id}", web::delete().to(delete_cart_item))
                    .route("/orders", web::get().to(get_orders))
                    .route("/orders", web::post().to(post_order))
                    .route("/orders/{order_id}", web::get().to(get_order))
                    .route("/orders/{order_id}/cancel", web::post().to(cancel_order))
                    .route("/orders/{order_id}/payment", web::post().to(post_payment_proof))
            )
            .service(
                web::scope("/admin")
                    .route("/products", web::post().to(create_product))
                    .route("/products/{product_id}", web::put().to(edit_product))
                    .route("/products/{product_id}", web::delete().to(remove_product))
                    .route("/orders", web::get().to(admin_get_orders))
                    .route("/orders/{order_id}/status", web::put().to(admin_update_order_status))
                    .route("/verify-payment", web::post().to(admin_verify_payment))
                    .route("/stats", web::get().to(admin_get_stats))
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
