use std::error::Error;

use chrono::Utc;
use diesel::{pg::Pg, r2d2::ConnectionManager, Connection, ExpressionMethods, PgConnection, QueryDsl, RunQueryDsl};
use diesel_migrations::MigrationHarness;
use once_cell::sync::Lazy;
use r2d2::Pool;
use reqwest::redirect::Policy;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use uuid::Uuid;
use watchstore::{configuration::{DatabaseSettings, Settings}, db_interaction::STATUS_CONFIRMED, models::{Product, User}, password::compute_password_hash, routes::LoginResponse, schema::{products, users}, startup::{Application, MIGRATIONS}, telemetry::{get_subscriber, init_subscriber}, utils::DbPool};
use wiremock::{matchers::{method, path}, Mock, MockServer, ResponseTemplate};

static LOGGER_INSTANCE: Lazy<()> = Lazy::new(|| {
    let log_level = "info".to_string();
    let name = "watchstore-test".to_string();

    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(name, log_level, std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(name, log_level, std::io::sink);
        init_subscriber(subscriber);
    }
});

pub const TEST_PASSWORD: &str = "testpassword";

fn run_migrations(connection: &mut impl MigrationHarness<Pg>)
    -> Result<(), Box<dyn Error + Send + Sync + 'static>>
{
    connection.run_pending_migrations(MIGRATIONS)?;
    Ok(())
}

// Body of the request our app sends to the email api
#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct ReceiveEmailRequest{
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String
}

pub struct TestUser{
    pub user_id: Uuid,
    pub email: String,
    pub token: String
}

pub struct TestApp{
    pub host: String,
    pub port: u16,
    pub pool: DbPool,
    pub email_api: MockServer,
    pub api_client: reqwest::Client
}

impl TestApp {
    fn create_db(settings: &DatabaseSettings) -> DbPool{
        let mut connection = PgConnection::establish(&settings.get_database_url())
                                .expect("Failed to connect to postgres database");

        let query = format!(r#"CREATE DATABASE "{}";"#, settings.name);
        diesel::sql_query(query)
            .execute(&mut connection)
            .expect("Failed to create test database");

        let pool = Pool::new(ConnectionManager::<PgConnection>::new(settings.get_database_table_url()))
            .expect("Failed to build connection pool to test database");

        let mut conn = pool.get().expect("Failed to get connection to test database");
        run_migrations(&mut conn).expect("Failed to run migrations");

        pool
    }

    pub fn get_app_url(&self) -> String{
        format!("http://{}:{}", self.host, self.port)
    }

    pub async fn spawn_app() -> TestApp{
        Lazy::force(&LOGGER_INSTANCE);

        let email_api = MockServer::start().await;

        let mut settings = Settings::get().expect("Failed to read configuration");
        settings.application.port = 0;
        settings.database.name = Uuid::new_v4().to_string();
        settings.email.api_uri = email_api.uri();

        let pool = TestApp::create_db(&settings.database);

        let application = Application::new(settings)
                            .await
                            .expect("Failed to build application");

        let host = application.host.clone();
        let port = application.port;
        tokio::task::spawn(application.server);

        let api_client = reqwest::Client::builder()
                            .redirect(Policy::none())
                            .build()
                            .unwrap();

        TestApp{
            host,
            port,
            pool,
            email_api,
            api_client
        }
    }

    pub fn get_confirmation_link(&self, text: &str) -> String{
        let links: Vec<_> = linkify::LinkFinder::new()
                    .links(text)
                    .filter(|l| *l.kind() == linkify::LinkKind::Url)
                    .collect();
        assert_eq!(links.len(), 1);
        let raw_link = links[0].as_str().to_owned();
        let mut confirmation_link = reqwest::Url::parse(&raw_link).unwrap();

        assert_eq!(confirmation_link.host_str().unwrap(), "localhost");
        confirmation_link.set_port(Some(self.port)).unwrap();

        confirmation_link.to_string()
    }

    // Accept every email so that checkout and registration can send theirs
    pub async fn accept_emails(&self){
        Mock::given(path("/email"))
            .and(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&self.email_api)
            .await;
    }

    pub async fn post_register(&self, body: &serde_json::Value) -> reqwest::Response{
        self.api_client.post(format!("{}/register", self.get_app_url()))
            .form(body)
            .send()
            .await
            .expect("Failed to send request to register endpoint")
    }

    pub async fn post_login(&self, email: &str, password: &str) -> reqwest::Response{
        self.api_client.post(format!("{}/login", self.get_app_url()))
            .form(&serde_json::json!({
                "email": email,
                "password": password
            }))
            .send()
            .await
            .expect("Failed to send request to login endpoint")
    }

    pub async fn get_as(&self, path: &str, token: &str) -> reqwest::Response{
        self.api_client.get(format!("{}{}", self.get_app_url(), path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn send_json_as(
        &self,
        method: reqwest::Method,
        path: &str,
        token: &str,
        body: &serde_json::Value
    ) -> reqwest::Response{
        self.api_client.request(method, format!("{}{}", self.get_app_url(), path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn delete_as(&self, path: &str, token: &str) -> reqwest::Response{
        self.api_client.delete(format!("{}{}", self.get_app_url(), path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to send request")
    }

    /// Inserts a confirmed account straight into the database and logs it in.
    pub async fn create_user(&self, is_admin: bool) -> TestUser{
        let user_id = Uuid::new_v4();
        let email = format!("{}@example.com", user_id.simple());
        let password_hash = compute_password_hash(SecretString::from(TEST_PASSWORD.to_string()))
            .expect("Failed to hash password");

        let user = User{
            user_id,
            name: "Nour Adel".to_string(),
            email: email.clone(),
            password: password_hash.expose_secret().to_string(),
            status: Some(STATUS_CONFIRMED.to_string()),
            is_admin
        };

        let mut conn = self.pool.get().unwrap();
        diesel::insert_into(users::table)
            .values(user)
            .execute(&mut conn)
            .expect("Failed to insert test user");

        diesel::update(users::table.find(user_id))
            .set((
                users::phone_number.eq(Some("+201012345678")),
                users::address.eq(Some("12 Tahrir St")),
                users::city.eq(Some("Cairo"))
            ))
            .execute(&mut conn)
            .expect("Failed to set test user profile");

        let response = self.post_login(&email, TEST_PASSWORD).await;
        assert_eq!(response.status().as_u16(), 200);
        let login = response.json::<LoginResponse>().await.unwrap();

        TestUser{
            user_id,
            email,
            token: login.token
        }
    }

    pub fn insert_product(&self, name: &str, brand: &str, price: i64, stock: i32) -> Product{
        let now = Utc::now();
        let product = Product{
            product_id: Uuid::new_v4(),
            name: name.to_string(),
            brand: brand.to_string(),
            description: None,
            category: "automatic".to_string(),
            gender: "unisex".to_string(),
            price,
            compare_at_price: None,
            stock,
            images: vec![],
            is_featured: false,
            created_at: now,
            updated_at: now
        };

        let mut conn = self.pool.get().unwrap();
        diesel::insert_into(products::table)
            .values(&product)
            .get_result::<Product>(&mut conn)
            .expect("Failed to insert test product")
    }

    pub fn product_stock(&self, product_id: Uuid) -> i32{
        let mut conn = self.pool.get().unwrap();
        products::table
            .find(product_id)
            .select(products::stock)
            .first::<i32>(&mut conn)
            .unwrap()
    }

    pub async fn add_to_cart(&self, token: &str, product_id: Uuid, quantity: i32) -> reqwest::Response{
        self.send_json_as(
            reqwest::Method::POST,
            "/user/cart",
            token,
            &serde_json::json!({ "product_id": product_id, "quantity": quantity })
        ).await
    }

    pub async fn checkout(&self, token: &str, body: &serde_json::Value, idempotency_key: Option<&str>) -> reqwest::Response{
        let mut request = self.api_client.post(format!("{}/user/orders", self.get_app_url()))
            .bearer_auth(token)
            .json(body);

        if let Some(key) = idempotency_key {
            request = request.header("Idempotency-Key", key);
        }

        request.send()
            .await
            .expect("Failed to send checkout request")
    }
}
