use config::{Config, ConfigError, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::{domain::user_email::UserEmail, email_client::EmailClient};

#[derive(Deserialize, Debug)]
pub struct Settings{
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub email: EmailSettings,
    pub jwt: JWTSettings,
    pub store: StoreSettings
}

#[derive(Deserialize, Debug)]
pub struct ApplicationSettings{
    pub host: String,
    pub port: u16,
    pub base_url: String
}

#[derive(Deserialize, Debug)]
pub struct DatabaseSettings{
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub name: String
}

impl DatabaseSettings {
    // Url of the postgres server itself, used to create databases
    pub fn get_database_url(&self) -> String{
        format!(
            "postgres://{}:{}@{}:{}",
            self.username,
            self.password.expose_secret(),
            self.host,
            self.port
        )
    }

    pub fn get_database_table_url(&self) -> String{
        format!("{}/{}", self.get_database_url(), self.name)
    }
}

#[derive(Deserialize, Debug)]
pub struct EmailSettings{
    pub api_uri: String,
    pub sender: String,
    pub authorization_token: SecretString,
    pub timeout: u64
}

impl EmailSettings {
    pub fn client(self) -> Result<EmailClient, anyhow::Error>{
        let sender = UserEmail::parse(self.sender)
            .map_err(|e| anyhow::anyhow!(e))?;

        EmailClient::new(self.api_uri, sender, self.authorization_token, self.timeout)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct JWTSettings{
    pub secret: String,
    pub expiry_hours: u64
}

/// Prices, fees and payment accounts of the shop. All amounts are in minor
/// units of `currency`.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct StoreSettings{
    pub currency: String,
    pub shipping_fee: i64,
    pub free_shipping_threshold: Option<i64>,
    pub cod_fee: i64,
    pub low_stock_threshold: i32,
    pub phone_region: String,
    pub bank: BankAccountSettings,
    #[serde(default)]
    pub wallets: Vec<WalletSettings>
}

impl StoreSettings {
    pub fn wallet(&self, provider: &str) -> Option<&WalletSettings>{
        self.wallets
            .iter()
            .find(|w| w.provider.eq_ignore_ascii_case(provider))
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct BankAccountSettings{
    pub bank_name: String,
    pub account_name: String,
    pub account_number: String,
    pub iban: Option<String>
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct WalletSettings{
    pub provider: String,
    pub account_name: String,
    pub number: String
}

impl Settings{
    pub fn get() -> Result<Self, ConfigError>{
        let environment = std::env::var("APP_ENVIRONMENT")
            .unwrap_or_else(|_| "local".into());

        Config::builder()
            .add_source(File::with_name("configuration/base.yaml"))
            .add_source(
                File::with_name(&format!("configuration/{}.yaml", environment))
                    .required(false)
            )
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
            )
            .build()?
            .try_deserialize::<Settings>()
    }
}
