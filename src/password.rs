use anyhow::Context;
use argon2::{password_hash::{rand_core::OsRng, SaltString}, Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use secrecy::{ExposeSecret, SecretString};

use crate::telemetry::spawn_blocking_with_tracing;

pub const MIN_PASSWORD_LENGTH: usize = 8;

fn hasher() -> Result<Argon2<'static>, anyhow::Error>{
    let params = Params::new(15000, 2, 1, None)
        .map_err(|e| anyhow::anyhow!("Invalid argon2 parameters: {}", e))?;

    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

// Blocking, call it from the blocking pool
pub fn compute_password_hash(password: SecretString) -> Result<SecretString, anyhow::Error>{
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = hasher()?
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map_err(|_| anyhow::anyhow!("Failed to compute password hash"))?
        .to_string();

    Ok(SecretString::from(password_hash))
}

pub async fn hash_password(password: SecretString) -> Result<SecretString, anyhow::Error>{
    spawn_blocking_with_tracing(move || compute_password_hash(password))
        .await
        .context("Failed due to threadpool error")?
}

#[tracing::instrument(
    "Verifying password hash",
    skip_all
)]
pub async fn verify_password(password: SecretString, hashed_password: String) -> Result<bool, anyhow::Error>{
    spawn_blocking_with_tracing(move || -> Result<bool, anyhow::Error> {
        let hashed_password = PasswordHash::new(hashed_password.as_str())
            .map_err(|_| anyhow::anyhow!("Failed to parse PasswordHash from stored hashed password"))?;

        // Parameters are read from the stored hash
        Ok(Argon2::default()
            .verify_password(password.expose_secret().as_bytes(), &hashed_password)
            .is_ok())
    })
    .await
    .context("Failed due to threadpool error")?
}
