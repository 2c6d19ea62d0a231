use std::{error::Error, fmt::Debug};

use actix_web::{web, HttpResponse, ResponseError};
use anyhow::Context;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

use crate::{db_interaction::{insert_user_into_database, UserInsertError}, domain::user_email::UserEmail, email_client::{EmailClient, EmailContent}, password::MIN_PASSWORD_LENGTH, startup::BaseUrl, utils::{error_fmt_chain, get_pooled_connection, DbPool}};

#[derive(Deserialize, Debug)]
pub struct RegistrationForm{
    email: String,
    name: String,
    password: SecretString,
    confirm_password: SecretString
}

#[derive(Error)]
pub enum RegisterError{
    #[error("the password and confirm passwords don't match")]
    PasswordNotMatching,
    #[error("password must be at least {} characters", MIN_PASSWORD_LENGTH)]
    PasswordTooShort,
    #[error("name cannot be empty")]
    EmptyName,
    #[error("{0}")]
    InvalidEmail(String),
    #[error("user already exists")]
    UserAlreadyExists(#[source] UserInsertError),
    #[error("unexpected error occured")]
    UnexpectedError(#[from] anyhow::Error)
}

impl Debug for RegisterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

impl ResponseError for RegisterError{
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        match self {
            RegisterError::UserAlreadyExists(_) => HttpResponse::Conflict().body(format!("{}", self)),
            RegisterError::UnexpectedError(_) => HttpResponse::InternalServerError().body(format!("{}", self)),
            _ => HttpResponse::BadRequest().body(format!("{}", self))
        }
    }
}

#[tracing::instrument(
    "User registration started",
    skip(form, pool, email_client, base_url),
    fields(email = %form.email)
)]
pub async fn register(
    form: web::Form<RegistrationForm>,
    pool: web::Data<DbPool>,
    email_client: web::Data<EmailClient>,
    base_url: web::Data<BaseUrl>
) -> Result<HttpResponse, RegisterError> {
    let form = form.into_inner();

    if form.password.expose_secret() != form.confirm_password.expose_secret(){
        return Err(RegisterError::PasswordNotMatching)
    }
    if form.password.expose_secret().chars().count() < MIN_PASSWORD_LENGTH {
        return Err(RegisterError::PasswordTooShort)
    }

    let name = form.name.trim().to_string();
    if name.is_empty() {
        return Err(RegisterError::EmptyName)
    }

    let email = UserEmail::parse(form.email)
        .map_err(RegisterError::InvalidEmail)?;

    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool from within spawned task")?;

    let confirmation_id = insert_user_into_database(conn, name, email.inner(), form.password)
        .await
        .map_err(|e| match e {
            UserInsertError::EmailNotUnique(_) => RegisterError::UserAlreadyExists(e),
            UserInsertError::UnexpectedError(e) => RegisterError::UnexpectedError(e)
        })?;

    let conf_link = format!("{}/confirm?id={}", base_url.0.trim_end_matches('/'), confirmation_id);

    email_client.send(&email, &EmailContent::account_confirmation(&conf_link))
        .await
        .context("Failed to send confirmation email")?;

    Ok(HttpResponse::Ok().finish())
}
