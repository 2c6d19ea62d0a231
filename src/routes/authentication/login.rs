use std::{error::Error, fmt::Debug};

use actix_web::{web, HttpResponse, ResponseError};
use anyhow::Context;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{auth::jwt::Tokenizer, db_interaction::{get_user_from_email, STATUS_CONFIRMED}, domain::user_email::UserEmail, password::verify_password, utils::{error_fmt_chain, get_pooled_connection, DbPool}};

#[derive(Deserialize, Debug)]
pub struct LoginForm{
    pub email: String,
    pub password: SecretString
}

#[derive(Serialize, Deserialize, Debug)]
pub struct LoginResponse{
    pub token: String,
    pub is_admin: bool
}

#[derive(Error)]
pub enum LoginError{
    #[error("{0}")]
    InvalidEmail(String),
    #[error("Email or password is incorrect")]
    InvalidCredentials,
    #[error("Account has not been confirmed yet")]
    NotConfirmed,
    #[error("Failed to login")]
    UnexpectedError(#[from] anyhow::Error)
}

impl Debug for LoginError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

impl ResponseError for LoginError {
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        match self {
            LoginError::InvalidEmail(_) => HttpResponse::BadRequest().body(format!("{}", self)),
            LoginError::InvalidCredentials => HttpResponse::Unauthorized().body(format!("{}", self)),
            LoginError::NotConfirmed => HttpResponse::Forbidden().body(format!("{}", self)),
            LoginError::UnexpectedError(_) => HttpResponse::InternalServerError().body(format!("{}", self))
        }
    }
}

#[tracing::instrument(
    "Logging in user",
    skip(pool, form, tokenizer),
    fields(email = %form.email)
)]
pub async fn login(
    pool: web::Data<DbPool>,
    form: web::Form<LoginForm>,
    tokenizer: web::Data<Tokenizer>
) -> Result<HttpResponse, LoginError>{
    let form = form.into_inner();
    let email = UserEmail::parse(form.email)
        .map_err(LoginError::InvalidEmail)?;

    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool from within spawned task")?;

    let user = get_user_from_email(conn, email.inner())
        .await?
        .ok_or(LoginError::InvalidCredentials)?;

    if !verify_password(form.password, user.password.clone()).await? {
        tracing::info!("Passwords did not match");
        return Err(LoginError::InvalidCredentials)
    }

    if user.status.as_deref() != Some(STATUS_CONFIRMED) {
        return Err(LoginError::NotConfirmed)
    }

    let token = tokenizer.issue(&user)
        .context("Failed to generate jwt")?;

    Ok(HttpResponse::Ok().json(LoginResponse{
        token,
        is_admin: user.is_admin
    }))
}
