use std::fmt::Debug;
use std::error::Error;

use actix_web::{web, HttpResponse, ResponseError};
use anyhow::Context;
use serde::Deserialize;

use crate::{auth::extractors::IsUser, configuration::StoreSettings, db_interaction::{get_user_profile_info, post_user_profile_info, PostUserProfileInfoError}, domain::{phone_number::PhoneNumberDomain, user_email::UserEmail}, models::UserProfileInfo, utils::{error_fmt_chain, get_pooled_connection, DbPool}};

/// Partial update, absent fields keep their value. An empty string clears an
/// optional field.
#[derive(Deserialize, Debug, Default)]
pub struct ProfileForm{
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>
}

#[derive(thiserror::Error)]
pub enum PostProfileError{
    #[error("{0}")]
    InvalidEmailOrPhoneNumber(String),
    #[error("Email not unique")]
    EmailNotUnique(#[source] PostUserProfileInfoError),
    #[error("user not found")]
    NotFound,
    #[error("Unexpected error occured")]
    UnexpectedError(#[from] anyhow::Error)
}

impl Debug for PostProfileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

impl ResponseError for PostProfileError {
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        match self {
            PostProfileError::InvalidEmailOrPhoneNumber(_) => HttpResponse::BadRequest().body(format!("{}", self)),
            PostProfileError::EmailNotUnique(_) => HttpResponse::Conflict().body(format!("{}", self)),
            PostProfileError::NotFound => HttpResponse::NotFound().body(format!("{}", self)),
            PostProfileError::UnexpectedError(_) => HttpResponse::InternalServerError().body(format!("{}", self))
        }
    }
}

#[tracing::instrument(
    "Posting user profile info",
    skip_all
)]
pub async fn post_profile(
    pool: web::Data<DbPool>,
    store: web::Data<StoreSettings>,
    form: web::Json<ProfileForm>,
    uid: IsUser
) -> Result<HttpResponse, PostProfileError>{
    let user_id = uid.0;

    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool from within spawned task")?;

    let info = get_user_profile_info(conn, user_id)
        .await?
        .ok_or(PostProfileError::NotFound)?;

    let new_info = substitute_old_info_with_new(info, form.into_inner(), &store.phone_region)
        .map_err(PostProfileError::InvalidEmailOrPhoneNumber)?;

    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool from within spawned task")?;

    post_user_profile_info(conn, new_info.clone(), user_id).await
        .map_err(|e|{
            match e {
                PostUserProfileInfoError::EmailNotUnique(_) => PostProfileError::EmailNotUnique(e),
                _ => PostProfileError::UnexpectedError(e.into())
            }
        })?;

    Ok(HttpResponse::Ok().json(new_info))
}

fn optional(value: String) -> Option<String>{
    let value = value.trim().to_string();
    if value.is_empty() { None } else { Some(value) }
}

pub fn substitute_old_info_with_new(
    mut current_info: UserProfileInfo,
    new_info: ProfileForm,
    region: &str
) -> Result<UserProfileInfo, String>{

    if let Some(email) = new_info.email{
        current_info.email = UserEmail::parse(email)?.inner();
    }

    if let Some(name) = new_info.name{
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err("name cannot be empty".to_string())
        }
        current_info.name = name
    }

    if let Some(number) = new_info.phone_number{
        current_info.phone_number = match optional(number) {
            Some(number) => Some(PhoneNumberDomain::parse(number, region)?.inner()),
            None => None
        };
    }

    if let Some(address) = new_info.address{
        current_info.address = optional(address);
    }

    if let Some(city) = new_info.city{
        current_info.city = optional(city);
    }

    Ok(current_info)
}
