use std::{error::Error, fmt::Debug};

use diesel::{Connection, OptionalExtension};
use anyhow::Context;
use diesel::{RunQueryDsl, QueryDsl, ExpressionMethods};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use uuid::Uuid;

use crate::{models::{ConfirmationMap, User, UserProfileInfo}, password::hash_password, schema::users, telemetry::spawn_blocking_with_tracing, utils::{error_fmt_chain, DbConnection}};

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_CONFIRMED: &str = "confirmed";

#[tracing::instrument(
    "Getting user from email",
    skip(conn)
)]
pub async fn get_user_from_email(
    mut conn: DbConnection,
    email_string: String
) -> Result<Option<User>, anyhow::Error> {
    spawn_blocking_with_tracing(move || {
        users::table.select((
            users::user_id,
            users::name,
            users::email,
            users::password,
            users::status,
            users::is_admin
        ))
        .filter(users::email.eq(email_string))
        .get_result::<User>(&mut conn)
        .optional()
        .context("Failed to query user by email")
    })
    .await
    .context("Failed due to threadpool error")?
}

// Error associated with inserting user to users table
#[derive(Error)]
pub enum UserInsertError{
    #[error("email field is not unique")]
    EmailNotUnique(#[source] diesel::result::Error),
    #[error("unexpected database / hashing error occured")]
    UnexpectedError(#[from] anyhow::Error)
}

impl From<diesel::result::Error> for UserInsertError {
    fn from(e: diesel::result::Error) -> Self {
        UserInsertError::UnexpectedError(e.into())
    }
}

impl Debug for UserInsertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

#[tracing::instrument(
    "Inserting user into the database",
    skip(conn, password)
)]
pub async fn insert_user_into_database(
    mut conn: DbConnection,
    name: String,
    email: String,
    password: SecretString
) -> Result<Uuid, UserInsertError> {

    let password_hash = hash_password(password).await?;

    let uid = Uuid::new_v4();
    let user = User{
        user_id: uid,
        name,
        email,
        password: password_hash.expose_secret().to_string(),
        status: Some(STATUS_PENDING.to_string()),
        is_admin: false
    };

    let confirmation_id = spawn_blocking_with_tracing(move || {
        use crate::schema::confirmation;

        conn.transaction::<_, UserInsertError, _>(|conn| {
            diesel::insert_into(users::table)
                .values(user)
                .execute(conn)
                .map_err(|e|{
                    match e {
                        diesel::result::Error::DatabaseError(
                            diesel::result::DatabaseErrorKind::UniqueViolation,
                            _
                        ) => UserInsertError::EmailNotUnique(e),
                        _ => UserInsertError::UnexpectedError(anyhow::Error::new(e).context("Failed to insert user"))
                    }
                })?;

            let id = Uuid::new_v4();

            diesel::insert_into(confirmation::table)
                .values(ConfirmationMap{
                    confirmation_id: id,
                    user_id: Some(uid)
                })
                .execute(conn)
                .context("Failed to insert confirmation mapping")?;

            Ok(id)
        })
    })
    .await
    .context("Failed due to threadpool error")??;

    Ok(confirmation_id)
}

#[tracing::instrument(
    "Get profile data of logged in user",
    skip(conn)
)]
pub async fn get_user_profile_info(
    mut conn: DbConnection,
    user_id: Uuid
) -> Result<Option<UserProfileInfo>, anyhow::Error>{
    spawn_blocking_with_tracing(move || {
        users::table.select((
            users::name,
            users::email,
            users::phone_number,
            users::address,
            users::city
        ))
        .filter(users::user_id.eq(user_id))
        .get_result::<UserProfileInfo>(&mut conn)
        .optional()
        .context("Failed to get UserProfileInfo from database")
    })
    .await
    .context("Failed due to threadpool error")?
}

// Errors associated with inserting / updating user profile to database
#[derive(thiserror::Error)]
pub enum PostUserProfileInfoError{
    #[error("Failed due to threadpool error")]
    ThreadpoolError(#[from] tokio::task::JoinError),
    #[error("Email is already used by another account")]
    EmailNotUnique(#[source] diesel::result::Error),
    #[error("Failed due to database error")]
    QueryError(#[from] diesel::result::Error)
}

impl Debug for PostUserProfileInfoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

#[tracing::instrument(
    "posting user profile info to db",
    skip_all
)]
pub async fn post_user_profile_info(
    mut conn: DbConnection,
    new_info: UserProfileInfo,
    user_id: Uuid
) -> Result<(), PostUserProfileInfoError>{

    spawn_blocking_with_tracing(move || {
        diesel::update(users::table)
            .set((
                users::email.eq(new_info.email),
                users::name.eq(new_info.name),
                users::phone_number.eq(new_info.phone_number),
                users::address.eq(new_info.address),
                users::city.eq(new_info.city)
            ))
            .filter(users::user_id.eq(user_id))
            .execute(&mut conn)
    })
    .await?
    .map_err(|e| match e {
        diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _
        ) => PostUserProfileInfoError::EmailNotUnique(e),
        _ => PostUserProfileInfoError::QueryError(e)
    })?;

    Ok(())
}

/// Confirms the account behind a confirmation link. The link is consumed, so
/// returns `false` for unknown or already used ids.
#[tracing::instrument(
    "Confirming user from confirmation id",
    skip(conn)
)]
pub async fn confirm_user(
    mut conn: DbConnection,
    confirmation_id: Uuid
) -> Result<bool, anyhow::Error>{
    use crate::schema::confirmation;

    spawn_blocking_with_tracing(move || {
        conn.transaction::<_, anyhow::Error, _>(|conn| {
            let mapping = diesel::delete(confirmation::table.find(confirmation_id))
                .get_result::<ConfirmationMap>(conn)
                .optional()
                .context("Failed to consume confirmation mapping")?;

            let user_id = match mapping.and_then(|m| m.user_id) {
                Some(user_id) => user_id,
                None => return Ok(false)
            };

            diesel::update(users::table.find(user_id))
                .set(users::status.eq(STATUS_CONFIRMED))
                .execute(conn)
                .context("Failed to update user status")?;

            Ok(true)
        })
    })
    .await
    .context("Failed due to threadpool error")?
}
