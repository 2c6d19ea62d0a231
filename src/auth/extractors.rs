use actix_web::{error::{ErrorForbidden, ErrorInternalServerError, ErrorUnauthorized}, http::header, web, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use uuid::Uuid;

use super::jwt::{Claims, Tokenizer, UserRole};

// Extractor for admin role
pub struct IsAdmin(pub Uuid);

// Extractor for any logged in user, second field is true for admins
pub struct IsUser(pub Uuid, pub bool);

fn bearer_claims(req: &HttpRequest) -> Result<Claims, actix_web::Error>{
    let tokenizer = req.app_data::<web::Data<Tokenizer>>()
        .ok_or_else(|| ErrorInternalServerError("Tokenizer is not configured"))?;

    let token = req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ErrorUnauthorized("Missing bearer token"))?;

    tokenizer.verify(token).map_err(|e| {
        tracing::debug!(error = ?e, "Rejected bearer token");
        ErrorUnauthorized(e.to_string())
    })
}

impl FromRequest for IsAdmin {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let res = bearer_claims(req).and_then(|claims| {
            match claims.role {
                UserRole::ADMIN => Ok(IsAdmin(claims.sub)),
                UserRole::USER => Err(ErrorForbidden("Unauthorized Role"))
            }
        });

        ready(res)
    }
}

impl FromRequest for IsUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let res = bearer_claims(req).map(|claims| {
            IsUser(claims.sub, claims.role == UserRole::ADMIN)
        });

        ready(res)
    }
}
