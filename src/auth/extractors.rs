use actix_web::dev::Payload;
use actix_web::{web, Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;
use sqlx::PgPool;

use crate::auth::token::Claims;
use crate::error::AppError;
use crate::models::User;

/// The authenticated, active principal for the current request.
///
/// Completes identity resolution on top of `AuthMiddleware`: the middleware
/// verified the token and stored its claims; this extractor loads the user
/// the claims name and applies the account-status check. Handlers taking a
/// `CurrentUser` can therefore assume a valid, active user and must scope
/// every query to `user.0.id`.
///
/// Resolution fails closed:
/// - no verified claims in the request → `Unauthorized`;
/// - subject email not found → `Unauthorized`;
/// - account deactivated → `Forbidden`.
#[derive(Debug)]
pub struct CurrentUser(pub User);

impl FromRequest for CurrentUser {
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let claims = req.extensions().get::<Claims>().cloned();
        let pool = req.app_data::<web::Data<PgPool>>().cloned();

        Box::pin(async move {
            let claims = claims.ok_or_else(|| {
                AppError::Unauthorized(
                    "Missing authentication. Ensure AuthMiddleware is active.".to_string(),
                )
            })?;
            let pool = pool.ok_or_else(|| {
                AppError::InternalServerError("Database pool not configured".to_string())
            })?;

            let user = sqlx::query_as::<_, User>(
                "SELECT id, email, username, is_active FROM users WHERE email = $1",
            )
            .bind(&claims.sub)
            .fetch_optional(&**pool)
            .await
            .map_err(AppError::from)?;

            match user {
                None => Err(AppError::Unauthorized("Invalid token".into()).into()),
                Some(user) if !user.is_active => {
                    Err(AppError::Forbidden("Inactive account".into()).into())
                }
                Some(user) => Ok(CurrentUser(user)),
            }
        })
    }
}
