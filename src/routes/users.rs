use crate::{auth::CurrentUser, error::AppError};
use actix_web::{delete, get, web, HttpResponse, Responder};
use sqlx::PgPool;

/// Returns the authenticated user's own record (never the password digest).
#[get("/me")]
pub async fn me(user: CurrentUser) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(user.0))
}

/// Deletes the authenticated user's account.
///
/// Cascades through the schema's foreign keys: every todo and category
/// belonging to the account is removed in the same statement's transaction.
/// Tokens already issued for the account stop resolving once the row is
/// gone.
#[delete("/me")]
pub async fn delete_me(
    pool: web::Data<PgPool>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user.0.id)
        .execute(&**pool)
        .await?;

    Ok(HttpResponse::NoContent().finish())
}
