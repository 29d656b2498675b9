use crate::{
    auth::CurrentUser,
    error::AppError,
    models::{Category, CategoryInput},
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use sqlx::PgPool;
use validator::Validate;

/// Lists the authenticated user's categories.
#[get("")]
pub async fn get_categories(
    pool: web::Data<PgPool>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    let categories = sqlx::query_as::<_, Category>(
        "SELECT id, name, color, user_id FROM categories WHERE user_id = $1 ORDER BY id",
    )
    .bind(user.0.id)
    .fetch_all(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(categories))
}

/// Creates a category for the authenticated user.
#[post("")]
pub async fn create_category(
    pool: web::Data<PgPool>,
    category_data: web::Json<CategoryInput>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    category_data.validate()?;

    let category = sqlx::query_as::<_, Category>(
        "INSERT INTO categories (name, color, user_id) VALUES ($1, $2, $3)
         RETURNING id, name, color, user_id",
    )
    .bind(&category_data.name)
    .bind(category_data.color_or_default())
    .bind(user.0.id)
    .fetch_one(&**pool)
    .await?;

    Ok(HttpResponse::Created().json(category))
}

/// Updates a category the authenticated user owns.
///
/// A category that does not exist and one owned by somebody else produce
/// the same 404.
#[put("/{id}")]
pub async fn update_category(
    pool: web::Data<PgPool>,
    category_id: web::Path<i32>,
    category_data: web::Json<CategoryInput>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    category_data.validate()?;

    let category = sqlx::query_as::<_, Category>(
        "UPDATE categories SET name = $1, color = $2
         WHERE id = $3 AND user_id = $4
         RETURNING id, name, color, user_id",
    )
    .bind(&category_data.name)
    .bind(category_data.color_or_default())
    .bind(category_id.into_inner())
    .bind(user.0.id)
    .fetch_optional(&**pool)
    .await?;

    match category {
        Some(category) => Ok(HttpResponse::Ok().json(category)),
        None => Err(AppError::NotFound("Category not found".into())),
    }
}

/// Deletes a category the authenticated user owns.
///
/// Todos referencing the category survive with their reference cleared;
/// the unlink and the delete commit together so no request can observe the
/// category gone while a todo still points at it.
#[delete("/{id}")]
pub async fn delete_category(
    pool: web::Data<PgPool>,
    category_id: web::Path<i32>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    let category_id = category_id.into_inner();

    let mut tx = pool.begin().await?;

    sqlx::query(
        "UPDATE todos SET category_id = NULL WHERE category_id = $1 AND user_id = $2",
    )
    .bind(category_id)
    .bind(user.0.id)
    .execute(&mut *tx)
    .await?;

    let result = sqlx::query("DELETE FROM categories WHERE id = $1 AND user_id = $2")
        .bind(category_id)
        .bind(user.0.id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Category not found".into()));
    }

    tx.commit().await?;

    Ok(HttpResponse::NoContent().finish())
}
