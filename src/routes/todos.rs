use crate::{
    auth::CurrentUser,
    error::AppError,
    models::{Todo, TodoInput, TodoQuery, TodoUpdate},
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;
use sqlx::postgres::Postgres;
use sqlx::{PgPool, Transaction};
use validator::Validate;

const TODO_COLUMNS: &str = "id, task, description, completed, priority, created_at, due_date, \
                            completed_at, position, user_id, category_id";

/// Verifies that `category_id` names a category owned by `user_id`.
///
/// Absent and foreign categories are the same 404; a todo can only ever
/// point into its owner's category set.
async fn check_category_ownership(
    tx: &mut Transaction<'_, Postgres>,
    category_id: i32,
    user_id: i32,
) -> Result<(), AppError> {
    let owned: Option<(i32,)> =
        sqlx::query_as("SELECT id FROM categories WHERE id = $1 AND user_id = $2")
            .bind(category_id)
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await?;

    match owned {
        Some(_) => Ok(()),
        None => Err(AppError::NotFound("Category not found".into())),
    }
}

/// Retrieves the authenticated user's todos, ordered by position.
///
/// ## Query Parameters:
/// - `completed` (optional): filter by completion state.
/// - `category_id` (optional): filter by category.
/// - `priority` (optional): filter by priority ("low", "medium", "high", "urgent").
/// - `due_date_from` / `due_date_to` (optional): inclusive due-date window.
///
/// ## Responses:
/// - `200 OK`: JSON array of `Todo` objects.
/// - `401 Unauthorized`: missing or invalid token.
#[get("")]
pub async fn get_todos(
    pool: web::Data<PgPool>,
    query_params: web::Query<TodoQuery>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    // Base query scoped to the authenticated user; filter conditions are
    // appended dynamically with numbered placeholders, values always bound.
    let mut sql = format!("SELECT {} FROM todos WHERE user_id = $1", TODO_COLUMNS);
    let mut param_count = 2;

    let mut conditions: Vec<String> = Vec::new();

    if query_params.completed.is_some() {
        conditions.push(format!("completed = ${}", param_count));
        param_count += 1;
    }
    if query_params.category_id.is_some() {
        conditions.push(format!("category_id = ${}", param_count));
        param_count += 1;
    }
    if query_params.priority.is_some() {
        conditions.push(format!("priority = ${}", param_count));
        param_count += 1;
    }
    if query_params.due_date_from.is_some() {
        conditions.push(format!("due_date >= ${}", param_count));
        param_count += 1;
    }
    if query_params.due_date_to.is_some() {
        conditions.push(format!("due_date <= ${}", param_count));
    }

    if !conditions.is_empty() {
        sql.push_str(" AND ");
        sql.push_str(&conditions.join(" AND "));
    }

    sql.push_str(" ORDER BY position");

    let mut query_builder = sqlx::query_as::<_, Todo>(&sql);

    query_builder = query_builder.bind(user.0.id);

    if let Some(completed) = query_params.completed {
        query_builder = query_builder.bind(completed);
    }
    if let Some(category_id) = query_params.category_id {
        query_builder = query_builder.bind(category_id);
    }
    if let Some(priority) = &query_params.priority {
        query_builder = query_builder.bind(priority.clone());
    }
    if let Some(due_date_from) = query_params.due_date_from {
        query_builder = query_builder.bind(due_date_from);
    }
    if let Some(due_date_to) = query_params.due_date_to {
        query_builder = query_builder.bind(due_date_to);
    }

    let todos = query_builder.fetch_all(&**pool).await?;

    Ok(HttpResponse::Ok().json(todos))
}

/// Creates a new todo at the end of the authenticated user's list.
///
/// The position is `max(position) + 1` over the caller's todos (0 for the
/// first). The max-then-insert runs inside a transaction that first locks
/// the caller's `users` row, so concurrent creates by the same user are
/// serialized and can never claim the same position. Users never contend
/// with each other.
///
/// ## Responses:
/// - `201 Created`: the new `Todo`, including its assigned position.
/// - `404 Not Found`: the supplied `category_id` is not one of the caller's.
/// - `422 Unprocessable Entity`: input validation failed.
#[post("")]
pub async fn create_todo(
    pool: web::Data<PgPool>,
    todo_data: web::Json<TodoInput>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    todo_data.validate()?;

    let mut tx = pool.begin().await?;

    // Per-user append lock.
    sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(user.0.id)
        .execute(&mut *tx)
        .await?;

    if let Some(category_id) = todo_data.category_id {
        check_category_ownership(&mut tx, category_id, user.0.id).await?;
    }

    let (position,): (i32,) =
        sqlx::query_as("SELECT COALESCE(MAX(position) + 1, 0) FROM todos WHERE user_id = $1")
            .bind(user.0.id)
            .fetch_one(&mut *tx)
            .await?;

    let sql = format!(
        "INSERT INTO todos (task, description, priority, due_date, position, user_id, category_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING {}",
        TODO_COLUMNS
    );
    let todo = sqlx::query_as::<_, Todo>(&sql)
        .bind(&todo_data.task)
        .bind(&todo_data.description)
        .bind(todo_data.priority.clone().unwrap_or_default())
        .bind(todo_data.due_date)
        .bind(position)
        .bind(user.0.id)
        .bind(todo_data.category_id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(HttpResponse::Created().json(todo))
}

/// Retrieves one of the authenticated user's todos by id.
///
/// A todo that does not exist and one owned by somebody else produce the
/// same 404.
#[get("/{id}")]
pub async fn get_todo(
    pool: web::Data<PgPool>,
    todo_id: web::Path<i32>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    let sql = format!(
        "SELECT {} FROM todos WHERE id = $1 AND user_id = $2",
        TODO_COLUMNS
    );
    let todo = sqlx::query_as::<_, Todo>(&sql)
        .bind(todo_id.into_inner())
        .bind(user.0.id)
        .fetch_optional(&**pool)
        .await?;

    match todo {
        Some(todo) => Ok(HttpResponse::Ok().json(todo)),
        None => Err(AppError::NotFound("Todo not found".into())),
    }
}

/// Partially updates one of the authenticated user's todos.
///
/// Only fields present in the payload change; `description`, `due_date`,
/// and `category_id` accept an explicit `null` to clear. A `completed`
/// transition maintains `completed_at`: set on false→true, cleared on
/// true→false, untouched when the value is re-asserted. `position` cannot
/// be set here; ordering changes go through the reorder endpoint.
///
/// ## Responses:
/// - `200 OK`: the updated `Todo`.
/// - `404 Not Found`: todo absent, not owned, or the new `category_id` is
///   not one of the caller's.
/// - `422 Unprocessable Entity`: input validation failed.
#[put("/{id}")]
pub async fn update_todo(
    pool: web::Data<PgPool>,
    todo_id: web::Path<i32>,
    todo_data: web::Json<TodoUpdate>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    todo_data.validate()?;
    let todo_id = todo_id.into_inner();
    let update = todo_data.into_inner();

    let mut tx = pool.begin().await?;

    let sql = format!(
        "SELECT {} FROM todos WHERE id = $1 AND user_id = $2 FOR UPDATE",
        TODO_COLUMNS
    );
    let mut todo = sqlx::query_as::<_, Todo>(&sql)
        .bind(todo_id)
        .bind(user.0.id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Todo not found".into()))?;

    // Field-by-field merge: absent leaves the stored value alone.
    if let Some(task) = update.task {
        todo.task = task;
    }
    if let Some(description) = update.description {
        todo.description = description;
    }
    if let Some(priority) = update.priority {
        todo.priority = priority;
    }
    if let Some(due_date) = update.due_date {
        todo.due_date = due_date;
    }
    if let Some(category_id) = update.category_id {
        if let Some(category_id) = category_id {
            check_category_ownership(&mut tx, category_id, user.0.id).await?;
        }
        todo.category_id = category_id;
    }
    if let Some(completed) = update.completed {
        // completed_at tracks transitions only.
        if completed != todo.completed {
            todo.completed_at = if completed { Some(Utc::now()) } else { None };
        }
        todo.completed = completed;
    }

    let sql = format!(
        "UPDATE todos
         SET task = $1, description = $2, completed = $3, priority = $4, due_date = $5,
             completed_at = $6, category_id = $7
         WHERE id = $8 AND user_id = $9
         RETURNING {}",
        TODO_COLUMNS
    );
    let updated = sqlx::query_as::<_, Todo>(&sql)
        .bind(&todo.task)
        .bind(&todo.description)
        .bind(todo.completed)
        .bind(todo.priority.clone())
        .bind(todo.due_date)
        .bind(todo.completed_at)
        .bind(todo.category_id)
        .bind(todo_id)
        .bind(user.0.id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(HttpResponse::Ok().json(updated))
}

/// Deletes one of the authenticated user's todos.
#[delete("/{id}")]
pub async fn delete_todo(
    pool: web::Data<PgPool>,
    todo_id: web::Path<i32>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    let result = sqlx::query("DELETE FROM todos WHERE id = $1 AND user_id = $2")
        .bind(todo_id.into_inner())
        .bind(user.0.id)
        .execute(&**pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Todo not found".into()));
    }

    Ok(HttpResponse::NoContent().finish())
}

/// Reassigns positions from a full ordered id list.
///
/// Each id that names one of the caller's todos gets its index in the list
/// as its new position; ids that don't (deleted meanwhile, or never the
/// caller's) are skipped rather than failing the whole reorder, so a stale
/// client list still applies. The batch commits atomically and takes the
/// same per-user lock as create, so it cannot interleave with an append.
///
/// Sending a strict subset of the owned todos leaves the unnamed ones at
/// their old positions, which may duplicate until the next full reorder;
/// clients are expected to send the complete list.
#[post("/reorder")]
pub async fn reorder_todos(
    pool: web::Data<PgPool>,
    todo_ids: web::Json<Vec<i32>>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(user.0.id)
        .execute(&mut *tx)
        .await?;

    for (index, todo_id) in todo_ids.iter().enumerate() {
        sqlx::query("UPDATE todos SET position = $1 WHERE id = $2 AND user_id = $3")
            .bind(index as i32)
            .bind(todo_id)
            .bind(user.0.id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Todos reordered successfully" })))
}
