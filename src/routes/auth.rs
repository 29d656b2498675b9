use crate::{
    auth::{hash_password, verify_password, AuthResponse, LoginRequest, RegisterRequest, TokenService},
    error::AppError,
    models::UserCredentials,
};
use actix_web::{post, web, HttpResponse, Responder};
use sqlx::PgPool;
use validator::Validate;

/// Categories every new account starts with.
const DEFAULT_CATEGORIES: [(&str, &str); 4] = [
    ("Work", "#EF4444"),
    ("Personal", "#3B82F6"),
    ("Shopping", "#10B981"),
    ("Study", "#F59E0B"),
];

/// Register a new user
///
/// Creates the account and its default categories in one transaction and
/// returns a freshly issued bearer token. A duplicate email is a 409; the
/// email is the account's identity key. Username duplicates (and the loser
/// of a racing registration, which passes the pre-check) surface as 409 via
/// the unique indexes rather than a database error.
#[post("/register")]
pub async fn register(
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    register_data.validate()?;

    let existing: Option<(i32,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(&register_data.email)
        .fetch_optional(&**pool)
        .await?;

    if existing.is_some() {
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let password_hash = hash_password(&register_data.password)?;

    // User row and default categories commit together; a disconnect
    // mid-registration leaves no half-created account.
    let mut tx = pool.begin().await?;

    let (user_id,): (i32,) = sqlx::query_as(
        "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(&register_data.username)
    .bind(&register_data.email)
    .bind(&password_hash)
    .fetch_one(&mut *tx)
    .await?;

    for (name, color) in DEFAULT_CATEGORIES {
        sqlx::query("INSERT INTO categories (name, color, user_id) VALUES ($1, $2, $3)")
            .bind(name)
            .bind(color)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    let token = tokens.issue(&register_data.email)?;

    Ok(HttpResponse::Created().json(AuthResponse { token, user_id }))
}

/// Login user
///
/// Authenticates by email and password and returns a bearer token. Unknown
/// email and wrong password produce the same 401; neither is an internal
/// error.
#[post("/login")]
pub async fn login(
    pool: web::Data<PgPool>,
    tokens: web::Data<TokenService>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    login_data.validate()?;

    let credentials = sqlx::query_as::<_, UserCredentials>(
        "SELECT id, email, username, password_hash, is_active FROM users WHERE email = $1",
    )
    .bind(&login_data.email)
    .fetch_optional(&**pool)
    .await?;

    match credentials {
        Some(creds) if verify_password(&login_data.password, &creds.password_hash) => {
            let token = tokens.issue(&creds.email)?;
            Ok(HttpResponse::Ok().json(AuthResponse {
                token,
                user_id: creds.id,
            }))
        }
        _ => Err(AppError::Unauthorized("Invalid email or password".into())),
    }
}
