use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A user as exposed by the API. The password digest never appears here.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub username: String,
    pub is_active: bool,
}

/// Internal credential row, including the bcrypt digest. Deliberately not
/// `Serialize`: it can never leak into a response body.
#[derive(Debug, FromRow)]
pub struct UserCredentials {
    pub id: i32,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub is_active: bool,
}
