//! Database pool construction and idempotent schema bootstrap.

use sqlx::PgPool;

// Advisory lock key guarding schema bootstrap; arbitrary but stable.
const SCHEMA_LOCK_KEY: i64 = 0x646f6e65_6c697374;

/// Connects a `PgPool` to the given connection string.
pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPool::connect(database_url).await
}

/// Creates the schema if it does not exist yet. Safe to run on every
/// startup; concurrent callers (e.g. parallel test binaries) are serialized
/// with a session advisory lock, since `CREATE TABLE IF NOT EXISTS` itself
/// can race.
///
/// Cascade rules carry the deletion semantics: removing a user removes all
/// of their categories and todos; removing a category detaches its todos
/// (`category_id` set to NULL) rather than deleting them.
pub async fn init_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    // The advisory lock is session-scoped, so everything must run on one
    // connection.
    let mut conn = pool.acquire().await?;

    sqlx::query("SELECT pg_advisory_lock($1)")
        .bind(SCHEMA_LOCK_KEY)
        .execute(&mut *conn)
        .await?;

    let result = create_schema(&mut conn).await;

    sqlx::query("SELECT pg_advisory_unlock($1)")
        .bind(SCHEMA_LOCK_KEY)
        .execute(&mut *conn)
        .await?;

    result
}

async fn create_schema(conn: &mut sqlx::PgConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        DO $$ BEGIN
            CREATE TYPE todo_priority AS ENUM ('low', 'medium', 'high', 'urgent');
        EXCEPTION
            WHEN duplicate_object THEN NULL;
        END $$;
        "#,
    )
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id            SERIAL PRIMARY KEY,
            email         TEXT NOT NULL UNIQUE,
            username      TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            is_active     BOOLEAN NOT NULL DEFAULT TRUE
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            id      SERIAL PRIMARY KEY,
            name    TEXT NOT NULL,
            color   TEXT NOT NULL DEFAULT '#3B82F6',
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS todos (
            id           SERIAL PRIMARY KEY,
            task         TEXT NOT NULL,
            description  TEXT,
            completed    BOOLEAN NOT NULL DEFAULT FALSE,
            priority     todo_priority NOT NULL DEFAULT 'medium',
            created_at   TIMESTAMPTZ NOT NULL DEFAULT now(),
            due_date     TIMESTAMPTZ,
            completed_at TIMESTAMPTZ,
            position     INTEGER NOT NULL DEFAULT 0,
            user_id      INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            category_id  INTEGER REFERENCES categories(id) ON DELETE SET NULL
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    Ok(())
}
