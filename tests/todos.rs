use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{http::header, rt, test, web, App, HttpServer};
use donelist::auth::{AuthMiddleware, AuthResponse, TokenService};
use donelist::models::Todo;
use donelist::routes::health;
use donelist::{db, routes};
use dotenv::dotenv;
use futures::future::join_all;
use pretty_assertions::assert_eq;
use serde_json::json;
use sqlx::PgPool;
use std::net::TcpListener;

const TEST_JWT_SECRET: &str = "integration-test-secret";

struct TestUser {
    id: i32,
    token: String,
}

async fn test_pool() -> PgPool {
    dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");
    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to test DB");
    db::init_schema(&pool)
        .await
        .expect("Failed to initialize test schema");
    pool
}

async fn cleanup_user(pool: &PgPool, email: &str) {
    let _ = sqlx::query("DELETE FROM users WHERE email = $1")
        .bind(email)
        .execute(pool)
        .await;
}

async fn register_and_login_user(
    app: &impl actix_web::dev::Service<
        actix_http::Request,
        Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
    >,
    email: &str,
    username: &str,
    password: &str,
) -> Result<TestUser, String> {
    let req_register = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(&json!({
            "username": username,
            "email": email,
            "password": password
        }))
        .to_request();
    let resp_register = test::call_service(app, req_register).await;
    let resp_status = resp_register.status();
    let auth_response_bytes = test::read_body(resp_register).await;

    if !resp_status.is_success() {
        return Err(format!(
            "Failed to register user. Status: {}. Body: {}",
            resp_status,
            String::from_utf8_lossy(&auth_response_bytes)
        ));
    }
    let auth_response: AuthResponse = serde_json::from_slice(&auth_response_bytes)
        .map_err(|e| format!("Failed to parse registration response: {}", e))?;

    Ok(TestUser {
        id: auth_response.user_id,
        token: auth_response.token,
    })
}

macro_rules! init_app {
    ($pool:expr, $tokens:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($pool.clone()))
                .app_data(web::Data::new($tokens.clone()))
                .wrap(
                    Cors::default()
                        .allow_any_origin()
                        .allow_any_method()
                        .allow_any_header()
                        .max_age(3600),
                )
                .wrap(Logger::default())
                .service(health::health)
                .service(
                    web::scope("/api")
                        .wrap(AuthMiddleware)
                        .configure(routes::config),
                ),
        )
        .await
    };
}

#[actix_rt::test]
async fn test_create_todo_unauthorized() {
    let pool = test_pool().await;
    let tokens = TokenService::new(TEST_JWT_SECRET, 30);

    // Find an available port
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let server_pool = pool.clone();
    let server_tokens = tokens.clone();
    let server_handle = rt::spawn(async move {
        HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(server_pool.clone()))
                .app_data(web::Data::new(server_tokens.clone()))
                .wrap(
                    Cors::default()
                        .allow_any_origin()
                        .allow_any_method()
                        .allow_any_header()
                        .max_age(3600),
                )
                .wrap(Logger::default())
                .service(health::health)
                .service(
                    web::scope("/api")
                        .wrap(AuthMiddleware)
                        .configure(routes::config),
                )
        })
        .bind(("127.0.0.1", port))
        .unwrap_or_else(|_| panic!("Failed to bind to port {}", port))
        .run()
        .await
    });

    // Give the server a moment to start
    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    let client = reqwest::Client::new();
    let request_url = format!("http://127.0.0.1:{}/api/todos", port);

    let resp = client
        .post(&request_url)
        .json(&json!({ "task": "Unauthorized todo" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);

    server_handle.abort();
}

#[actix_rt::test]
async fn test_todo_crud_flow() {
    let pool = test_pool().await;
    let tokens = TokenService::new(TEST_JWT_SECRET, 30);
    let app = init_app!(pool, tokens);

    let email = "todo_crud@example.com";
    cleanup_user(&pool, email).await;
    let user = register_and_login_user(&app, email, "todo_crud_user", "PasswordCrud123!")
        .await
        .expect("Failed to register/login test user");
    let bearer = format!("Bearer {}", user.token);

    // 1. Create
    let req = test::TestRequest::post()
        .uri("/api/todos")
        .append_header((header::AUTHORIZATION, bearer.clone()))
        .set_json(&json!({
            "task": "Buy milk",
            "description": "Semi-skimmed",
            "priority": "high"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::CREATED);
    let created: Todo = test::read_body_json(resp).await;
    assert_eq!(created.task, "Buy milk");
    assert_eq!(created.description.as_deref(), Some("Semi-skimmed"));
    assert_eq!(created.position, 0);
    assert_eq!(created.user_id, user.id);
    assert!(!created.completed);
    assert!(created.completed_at.is_none());

    // 2. Get by id
    let req = test::TestRequest::get()
        .uri(&format!("/api/todos/{}", created.id))
        .append_header((header::AUTHORIZATION, bearer.clone()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
    let fetched: Todo = test::read_body_json(resp).await;
    assert_eq!(fetched.id, created.id);

    // 3. Partial update: completing sets completed_at, untouched fields stay
    let req = test::TestRequest::put()
        .uri(&format!("/api/todos/{}", created.id))
        .append_header((header::AUTHORIZATION, bearer.clone()))
        .set_json(&json!({ "completed": true }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
    let updated: Todo = test::read_body_json(resp).await;
    assert!(updated.completed);
    assert!(updated.completed_at.is_some());
    assert_eq!(updated.task, "Buy milk");
    assert_eq!(updated.description.as_deref(), Some("Semi-skimmed"));

    // Re-asserting completed=true is not a transition
    let first_completed_at = updated.completed_at;
    let req = test::TestRequest::put()
        .uri(&format!("/api/todos/{}", created.id))
        .append_header((header::AUTHORIZATION, bearer.clone()))
        .set_json(&json!({ "completed": true, "task": "Buy oat milk" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
    let updated: Todo = test::read_body_json(resp).await;
    assert_eq!(updated.completed_at, first_completed_at);
    assert_eq!(updated.task, "Buy oat milk");

    // Un-completing clears the timestamp; explicit null clears description
    let req = test::TestRequest::put()
        .uri(&format!("/api/todos/{}", created.id))
        .append_header((header::AUTHORIZATION, bearer.clone()))
        .set_json(&json!({ "completed": false, "description": null }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
    let updated: Todo = test::read_body_json(resp).await;
    assert!(!updated.completed);
    assert!(updated.completed_at.is_none());
    assert!(updated.description.is_none());

    // 4. List with a filter
    let req = test::TestRequest::get()
        .uri("/api/todos?completed=false")
        .append_header((header::AUTHORIZATION, bearer.clone()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
    let todos: Vec<Todo> = test::read_body_json(resp).await;
    assert!(todos.iter().any(|t| t.id == created.id));

    // 5. Delete, then 404 on re-fetch
    let req = test::TestRequest::delete()
        .uri(&format!("/api/todos/{}", created.id))
        .append_header((header::AUTHORIZATION, bearer.clone()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::NO_CONTENT);

    let req = test::TestRequest::get()
        .uri(&format!("/api/todos/{}", created.id))
        .append_header((header::AUTHORIZATION, bearer.clone()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);

    cleanup_user(&pool, email).await;
}

#[actix_rt::test]
async fn test_sequential_appends_yield_dense_positions() {
    let pool = test_pool().await;
    let tokens = TokenService::new(TEST_JWT_SECRET, 30);
    let app = init_app!(pool, tokens);

    let email = "append_dense@example.com";
    cleanup_user(&pool, email).await;
    let user = register_and_login_user(&app, email, "append_dense_user", "PasswordDense123!")
        .await
        .expect("Failed to register/login test user");
    let bearer = format!("Bearer {}", user.token);

    for i in 0..5 {
        let req = test::TestRequest::post()
            .uri("/api/todos")
            .append_header((header::AUTHORIZATION, bearer.clone()))
            .set_json(&json!({ "task": format!("Todo {}", i) }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::CREATED);
        let todo: Todo = test::read_body_json(resp).await;
        assert_eq!(todo.position, i);
    }

    let req = test::TestRequest::get()
        .uri("/api/todos")
        .append_header((header::AUTHORIZATION, bearer.clone()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let todos: Vec<Todo> = test::read_body_json(resp).await;
    let positions: Vec<i32> = todos.iter().map(|t| t.position).collect();
    assert_eq!(positions, vec![0, 1, 2, 3, 4]);

    cleanup_user(&pool, email).await;
}

#[actix_rt::test]
async fn test_reorder_assigns_positions_in_list_order() {
    let pool = test_pool().await;
    let tokens = TokenService::new(TEST_JWT_SECRET, 30);
    let app = init_app!(pool, tokens);

    let email = "reorder@example.com";
    cleanup_user(&pool, email).await;
    let user = register_and_login_user(&app, email, "reorder_user", "PasswordReorder123!")
        .await
        .expect("Failed to register/login test user");
    let bearer = format!("Bearer {}", user.token);

    let mut ids = Vec::new();
    for name in ["first", "second", "third"] {
        let req = test::TestRequest::post()
            .uri("/api/todos")
            .append_header((header::AUTHORIZATION, bearer.clone()))
            .set_json(&json!({ "task": name }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::CREATED);
        let todo: Todo = test::read_body_json(resp).await;
        ids.push(todo.id);
    }
    let (id1, id2, id3) = (ids[0], ids[1], ids[2]);

    // [id3, id1, id2] -> positions 0, 1, 2 in that order
    let req = test::TestRequest::post()
        .uri("/api/todos/reorder")
        .append_header((header::AUTHORIZATION, bearer.clone()))
        .set_json(&json!([id3, id1, id2]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/api/todos")
        .append_header((header::AUTHORIZATION, bearer.clone()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let todos: Vec<Todo> = test::read_body_json(resp).await;
    let ordered_ids: Vec<i32> = todos.iter().map(|t| t.id).collect();
    assert_eq!(ordered_ids, vec![id3, id1, id2]);
    let positions: Vec<i32> = todos.iter().map(|t| t.position).collect();
    assert_eq!(positions, vec![0, 1, 2]);

    // Ids the caller does not own are skipped without failing the batch
    let req = test::TestRequest::post()
        .uri("/api/todos/reorder")
        .append_header((header::AUTHORIZATION, bearer.clone()))
        .set_json(&json!([id1, 999_999_999, id2, id3]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/api/todos")
        .append_header((header::AUTHORIZATION, bearer.clone()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let todos: Vec<Todo> = test::read_body_json(resp).await;
    let ordered_ids: Vec<i32> = todos.iter().map(|t| t.id).collect();
    assert_eq!(ordered_ids, vec![id1, id2, id3]);

    cleanup_user(&pool, email).await;
}

#[actix_rt::test]
async fn test_concurrent_appends_never_duplicate_positions() {
    let pool = test_pool().await;
    let tokens = TokenService::new(TEST_JWT_SECRET, 30);
    let app = init_app!(pool, tokens);

    let email = "concurrent_append@example.com";
    cleanup_user(&pool, email).await;
    let user = register_and_login_user(&app, email, "concurrent_user", "PasswordConc123!")
        .await
        .expect("Failed to register/login test user");
    let bearer = format!("Bearer {}", user.token);

    // Fire a batch of creates that interleave at every await point; the
    // per-user lock in the append path must still hand out distinct
    // positions.
    let requests: Vec<_> = (0..10)
        .map(|i| {
            test::TestRequest::post()
                .uri("/api/todos")
                .append_header((header::AUTHORIZATION, bearer.clone()))
                .set_json(&json!({ "task": format!("Concurrent {}", i) }))
                .to_request()
        })
        .collect();

    let responses = join_all(
        requests
            .into_iter()
            .map(|req| test::call_service(&app, req)),
    )
    .await;

    for resp in &responses {
        assert_eq!(resp.status(), actix_web::http::StatusCode::CREATED);
    }

    let req = test::TestRequest::get()
        .uri("/api/todos")
        .append_header((header::AUTHORIZATION, bearer.clone()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let todos: Vec<Todo> = test::read_body_json(resp).await;

    let mut positions: Vec<i32> = todos.iter().map(|t| t.position).collect();
    positions.sort_unstable();
    assert_eq!(
        positions,
        (0..10).collect::<Vec<i32>>(),
        "positions must be exactly 0..N-1 with no duplicates"
    );

    cleanup_user(&pool, email).await;
}

#[actix_rt::test]
async fn test_todo_ownership_and_authorization() {
    let pool = test_pool().await;
    let tokens = TokenService::new(TEST_JWT_SECRET, 30);
    let app = init_app!(pool, tokens);

    let email_a = "owner_a@example.com";
    let email_b = "other_b@example.com";
    cleanup_user(&pool, email_a).await;
    cleanup_user(&pool, email_b).await;

    let user_a = register_and_login_user(&app, email_a, "owner_a", "PasswordOwnerA123!")
        .await
        .expect("Failed to register/login User A");
    let user_b = register_and_login_user(&app, email_b, "other_b", "PasswordOtherB123!")
        .await
        .expect("Failed to register/login User B");

    // User A creates a todo
    let req = test::TestRequest::post()
        .uri("/api/todos")
        .append_header((header::AUTHORIZATION, format!("Bearer {}", user_a.token)))
        .set_json(&json!({ "task": "User A's todo" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::CREATED);
    let todo_a: Todo = test::read_body_json(resp).await;

    // User B's list does not contain it
    let req = test::TestRequest::get()
        .uri("/api/todos")
        .append_header((header::AUTHORIZATION, format!("Bearer {}", user_b.token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let todos_b: Vec<Todo> = test::read_body_json(resp).await;
    assert!(!todos_b.iter().any(|t| t.id == todo_a.id));

    // Fetch, update, delete by User B all look like "does not exist"
    let req = test::TestRequest::get()
        .uri(&format!("/api/todos/{}", todo_a.id))
        .append_header((header::AUTHORIZATION, format!("Bearer {}", user_b.token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);

    let req = test::TestRequest::put()
        .uri(&format!("/api/todos/{}", todo_a.id))
        .append_header((header::AUTHORIZATION, format!("Bearer {}", user_b.token)))
        .set_json(&json!({ "task": "hijacked" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/todos/{}", todo_a.id))
        .append_header((header::AUTHORIZATION, format!("Bearer {}", user_b.token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);

    // User B cannot attach a todo to User A's category
    let req = test::TestRequest::get()
        .uri("/api/categories")
        .append_header((header::AUTHORIZATION, format!("Bearer {}", user_a.token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let cats_a: Vec<serde_json::Value> = test::read_body_json(resp).await;
    let cat_a_id = cats_a[0]["id"].as_i64().unwrap();

    let req = test::TestRequest::post()
        .uri("/api/todos")
        .append_header((header::AUTHORIZATION, format!("Bearer {}", user_b.token)))
        .set_json(&json!({ "task": "cross-link", "category_id": cat_a_id }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);

    // Sanity: User A still sees their todo
    let req = test::TestRequest::get()
        .uri(&format!("/api/todos/{}", todo_a.id))
        .append_header((header::AUTHORIZATION, format!("Bearer {}", user_a.token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::OK);

    cleanup_user(&pool, email_a).await;
    cleanup_user(&pool, email_b).await;
}
