pub mod auth;
pub mod categories;
pub mod health;
pub mod todos;
pub mod users;

use actix_web::web;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(auth::login)
            .service(auth::register),
    )
    .service(web::scope("/users").service(users::me).service(users::delete_me))
    .service(
        web::scope("/categories")
            .service(categories::get_categories)
            .service(categories::create_category)
            .service(categories::update_category)
            .service(categories::delete_category),
    )
    .service(
        web::scope("/todos")
            .service(todos::get_todos)
            .service(todos::create_todo)
            .service(todos::reorder_todos)
            .service(todos::get_todo)
            .service(todos::update_todo)
            .service(todos::delete_todo),
    );
}
