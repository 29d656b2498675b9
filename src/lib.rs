#![doc = "The `donelist` library crate."]
#![doc = ""]
#![doc = "Core business logic for the donelist task-management API: domain models,"]
#![doc = "authentication (password hashing, bearer tokens, per-request identity"]
#![doc = "resolution), route handlers, configuration, and error handling. The main"]
#![doc = "binary (`main.rs`) wires these together into a running server."]

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
