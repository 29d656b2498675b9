pub mod category;
pub mod todo;
pub mod user;

pub use category::{Category, CategoryInput};
pub use todo::{Priority, Todo, TodoInput, TodoQuery, TodoUpdate};
pub use user::{User, UserCredentials};
