pub mod cats;
pub mod connection;
pub mod matches;
pub mod migrations;
pub mod users;

pub use connection::{DatabaseConfig, get_db_pool};
