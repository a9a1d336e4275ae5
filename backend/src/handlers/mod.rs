pub mod auth;
pub mod cats;
pub mod matches;
