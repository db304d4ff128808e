pub mod generate;
pub mod handlers;
pub mod models;
