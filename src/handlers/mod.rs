pub mod auth;
pub mod forms;
pub mod health;
pub mod media;
pub mod orders;
pub mod products;
pub mod users;
