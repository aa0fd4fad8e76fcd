pub mod admin;
pub mod auth;
pub mod complaints;
pub mod employee;
pub mod health;
pub mod notifications;
pub mod role_requests;
pub mod users;
