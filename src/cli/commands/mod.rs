pub mod auth;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod notifications;
pub mod sales;
