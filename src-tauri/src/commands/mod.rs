pub mod admin;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod notifications;
pub mod profile;
pub mod wizard;
