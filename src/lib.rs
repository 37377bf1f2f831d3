pub mod auth;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod filter;
pub mod forms;
pub mod routes;
pub mod rules;
