pub mod api_client;
pub mod config;
pub mod controller;
pub mod helpers;
pub mod models;
pub mod repositories;
