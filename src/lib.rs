pub mod api;
pub mod clients;
pub mod config;
pub mod mapping;
pub mod models;
pub mod pipeline;
pub mod routing;
pub mod utils;
