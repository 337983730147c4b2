pub mod cache;
pub mod dispatch;
pub mod local;
pub mod resolver;
pub mod strategy;
