pub mod authorization;
pub mod circuit_breaker;
pub mod config_service;
pub mod health;
pub mod rbmq;
pub mod redis;
