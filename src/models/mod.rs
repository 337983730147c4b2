pub mod authorization;
pub mod circuit_breaker;
pub mod event;
pub mod health;
pub mod mapping;
pub mod message;
pub mod retry;
pub mod routing;
