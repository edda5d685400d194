//! Request handlers for the gateway HTTP surface

pub mod dispatch;
pub mod health;
pub mod register;
pub mod services;

pub use dispatch::dispatch_router;
pub use health::health_router;
pub use register::register_router;
pub use services::services_router;
