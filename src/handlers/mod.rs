pub mod asset_handlers;
pub mod health_handlers;
