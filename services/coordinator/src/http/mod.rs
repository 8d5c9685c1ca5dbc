//! HTTP Surface (C8, §4.8).

pub mod dto;
pub mod handlers;
pub mod routes;

pub use routes::build_routes;
