pub mod config;
pub mod domain;
pub mod factory;
pub mod inbound;
pub mod outbound;

pub use domain::identity;
pub use outbound::repositories;
