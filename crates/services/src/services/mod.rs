pub mod config;
pub mod customers;
pub mod mediator;
pub mod notification;
pub mod pipeline;
pub mod validation;
