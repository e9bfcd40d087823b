pub mod aggregation;
pub mod events;
pub mod server;
pub mod services;
pub mod web;
