pub mod config;
pub mod dashboard;
pub mod event_store;
pub mod snapshot_channel;
