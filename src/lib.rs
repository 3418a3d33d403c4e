pub mod cache;
pub mod config;
pub mod dom;
pub mod error;
pub mod event;
pub mod input;
pub mod logging;
pub mod nav;
pub mod transition;
pub mod transport;
