pub mod app;
pub mod bvbrc;
pub mod config;
pub mod domain;
pub mod error;
pub mod layout;
pub mod logging;
pub mod output;
pub mod table;
