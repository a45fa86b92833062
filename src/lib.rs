pub mod cli;
pub mod config;
pub mod credentials;
pub mod host;
pub mod http;
pub mod login;
pub mod logging;
pub mod models;
pub mod plugin;
pub mod psn;
