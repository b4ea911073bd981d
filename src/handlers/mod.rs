pub mod config_handler;
pub mod devices;
pub mod discover;
pub mod run;
pub mod tasks;
