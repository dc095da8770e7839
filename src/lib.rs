pub mod config;
pub mod preflight;
pub mod service;
pub mod supervisor;
pub mod utils;
