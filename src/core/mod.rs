pub mod app;
pub mod chart;
pub mod cli;
pub mod config;
pub mod render;
pub mod scrub;
pub mod session;
pub mod stream;
pub mod transcript;
