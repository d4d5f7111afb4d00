#[cfg(test)]
mod tests;

pub mod app;
pub mod config;
pub mod controller;
pub mod governor;
pub mod http;
pub mod metrics;
pub mod platform;
pub mod shutdown;
pub mod workers;
