pub mod aggregator;
pub mod app;
pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod logging;
pub mod models;
pub mod paging;
pub mod producer;
pub mod retry;
pub mod routes;
pub mod selection;
pub mod store;
pub mod usecases;

#[cfg(test)]
mod test_utils;

pub const VERSION: &str = "0.1.0";
