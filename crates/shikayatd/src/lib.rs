//! Shikayat daemon - HTTP service for the civic complaint pipeline.

pub mod routes;
pub mod server;

#[cfg(test)]
mod routes_tests;
