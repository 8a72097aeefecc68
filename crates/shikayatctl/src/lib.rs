//! Shikayat Control - CLI client for the shikayat daemon.

pub mod commands;
pub mod http_client;
