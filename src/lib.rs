// onemg-exporter - Library root for testing

pub mod config;
pub mod csv;
pub mod error;
pub mod exporter;
pub mod http_client;
pub mod records;
