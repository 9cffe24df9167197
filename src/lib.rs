pub mod auth;
pub mod backend;
pub mod barcode;
pub mod config;
pub mod error;
pub mod lookup;
pub mod model;
pub mod scan;
