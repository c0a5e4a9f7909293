//! Health Wallet: personal health records over a small REST API.
//!
//! Users register, upload medical reports, log vital signs, chart trends and
//! share individual reports with other people by email.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod web;

#[cfg(test)]
mod test_utils;

pub use web::routes::create_router;
