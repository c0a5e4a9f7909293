// src/services/mod.rs
pub mod auth_service;
pub mod report_service;
pub mod share_service;
pub mod storage;
pub mod user_service;
pub mod vital_service;
