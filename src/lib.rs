//! Leave accrual and balance service for the HRM system.

pub mod api;
pub mod auth;
pub mod clock;
pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod leave;
pub mod model;
pub mod routes;
pub mod storage;
