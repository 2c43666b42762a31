pub mod app_error;
pub mod helpers;
pub mod jwt;
pub mod ports;
pub mod use_cases;
