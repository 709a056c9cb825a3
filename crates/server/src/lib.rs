pub mod audit;
pub mod auth;
pub mod config;
pub mod db;
pub mod error_convert;
pub mod health;
pub mod openapi;
pub mod pagination;
pub mod reference;
pub mod rest;
pub mod search;
pub mod telemetry;

// Document generation and spreadsheet exchange
pub mod spreadsheet;
pub mod typst;

// CAPCO domain persistence
pub mod repo;
