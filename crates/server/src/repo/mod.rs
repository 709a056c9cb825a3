//! Database access, one module per aggregate. Functions take the pool
//! explicitly and return `AppError` on failure.

pub mod affaire;
pub mod audience;
pub mod conseil;
pub mod dashboard;
pub mod encaissement;
pub mod honoraires;
pub mod immobilier;
pub mod recouvrement;
pub mod user;
