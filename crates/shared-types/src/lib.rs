pub mod common;
pub mod config;
pub mod error;
pub mod money;
pub mod reference;
pub mod user;

// CAPCO domain modules
pub mod affaire;
pub mod audience;
pub mod audit;
pub mod conseil;
pub mod dashboard;
pub mod honoraires;
pub mod immobilier;
pub mod import;
pub mod recouvrement;
pub mod search;

pub use common::*;
pub use config::*;
pub use error::*;
pub use reference::*;
pub use user::*;

pub use affaire::*;
pub use audience::*;
pub use audit::*;
pub use conseil::*;
pub use dashboard::*;
pub use honoraires::*;
pub use immobilier::*;
pub use import::*;
pub use recouvrement::*;
pub use search::*;
