pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod gateway;
pub mod io;
pub mod transaction;

pub use application::{AccountService, AppError, BulkCoordinator};
pub use config::Settings;
pub use domain::*;
pub use gateway::{HorizonGateway, LedgerGateway};
