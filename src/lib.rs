pub mod cache;
pub mod check;
pub mod cli;
pub mod config;
pub mod coordinates;
pub mod model;
pub mod report;
pub mod repository;
pub mod resolver;
pub mod scanner;
pub mod upload;

mod api;

pub use api::{Pomcheck, PomcheckBuilder};
