pub mod common;
pub mod config;
pub mod errors;
pub mod export;
pub mod form;
pub mod normalize;

pub mod database;
pub mod services;
