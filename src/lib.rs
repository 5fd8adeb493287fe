pub mod config;
pub mod criteria;
pub mod display;
pub mod session;
pub mod tmdb;
