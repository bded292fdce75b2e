pub mod click;
pub mod config;
pub mod converter;
pub mod detail;
pub mod driver;
pub mod listing;
pub mod navigator;
pub mod page;
pub mod persist;
pub mod run;
