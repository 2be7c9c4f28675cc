pub mod aggregator;
pub mod app;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod layers;
pub mod output;
pub mod parser;
pub mod sotka;
