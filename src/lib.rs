pub mod app;
pub mod bioindex;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod ledger;
pub mod output;
pub mod select;
