pub mod app;
pub mod attributes;
pub mod catalog;
pub mod classify;
pub mod config;
pub mod ctd;
pub mod error;
pub mod linker;
pub mod lookup;
pub mod matcher;
pub mod normalize;
pub mod output;
pub mod reconcile;
pub mod remote;
pub mod spreadsheet;
pub mod sqlite;
pub mod store;
pub mod table;
pub mod water_column;
