//! Poll lifecycle and response aggregation: yes/no, yes/no/maybe and
//! short-answer polls, stored in SQLite and tallied for display.

pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod models;
pub mod presentation;
pub mod tally;
