//! Progress tracking, result aggregation and report export for website
//! migration audits.
//!
//! A job runner measures each URL of a migration (performance, SEO, mobile
//! friendliness) and reports back in snapshots. This crate turns those
//! snapshots into canonical per-URL records, keeps running statistics, moves
//! each project through its lifecycle and produces CSV/JSON reports.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;
