//! HermessApp birthday scraper
//!
//! This library provides the core of the birthday-scraper service: an
//! in-memory task registry, background scrape workers, result staging and
//! time-based cleanup, exposed over a small HTTP API.

pub mod app_state;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;
