//! Pharmacovigilance signal detection and ranking.

pub mod api;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod index;
pub mod logging;
pub mod signals;
