//! Taxi demand forecasting for Luxembourg.
//!
//! Collects arrivals at the airport and at Gare Centrale, finds where and
//! when demand peaks, and turns that into a short report for drivers.

pub mod analysis;
pub mod cache;
pub mod config;
pub mod context;
pub mod domain;
pub mod fetch;
pub mod report;
pub mod scheduler;
pub mod sources;
pub mod web;
