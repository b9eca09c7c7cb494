//! Library exports for the lead intake webhook
//!
//! This module exposes internal components for testing and potential library usage.

pub mod agent;
pub mod allocator;
pub mod config;
pub mod database;
pub mod error;
pub mod handler;
pub mod lookup;
pub mod middleware;
pub mod model;
pub mod route;
pub mod transform;
pub mod validation;
