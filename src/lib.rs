//! Berth: an interactive terminal dashboard for Docker and Docker Swarm.
//!
//! This library exposes the core modules for use by the binary and by tests.

pub mod app;
pub mod cancel;
pub mod cli;
pub mod component;
pub mod config;
pub mod demux;
pub mod error;
pub mod model;
pub mod runtime;
pub mod theme;
pub mod view;
