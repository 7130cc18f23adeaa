//! Monitoring checks for kubeprobe
//!
//! This crate maps each supported (action, resource) pair to the handler that
//! turns a fetched resource list into the value printed for the monitor.

mod deployments;
mod dispatch;

pub use deployments::{discover_deployments, get_deployments, render_value};
pub use dispatch::{Dispatcher, Handler, Query};
