//! Kubernetes client for kubeprobe
//!
//! This crate builds a token-authenticated client for a single API server and
//! fetches resource lists as plain JSON trees for caching.

mod client;

pub use client::{ClusterConfig, DEPLOYMENT_STATUS_FIELDS, KubeClient, deployment_list_value};
