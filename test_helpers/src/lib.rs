//! Test helpers shared across crates in the docweave workspace.
//!
//! Provides a Kubernetes-flavoured sample catalog with matching manifests, and
//! helpers for running configuration tests inside a `figment::Jail`.

pub mod figment;
pub mod sample;
