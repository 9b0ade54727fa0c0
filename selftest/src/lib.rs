/*!

Provides utilities for testing the harness against a throwaway `kind` cluster. We call this
testing modality `selftest` to distinguish it from the scenarios the harness deploys.

!*/

pub mod cluster;
mod test_settings;

pub use cluster::Cluster;
