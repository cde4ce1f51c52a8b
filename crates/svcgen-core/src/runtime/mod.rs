//! External tools the generated project is set up with
//!
//! This module provides:
//! - Terraform detection, version lookup and `terraform init`

pub mod terraform;

pub use terraform::Terraform;
