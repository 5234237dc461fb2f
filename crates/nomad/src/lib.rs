//! Minimal typed client for the Nomad HTTP API.
//!
//! Covers the endpoints the GitOps controller relies on:
//!
//! - `GET /v1/vars`, `GET /v1/var/:path`, `PUT /v1/var/:path` (Variables)
//! - `POST /v1/jobs/parse` (HCL job specification parsing)
//! - `POST /v1/jobs` (job registration)
//!
//! # Usage
//!
//! ```no_run
//! use nomad::{ClientConfig, NomadClient};
//!
//! # async fn run() -> nomad::Result<()> {
//! let client = NomadClient::new(&ClientConfig::default())?;
//! let vars = client.list_variables("nomadops/v1/", nomad::ALL_NAMESPACES).await?;
//! println!("{} variables", vars.len());
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod client;
pub mod error;
pub mod models;

pub use client::{ClientConfig, NomadClient, ALL_NAMESPACES, DEFAULT_ADDRESS};
pub use error::{Error, Result};
pub use models::{JobRegisterResponse, Variable, VariableItems, VariableMetadata};
