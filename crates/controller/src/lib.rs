/*
 * 5D Labs Nomad GitOps Controller
 * Copyright (C) 2025 5D Labs
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published
 * by the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 */

#![warn(clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::doc_markdown,
    clippy::module_name_repetitions
)]

//! GitOps reconciliation engine for Nomad
//!
//! Resources stored as Nomad Variables describe git repositories and the job
//! specifications inside them. Each reconciliation pass synchronizes every
//! owned repository, discovers job files, stamps them with provenance
//! metadata and registers them with Nomad.

pub mod apply;
pub mod config;
pub mod discovery;
pub mod driver;
pub mod error;
pub mod loader;
pub mod materialize;
pub mod paths;
pub mod resources;
pub mod scheduler;
pub mod status;
pub mod store;
pub mod sync;

// Re-export commonly used types
pub use apply::{ApplyEngine, ApplyReport, JobRegistrar};
pub use config::{ControllerConfig, LogFormat};
pub use driver::{PassReport, Reconciler};
pub use error::{Error, Result};
pub use materialize::{JobSpec, Provenance, SpecParser};
pub use resources::{
    ControllerIdentity, GitRepository, Items, NomadJobGroup, ResourceKind, ResourceRecord,
};
pub use scheduler::{shutdown_signal, Scheduler};
pub use store::{RecordMetadata, ResourceStore};
pub use sync::{GitTransport, RepositorySynchronizer};
