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

//! GitOps controller service
//!
//! Runs reconciliation passes on a cron schedule, or once with `--one-off`.

use anyhow::{Context, Result};
use clap::Parser;
use controller::{shutdown_signal, ControllerConfig, LogFormat, Reconciler, Scheduler};
use nomad::NomadClient;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ControllerConfig::parse();

    init_tracing(config.log_format);

    config.validate().context("invalid configuration")?;

    info!(
        controller_name = %config.controller_name,
        controller_namespace = %config.controller_namespace,
        nomad_addr = %config.nomad_addr,
        one_off = config.one_off,
        "Starting GitOps controller"
    );

    let base_dir = config.clone_base_path();
    tokio::fs::create_dir_all(&base_dir)
        .await
        .with_context(|| format!("failed to create clone base directory {}", base_dir.display()))?;
    info!(path = %base_dir.display(), "Clone base directory ready");

    let client = NomadClient::new(&config.nomad_client_config())
        .context("failed to create Nomad client")?;
    let reconciler = Arc::new(Reconciler::for_nomad(&config, client));

    if config.one_off {
        info!("Running single reconciliation pass");
        reconciler.run_pass().await;
        return Ok(());
    }

    let schedule = config.schedule()?;
    info!(cron = %config.sync_cron, "Scheduling reconciliation passes");
    Scheduler::new(schedule, reconciler)
        .run_until(shutdown_signal())
        .await;

    info!("GitOps controller stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Text => registry.with(fmt::layer()).init(),
    }
}
