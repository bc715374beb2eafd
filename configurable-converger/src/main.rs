/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/


mod config;
mod error;
mod scenario;
mod simulated_connection;

use crate::config::Scenario;
use crate::error::ScenarioError;
use clap::Parser;
use std::fs;
use tokio::task::LocalSet;
use tracing::info;

#[derive(Parser)]
#[command()]
struct ConvergerArgs {
    #[arg(short, long, value_name = "FILE")]
    config: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ScenarioError> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    info!("Started configurable-converger");

    let args = ConvergerArgs::parse();
    let contents = fs::read_to_string(&args.config).map_err(|source| ScenarioError::Io {
        path: args.config.clone(),
        source,
    })?;
    let scenario: Scenario = json5::from_str(&contents)?;

    let report = LocalSet::new().run_until(scenario::run(scenario)).await?;
    info!(
        converged = report.converged,
        elapsed_ms = report.elapsed_ms,
        "scenario finished"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
