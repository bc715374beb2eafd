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


use crate::config::Scenario;
use crate::error::ScenarioError;
use crate::simulated_connection::SimulatedConnection;
use channel_converger::{
    AreaOfInterestStatus, ChannelFilter, ConnectionState, Converger, ConvergerStats,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::{info, warn};

/// Upper bound on how long the driver sleeps without a completion, so throttled
/// work and connection retries are re-checked.
const TICK_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Serialize)]
pub(crate) struct AreaReport {
    pub(crate) address: String,
    pub(crate) status: AreaOfInterestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) last_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ScenarioReport {
    pub(crate) converged: bool,
    pub(crate) elapsed_ms: u64,
    pub(crate) stats: ConvergerStats,
    pub(crate) areas_of_interest: Vec<AreaReport>,
}

/// Checks cross references the schema cannot express.
pub(crate) fn validate(scenario: &Scenario) -> Result<(), ScenarioError> {
    let mut systems = BTreeSet::new();
    for system in &scenario.systems {
        if !systems.insert(system.system_id) {
            return Err(ScenarioError::Invalid(format!(
                "duplicate system id {}",
                system.system_id
            )));
        }
    }

    for area in &scenario.areas_of_interest {
        if !systems.contains(&area.system_id) {
            return Err(ScenarioError::Invalid(format!(
                "area of interest {} names an unknown system",
                area.address()
            )));
        }
    }

    for dependency in &scenario.dependencies {
        let dependent = dependency.dependent.address();
        let required = dependency.dependency.address();
        if dependent.system_id() != required.system_id() {
            return Err(ScenarioError::Invalid(format!(
                "dependency {dependent} -> {required} crosses systems"
            )));
        }
        if !systems.contains(&dependent.system_id()) {
            return Err(ScenarioError::Invalid(format!(
                "dependency {dependent} -> {required} names an unknown system"
            )));
        }
    }
    Ok(())
}

/// Runs the scenario until it converges or `run_for_ms` elapses.
///
/// Must be called from within a `LocalSet`: simulated connections complete on
/// `spawn_local` tasks.
pub(crate) async fn run(scenario: Scenario) -> Result<ScenarioReport, ScenarioError> {
    validate(&scenario)?;

    let started = Instant::now();
    let deadline = started + Duration::from_millis(scenario.run_for_ms);
    let wake = Rc::new(Notify::new());
    let mut converger = Converger::new(scenario.converger.clone());

    let mut connections = Vec::with_capacity(scenario.systems.len());
    for system in &scenario.systems {
        let connection = SimulatedConnection::new(
            system.system_id,
            &system.name,
            Duration::from_millis(system.latency_ms),
            converger.event_queue(),
            Rc::clone(&wake),
        );
        connection.fail_subscribe_to(system.fail_subscribe.iter().copied());
        connection.fail_connect_attempts(system.fail_connect_attempts);
        converger.connector_mut().add_connection(
            system.system_id,
            Box::new(connection.clone()),
            system.required,
        )?;
        connections.push((system.system_id, connection));
    }

    for dependency in &scenario.dependencies {
        let dependent = dependency.dependent.address();
        if let Some((_, connection)) = connections
            .iter()
            .find(|(system_id, _)| *system_id == dependent.system_id())
        {
            connection.add_implicit_dependency(
                dependent,
                dependency.dependency.address(),
                dependency.filter.clone().map(ChannelFilter::new),
            );
        }
    }

    converger.pause_and_run(|converger| {
        for area in &scenario.areas_of_interest {
            converger
                .areas_mut()
                .create_or_update_area_of_interest(area.address(), area.filter());
        }
    });
    info!(
        systems = scenario.systems.len(),
        areas_of_interest = scenario.areas_of_interest.len(),
        "scenario loaded"
    );

    converger.activate();
    let converged = loop {
        converger.tick();
        if is_settled(&converger, &connections) {
            break true;
        }

        let now = Instant::now();
        if now >= deadline {
            warn!(
                run_for_ms = scenario.run_for_ms,
                state = %converger.connector().state(),
                "scenario did not converge in time"
            );
            break false;
        }
        let wait = TICK_INTERVAL.min(deadline - now);
        let _ = tokio::time::timeout(wait, wake.notified()).await;
    };

    Ok(ScenarioReport {
        converged,
        elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        stats: converger.stats(),
        areas_of_interest: converger
            .areas()
            .areas_of_interest()
            .map(|(_, area)| AreaReport {
                address: area.address().to_string(),
                status: area.status(),
                last_error: area.last_error().map(str::to_string),
            })
            .collect(),
    })
}

fn is_settled(converger: &Converger, connections: &[(u32, SimulatedConnection)]) -> bool {
    converger.is_converge_complete()
        && converger.event_queue().is_empty()
        && converger.connector().state() == ConnectionState::Connected
        && connections.iter().all(|(_, connection)| connection.is_idle())
}
