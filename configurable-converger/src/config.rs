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


use channel_converger::{ChannelAddress, ChannelFilter, ConvergerConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_run_for_ms() -> u64 {
    5_000
}

fn default_required() -> bool {
    true
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default)]
    pub(crate) converger: ConvergerConfig,
    pub(crate) systems: Vec<SystemConfig>,
    #[serde(default)]
    pub(crate) areas_of_interest: Vec<AreaOfInterestConfig>,
    #[serde(default)]
    pub(crate) dependencies: Vec<DependencyConfig>,
    #[serde(default = "default_run_for_ms")]
    pub(crate) run_for_ms: u64,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct SystemConfig {
    pub(crate) system_id: u32,
    pub(crate) name: String,
    #[serde(default = "default_required")]
    pub(crate) required: bool,
    #[serde(default)]
    pub(crate) latency_ms: u64,
    /// Channel ids whose subscribe requests this system rejects.
    #[serde(default)]
    pub(crate) fail_subscribe: Vec<u32>,
    #[serde(default)]
    pub(crate) fail_connect_attempts: u32,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct AddressConfig {
    pub(crate) system_id: u32,
    pub(crate) channel_id: u32,
    #[serde(default)]
    pub(crate) root_id: Option<u32>,
    #[serde(default)]
    pub(crate) filter_instance_id: Option<String>,
}

impl AddressConfig {
    pub(crate) fn address(&self) -> ChannelAddress {
        channel_address(
            self.system_id,
            self.channel_id,
            self.root_id,
            self.filter_instance_id.as_deref(),
        )
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct AreaOfInterestConfig {
    pub(crate) system_id: u32,
    pub(crate) channel_id: u32,
    #[serde(default)]
    pub(crate) root_id: Option<u32>,
    #[serde(default)]
    pub(crate) filter_instance_id: Option<String>,
    #[serde(default)]
    pub(crate) filter: Option<Value>,
}

impl AreaOfInterestConfig {
    pub(crate) fn address(&self) -> ChannelAddress {
        channel_address(
            self.system_id,
            self.channel_id,
            self.root_id,
            self.filter_instance_id.as_deref(),
        )
    }

    pub(crate) fn filter(&self) -> Option<ChannelFilter> {
        self.filter.clone().map(ChannelFilter::new)
    }
}

fn channel_address(
    system_id: u32,
    channel_id: u32,
    root_id: Option<u32>,
    filter_instance_id: Option<&str>,
) -> ChannelAddress {
    let address = match root_id {
        Some(root_id) => ChannelAddress::instance(system_id, channel_id, root_id),
        None => ChannelAddress::new(system_id, channel_id),
    };
    match filter_instance_id {
        Some(filter_instance_id) => address.with_filter_instance(filter_instance_id),
        None => address,
    }
}

/// A link the remote side establishes on its own: subscribing `dependent` also
/// subscribes `dependency`.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct DependencyConfig {
    pub(crate) dependent: AddressConfig,
    pub(crate) dependency: AddressConfig,
    #[serde(default)]
    pub(crate) filter: Option<Value>,
}
