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

//! Tunables for the connector system and the convergence engine.

use serde::{Deserialize, Serialize};

pub const DEFAULT_ACTION_COST: f64 = 100.0;
pub const DEFAULT_ACTIONS_PER_SECOND: f64 = 1.0;
pub const DEFAULT_MAX_PASSES_PER_DRAIN: usize = 64;

/// Divisor applied to the refill rate of optional connections.
pub const OPTIONAL_REFILL_DIVISOR: f64 = 5.0;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConvergerConfig {
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Upper bound on convergence passes run by one `process_events` call.
    #[serde(default = "default_max_passes_per_drain")]
    pub max_passes_per_drain: usize,
}

impl Default for ConvergerConfig {
    fn default() -> Self {
        Self {
            rate_limit: RateLimitConfig::default(),
            max_passes_per_drain: DEFAULT_MAX_PASSES_PER_DRAIN,
        }
    }
}

/// Token bucket parameters shared by every connection entry.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// When `false` every action is admitted immediately.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_action_cost")]
    pub action_cost: f64,
    #[serde(default = "default_actions_per_second")]
    pub actions_per_second: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            action_cost: DEFAULT_ACTION_COST,
            actions_per_second: DEFAULT_ACTIONS_PER_SECOND,
        }
    }
}

impl RateLimitConfig {
    pub fn unlimited() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn capacity(&self) -> f64 {
        2.0 * self.action_cost
    }

    /// Tokens regained per millisecond.
    pub fn refill_per_ms(&self, required: bool) -> f64 {
        let rate = self.action_cost * self.actions_per_second / 1000.0;
        if required {
            rate
        } else {
            rate / OPTIONAL_REFILL_DIVISOR
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_action_cost() -> f64 {
    DEFAULT_ACTION_COST
}

fn default_actions_per_second() -> f64 {
    DEFAULT_ACTIONS_PER_SECOND
}

fn default_max_passes_per_drain() -> usize {
    DEFAULT_MAX_PASSES_PER_DRAIN
}
