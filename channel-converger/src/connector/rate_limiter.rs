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

//! Token bucket admission control for connection actions.

use crate::config::RateLimitConfig;
use std::time::Instant;

/// Token bucket that gates how fast one connection is asked to act.
///
/// The bucket starts full. Every admitted action consumes `action_cost` tokens and
/// tokens are regained in proportion to the wall-clock time elapsed since the
/// previous attempt, up to `capacity`.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    enabled: bool,
    action_cost: f64,
    capacity: f64,
    refill_per_ms: f64,
    tokens: f64,
    last_update: Option<Instant>,
}

impl RateLimiter {
    pub fn new(action_cost: f64, capacity: f64, refill_per_ms: f64) -> Self {
        Self {
            enabled: true,
            action_cost,
            capacity,
            refill_per_ms,
            tokens: capacity,
            last_update: None,
        }
    }

    /// Builds the limiter for a required or optional connection.
    pub fn from_config(config: &RateLimitConfig, required: bool) -> Self {
        Self {
            enabled: config.enabled,
            ..Self::new(
                config.action_cost,
                config.capacity(),
                config.refill_per_ms(required),
            )
        }
    }

    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    pub fn refill_per_ms(&self) -> f64 {
        self.refill_per_ms
    }

    /// Runs `action` if enough tokens are available. Returns whether it ran.
    pub fn attempt_action<F: FnOnce()>(&mut self, action: F) -> bool {
        self.attempt_action_at(Instant::now(), action)
    }

    pub fn attempt_action_at<F: FnOnce()>(&mut self, now: Instant, action: F) -> bool {
        if !self.try_acquire_at(now) {
            return false;
        }
        action();
        true
    }

    pub fn try_acquire_at(&mut self, now: Instant) -> bool {
        if !self.enabled {
            return true;
        }
        self.refill(now);
        if self.tokens < self.action_cost {
            return false;
        }
        self.tokens -= self.action_cost;
        true
    }

    fn refill(&mut self, now: Instant) {
        if let Some(last_update) = self.last_update {
            let elapsed_ms = now.saturating_duration_since(last_update).as_secs_f64() * 1000.0;
            self.tokens = (self.tokens + elapsed_ms * self.refill_per_ms).min(self.capacity);
        }
        self.last_update = Some(now);
    }
}
