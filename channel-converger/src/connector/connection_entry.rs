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

//! Pairing of a connection with its admission control.

use crate::config::RateLimitConfig;
use crate::connector::connection::{Connection, ConnectionState};
use crate::connector::rate_limiter::RateLimiter;
use std::time::Instant;

/// One registered connection, its required/optional role and its rate limiter.
///
/// Entries are rebuilt whenever the connection set changes, which also resets the
/// token bucket.
pub struct ConnectionEntry {
    system_id: u32,
    connection: Box<dyn Connection>,
    required: bool,
    rate_limiter: RateLimiter,
}

impl ConnectionEntry {
    pub fn new(
        system_id: u32,
        connection: Box<dyn Connection>,
        required: bool,
        config: &RateLimitConfig,
    ) -> Self {
        Self {
            system_id,
            connection,
            required,
            rate_limiter: RateLimiter::from_config(config, required),
        }
    }

    pub fn system_id(&self) -> u32 {
        self.system_id
    }

    /// Only required entries contribute to the composite state.
    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn connection(&self) -> &dyn Connection {
        self.connection.as_ref()
    }

    /// Direct access that bypasses the rate limiter.
    pub fn connection_mut(&mut self) -> &mut dyn Connection {
        self.connection.as_mut()
    }

    pub fn into_connection(self) -> Box<dyn Connection> {
        self.connection
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Runs `action` against the connection if the rate limiter admits it.
    pub fn attempt<F>(&mut self, action: F) -> bool
    where
        F: FnOnce(&mut dyn Connection),
    {
        self.attempt_at(Instant::now(), action)
    }

    pub fn attempt_at<F>(&mut self, now: Instant, action: F) -> bool
    where
        F: FnOnce(&mut dyn Connection),
    {
        let Self {
            connection,
            rate_limiter,
            ..
        } = self;
        rate_limiter.attempt_action_at(now, || action(connection.as_mut()))
    }
}
