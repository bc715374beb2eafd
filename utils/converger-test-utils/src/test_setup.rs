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


use channel_converger::{ConvergerConfig, RateLimitConfig};
use tracing_subscriber::EnvFilter;

/// Installs a global `fmt` subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Configuration whose rate limiter admits every action.
pub fn unthrottled_config() -> ConvergerConfig {
    ConvergerConfig {
        rate_limit: RateLimitConfig::unlimited(),
        ..ConvergerConfig::default()
    }
}
