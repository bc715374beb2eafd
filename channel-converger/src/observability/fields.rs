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

//! Canonical structured field keys and value-format helpers.

use crate::ChannelFilter;

pub const EVENT: &str = "event";
pub const COMPONENT: &str = "component";
pub const ADDRESS: &str = "address";
pub const SYSTEM_ID: &str = "system_id";
pub const ACTION: &str = "action";
pub const FILTER: &str = "filter";
pub const PREVIOUS_STATE: &str = "previous_state";
pub const STATE: &str = "state";
pub const REF_COUNT: &str = "ref_count";
pub const REASON: &str = "reason";
pub const ERR: &str = "err";

pub const NONE: &str = "none";
pub const REASON_NOT_CONNECTED: &str = "not_connected";
pub const REASON_UNKNOWN_SYSTEM: &str = "unknown_system";
pub const REASON_UNKNOWN_DEPENDENT: &str = "unknown_dependent";

/// Renders a filter for log output, `none` when absent.
pub fn format_filter(filter: Option<&ChannelFilter>) -> String {
    filter
        .map(ChannelFilter::canonical)
        .unwrap_or_else(|| NONE.to_string())
}
