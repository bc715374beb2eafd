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

//! Canonical structured event names used across `channel-converger`.

// Interest graph events.
pub const SCOPE_CREATED: &str = "scope_created";
pub const SCOPE_RELEASED: &str = "scope_released";
pub const SUBSCRIPTION_RECORDED: &str = "subscription_recorded";
pub const SUBSCRIPTION_RELEASED: &str = "subscription_released";
pub const SUBSCRIPTION_DELETED: &str = "subscription_deleted";
pub const REQUIREMENT_ADDED: &str = "requirement_added";
pub const REQUIREMENT_REJECTED: &str = "requirement_rejected";

// Area-of-interest events.
pub const AREA_OF_INTEREST_CREATED: &str = "area_of_interest_created";
pub const AREA_OF_INTEREST_UPDATED: &str = "area_of_interest_updated";
pub const AREA_OF_INTEREST_STATUS_CHANGED: &str = "area_of_interest_status_changed";
pub const AREA_OF_INTEREST_DISPOSED: &str = "area_of_interest_disposed";

// Connector events.
pub const CONNECTION_ADDED: &str = "connection_added";
pub const CONNECTION_REMOVED: &str = "connection_removed";
pub const CONNECTION_SET_REPLACED: &str = "connection_set_replaced";
pub const CONNECTOR_STATE_CHANGED: &str = "connector_state_changed";
pub const CONNECTION_CONNECT_REQUESTED: &str = "connection_connect_requested";
pub const CONNECTION_DISCONNECT_REQUESTED: &str = "connection_disconnect_requested";
pub const CONNECTION_ACTION_THROTTLED: &str = "connection_action_throttled";

// Convergence engine events.
pub const CONVERGER_ACTIVATED: &str = "converger_activated";
pub const CONVERGER_DEACTIVATED: &str = "converger_deactivated";
pub const CONVERGE_PLAN_BUILT: &str = "converge_plan_built";
pub const CONVERGE_CYCLE_SKIPPED: &str = "converge_cycle_skipped";
pub const CONVERGE_PASS_SKIPPED: &str = "converge_pass_skipped";
pub const CONVERGE_PASS_COMPLETE: &str = "converge_pass_complete";
pub const CONVERGE_PASS_LIMIT_REACHED: &str = "converge_pass_limit_reached";
pub const CONVERGE_TARGET_SKIPPED: &str = "converge_target_skipped";
pub const CONVERGE_TARGET_REJECTED: &str = "converge_target_rejected";
pub const CONVERGE_ACTION_SUBMITTED: &str = "converge_action_submitted";
pub const CONVERGE_ACTION_THROTTLED: &str = "converge_action_throttled";
pub const CONVERGE_ORPHAN_DROPPED: &str = "converge_orphan_dropped";

// Connection completion events.
pub const CONNECTION_EVENT_RECEIVED: &str = "connection_event_received";
pub const CONNECTION_EVENT_IGNORED: &str = "connection_event_ignored";
pub const CONNECTION_INVALID_TRANSITION: &str = "connection_invalid_transition";
pub const REMOTE_ACTION_FAILED: &str = "remote_action_failed";
