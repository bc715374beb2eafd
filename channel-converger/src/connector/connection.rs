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

//! Boundary to the per-system connection and session layer.

use crate::{ChannelAddress, ChannelFilter};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Lifecycle state of one connection, and of the composite connector system.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
    Error,
}

impl ConnectionState {
    /// Returns `true` while a connect or disconnect is underway.
    pub fn is_transitional(&self) -> bool {
        matches!(self, Self::Connecting | Self::Disconnecting)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnecting => "disconnecting",
            Self::Error => "error",
        }
    }
}

impl Display for ConnectionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of subscription action a connection may have queued.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Add,
    Remove,
    Update,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Update => "update",
        }
    }
}

impl Display for ActionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One connection to one data system.
///
/// Requests are fire-and-forget: an implementation queues them and later reports
/// the outcome as a [`ConnectionEvent`](crate::ConnectionEvent) on the converger's
/// [`EventQueue`](crate::EventQueue). State changes are reported the same way.
///
/// Pending-action lookups match on address. `Add` and `Update` lookups also match
/// the filter using [`filters_equal`](crate::filters_equal); `Remove` lookups
/// ignore it.
pub trait Connection {
    fn state(&self) -> ConnectionState;

    fn connect(&mut self);

    fn disconnect(&mut self);

    /// Returns `true` when the remote side has acknowledged a subscription to `address`.
    fn is_subscribed(&self, address: &ChannelAddress) -> bool;

    /// Position of the matching action in the connection's outgoing queue.
    fn index_of_pending_action(
        &self,
        kind: ActionKind,
        address: &ChannelAddress,
        filter: Option<&ChannelFilter>,
    ) -> Option<usize>;

    fn is_action_pending(
        &self,
        kind: ActionKind,
        address: &ChannelAddress,
        filter: Option<&ChannelFilter>,
    ) -> bool {
        self.index_of_pending_action(kind, address, filter).is_some()
    }

    fn request_subscribe(&mut self, address: &ChannelAddress, filter: Option<&ChannelFilter>);

    fn request_unsubscribe(&mut self, address: &ChannelAddress);

    fn request_subscription_update(
        &mut self,
        address: &ChannelAddress,
        filter: Option<&ChannelFilter>,
    );
}
