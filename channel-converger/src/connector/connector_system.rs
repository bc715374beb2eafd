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

//! Composite lifecycle state over every registered connection.

use crate::config::RateLimitConfig;
use crate::connector::connection::{Connection, ConnectionState};
use crate::connector::connection_entry::ConnectionEntry;
use crate::error::{ConvergerError, Result};
use crate::listener::ListenerList;
use crate::observability::events;
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::{debug, info};

const COMPONENT: &str = "connector_system";

/// Receives composite state changes of a [`ConnectorSystem`].
pub trait ConnectorListener {
    fn on_state_changed(&self, previous: ConnectionState, current: ConnectionState);
}

pub type ConnectorListeners = Rc<ListenerList<dyn ConnectorListener>>;

/// Rolls N per-system connection states up into one state and drives connects.
///
/// Only required connections contribute to the composite state. Optional ones are
/// still connected and disconnected in lockstep with the desired active flag.
pub struct ConnectorSystem {
    rate_limit: RateLimitConfig,
    entries: BTreeMap<u32, ConnectionEntry>,
    active: bool,
    state: ConnectionState,
    listeners: ConnectorListeners,
}

impl ConnectorSystem {
    pub fn new(rate_limit: RateLimitConfig) -> Self {
        Self::with_listeners(rate_limit, Rc::new(ListenerList::new()))
    }

    pub fn with_listeners(rate_limit: RateLimitConfig, listeners: ConnectorListeners) -> Self {
        Self {
            rate_limit,
            entries: BTreeMap::new(),
            active: false,
            state: ConnectionState::Disconnected,
            listeners,
        }
    }

    pub fn listeners(&self) -> ConnectorListeners {
        self.listeners.clone()
    }

    /// Last computed composite state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn activate(&mut self) {
        self.active = true;
        self.update_status();
    }

    pub fn deactivate(&mut self) {
        self.active = false;
        self.update_status();
    }

    pub fn add_connection(
        &mut self,
        system_id: u32,
        connection: Box<dyn Connection>,
        required: bool,
    ) -> Result<()> {
        if self.entries.contains_key(&system_id) {
            return Err(ConvergerError::DuplicateSystem(system_id));
        }
        self.entries.insert(
            system_id,
            ConnectionEntry::new(system_id, connection, required, &self.rate_limit),
        );
        debug!(
            event = events::CONNECTION_ADDED,
            component = COMPONENT,
            system_id,
            required,
            "connection added"
        );
        self.update_status();
        Ok(())
    }

    /// Replaces the whole connection set. Every entry is rebuilt.
    pub fn set_connections<I>(&mut self, connections: I)
    where
        I: IntoIterator<Item = (u32, Box<dyn Connection>, bool)>,
    {
        self.entries = connections
            .into_iter()
            .map(|(system_id, connection, required)| {
                (
                    system_id,
                    ConnectionEntry::new(system_id, connection, required, &self.rate_limit),
                )
            })
            .collect();
        debug!(
            event = events::CONNECTION_SET_REPLACED,
            component = COMPONENT,
            connection_count = self.entries.len(),
            "connection set replaced"
        );
        self.update_status();
    }

    pub fn remove_connection(&mut self, system_id: u32) -> Result<Box<dyn Connection>> {
        let entry = self
            .entries
            .remove(&system_id)
            .ok_or(ConvergerError::UnknownSystem(system_id))?;
        debug!(
            event = events::CONNECTION_REMOVED,
            component = COMPONENT,
            system_id,
            "connection removed"
        );
        self.update_status();
        Ok(entry.into_connection())
    }

    pub fn entry(&self, system_id: u32) -> Option<&ConnectionEntry> {
        self.entries.get(&system_id)
    }

    pub fn entry_mut(&mut self, system_id: u32) -> Option<&mut ConnectionEntry> {
        self.entries.get_mut(&system_id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &ConnectionEntry> {
        self.entries.values()
    }

    pub fn connection_state(&self, system_id: u32) -> Option<ConnectionState> {
        self.entries.get(&system_id).map(ConnectionEntry::state)
    }

    /// Recomputes the composite state, then re-asserts the desired active intent.
    pub fn update_status(&mut self) {
        self.recompute_state();
        if self.reflect_active_state() {
            self.recompute_state();
        }
    }

    fn recompute_state(&mut self) {
        let current = composite_state(
            self.entries
                .values()
                .filter(|entry| entry.is_required())
                .map(ConnectionEntry::state),
        );
        if current == self.state {
            return;
        }

        let previous = std::mem::replace(&mut self.state, current);
        info!(
            event = events::CONNECTOR_STATE_CHANGED,
            component = COMPONENT,
            previous_state = %previous,
            state = %current,
            "composite connection state changed"
        );
        self.listeners
            .dispatch(|listener| listener.on_state_changed(previous, current));
    }

    /// Asks every connection not already in a matching or transitional state to
    /// connect or disconnect. Returns `true` when any request was issued.
    fn reflect_active_state(&mut self) -> bool {
        let active = self.active;
        let mut issued = false;

        for entry in self.entries.values_mut() {
            let state = entry.state();
            let wants_action = if active {
                matches!(state, ConnectionState::Disconnected | ConnectionState::Error)
            } else {
                matches!(state, ConnectionState::Connected | ConnectionState::Error)
            };
            if !wants_action {
                continue;
            }

            let system_id = entry.system_id();
            let admitted = entry.attempt(|connection| {
                if active {
                    connection.connect();
                } else {
                    connection.disconnect();
                }
            });
            if admitted {
                issued = true;
                let event = if active {
                    events::CONNECTION_CONNECT_REQUESTED
                } else {
                    events::CONNECTION_DISCONNECT_REQUESTED
                };
                debug!(
                    event,
                    component = COMPONENT,
                    system_id,
                    state = %state,
                    "connection action requested"
                );
            } else {
                debug!(
                    event = events::CONNECTION_ACTION_THROTTLED,
                    component = COMPONENT,
                    system_id,
                    state = %state,
                    "connection action throttled"
                );
            }
        }

        issued
    }
}

/// Applies the composite rule to the states of the required connections.
///
/// Any error wins, then any disconnected, disconnecting and connecting in that
/// order. No required connections at all yields `Connected`.
pub fn composite_state<I>(states: I) -> ConnectionState
where
    I: IntoIterator<Item = ConnectionState>,
{
    let mut seen = [false; 4];
    for state in states {
        match state {
            ConnectionState::Error => return ConnectionState::Error,
            ConnectionState::Disconnected => seen[0] = true,
            ConnectionState::Disconnecting => seen[1] = true,
            ConnectionState::Connecting => seen[2] = true,
            ConnectionState::Connected => {}
        }
    }

    if seen[0] {
        ConnectionState::Disconnected
    } else if seen[1] {
        ConnectionState::Disconnecting
    } else if seen[2] {
        ConnectionState::Connecting
    } else {
        ConnectionState::Connected
    }
}
