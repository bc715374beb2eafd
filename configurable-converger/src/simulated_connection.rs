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


//! Connection to a pretend data system living on the local task set.
//!
//! Every request completes after the configured latency on a `spawn_local` task,
//! which reports the outcome through the converger's event queue and wakes the
//! driver loop.

use channel_converger::{
    filters_equal, ActionKind, ChannelAddress, ChannelFilter, Connection, ConnectionEvent,
    ConnectionState, EventQueue,
};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;

const COMPONENT: &str = "simulated_connection";

#[derive(Clone, Debug)]
struct InFlight {
    id: u64,
    kind: ActionKind,
    address: ChannelAddress,
    filter: Option<ChannelFilter>,
}

#[derive(Clone, Copy, Debug)]
enum Operation {
    Connect,
    Disconnect,
    Request(u64),
}

struct RemoteState {
    state: ConnectionState,
    subscribed: BTreeMap<ChannelAddress, Option<ChannelFilter>>,
    in_flight: Vec<InFlight>,
    next_id: u64,
    fail_subscribe: BTreeSet<u32>,
    connect_failures_left: u32,
    implicit: BTreeMap<ChannelAddress, Vec<(ChannelAddress, Option<ChannelFilter>)>>,
}

#[derive(Clone)]
pub(crate) struct SimulatedConnection {
    system_id: u32,
    name: Rc<str>,
    latency: Duration,
    queue: EventQueue,
    wake: Rc<Notify>,
    remote: Rc<RefCell<RemoteState>>,
}

impl SimulatedConnection {
    pub(crate) fn new(
        system_id: u32,
        name: &str,
        latency: Duration,
        queue: EventQueue,
        wake: Rc<Notify>,
    ) -> Self {
        Self {
            system_id,
            name: Rc::from(name),
            latency,
            queue,
            wake,
            remote: Rc::new(RefCell::new(RemoteState {
                state: ConnectionState::Disconnected,
                subscribed: BTreeMap::new(),
                in_flight: Vec::new(),
                next_id: 0,
                fail_subscribe: BTreeSet::new(),
                connect_failures_left: 0,
                implicit: BTreeMap::new(),
            })),
        }
    }

    pub(crate) fn fail_subscribe_to(&self, channel_ids: impl IntoIterator<Item = u32>) {
        self.remote.borrow_mut().fail_subscribe.extend(channel_ids);
    }

    pub(crate) fn fail_connect_attempts(&self, attempts: u32) {
        self.remote.borrow_mut().connect_failures_left = attempts;
    }

    pub(crate) fn add_implicit_dependency(
        &self,
        dependent: ChannelAddress,
        dependency: ChannelAddress,
        filter: Option<ChannelFilter>,
    ) {
        self.remote
            .borrow_mut()
            .implicit
            .entry(dependent)
            .or_default()
            .push((dependency, filter));
    }

    /// `true` when nothing is in flight and the connection is not mid-transition.
    pub(crate) fn is_idle(&self) -> bool {
        let remote = self.remote.borrow();
        remote.in_flight.is_empty() && !remote.state.is_transitional()
    }

    fn schedule(&self, operation: Operation) {
        let connection = self.clone();
        tokio::task::spawn_local(async move {
            tokio::time::sleep(connection.latency).await;
            connection.finish(operation);
            connection.wake.notify_one();
        });
    }

    fn finish(&self, operation: Operation) {
        match operation {
            Operation::Connect => self.finish_connect(),
            Operation::Disconnect => {
                {
                    let mut remote = self.remote.borrow_mut();
                    remote.state = ConnectionState::Disconnected;
                    remote.subscribed.clear();
                    remote.in_flight.clear();
                }
                self.queue.push(ConnectionEvent::Disconnected {
                    system_id: self.system_id,
                });
            }
            Operation::Request(id) => self.finish_request(id),
        }
    }

    fn finish_connect(&self) {
        let failed = {
            let mut remote = self.remote.borrow_mut();
            if remote.state != ConnectionState::Connecting {
                return;
            }
            if remote.connect_failures_left > 0 {
                remote.connect_failures_left -= 1;
                remote.state = ConnectionState::Error;
                true
            } else {
                remote.state = ConnectionState::Connected;
                false
            }
        };

        if failed {
            self.queue.push(ConnectionEvent::InvalidConnect {
                system_id: self.system_id,
                reason: format!("{} refused the connection", self.name),
            });
        } else {
            self.queue.push(ConnectionEvent::Connected {
                system_id: self.system_id,
            });
        }
    }

    fn finish_request(&self, id: u64) {
        let mut remote = self.remote.borrow_mut();
        let Some(position) = remote.in_flight.iter().position(|request| request.id == id) else {
            return;
        };
        let InFlight {
            kind,
            address,
            filter,
            ..
        } = remote.in_flight.remove(position);
        debug!(
            component = COMPONENT,
            system = %self.name,
            action = %kind,
            address = %address,
            "simulated request finished"
        );

        let mut events = Vec::new();
        match kind {
            ActionKind::Add if remote.fail_subscribe.contains(&address.channel_id()) => {
                events.push(ConnectionEvent::SubscribeFailed {
                    reason: format!("{} rejected channel {address}", self.name),
                    address,
                });
            }
            ActionKind::Add => {
                remote.subscribed.insert(address.clone(), filter.clone());
                let implied = remote.implicit.get(&address).cloned().unwrap_or_default();
                events.push(ConnectionEvent::SubscribeCompleted {
                    address: address.clone(),
                    filter,
                });
                for (dependency, dependency_filter) in implied {
                    remote
                        .subscribed
                        .insert(dependency.clone(), dependency_filter.clone());
                    events.push(ConnectionEvent::ImplicitSubscribeCompleted {
                        address: dependency,
                        filter: dependency_filter,
                        required_by: address.clone(),
                    });
                }
            }
            ActionKind::Remove => {
                remote.subscribed.remove(&address);
                events.push(ConnectionEvent::UnsubscribeCompleted { address });
            }
            ActionKind::Update => {
                remote.subscribed.insert(address.clone(), filter.clone());
                events.push(ConnectionEvent::SubscriptionUpdateCompleted { address, filter });
            }
        }
        drop(remote);

        for event in events {
            self.queue.push(event);
        }
    }

    fn request(&mut self, kind: ActionKind, address: &ChannelAddress, filter: Option<&ChannelFilter>) {
        let id = {
            let mut remote = self.remote.borrow_mut();
            let id = remote.next_id;
            remote.next_id += 1;
            remote.in_flight.push(InFlight {
                id,
                kind,
                address: address.clone(),
                filter: filter.cloned(),
            });
            id
        };
        self.schedule(Operation::Request(id));
    }
}

impl Connection for SimulatedConnection {
    fn state(&self) -> ConnectionState {
        self.remote.borrow().state
    }

    fn connect(&mut self) {
        self.remote.borrow_mut().state = ConnectionState::Connecting;
        self.schedule(Operation::Connect);
    }

    fn disconnect(&mut self) {
        self.remote.borrow_mut().state = ConnectionState::Disconnecting;
        self.schedule(Operation::Disconnect);
    }

    fn is_subscribed(&self, address: &ChannelAddress) -> bool {
        self.remote.borrow().subscribed.contains_key(address)
    }

    fn index_of_pending_action(
        &self,
        kind: ActionKind,
        address: &ChannelAddress,
        filter: Option<&ChannelFilter>,
    ) -> Option<usize> {
        self.remote.borrow().in_flight.iter().position(|request| {
            request.kind == kind
                && &request.address == address
                && (kind == ActionKind::Remove || filters_equal(request.filter.as_ref(), filter))
        })
    }

    fn request_subscribe(&mut self, address: &ChannelAddress, filter: Option<&ChannelFilter>) {
        self.request(ActionKind::Add, address, filter);
    }

    fn request_unsubscribe(&mut self, address: &ChannelAddress) {
        self.request(ActionKind::Remove, address, None);
    }

    fn request_subscription_update(
        &mut self,
        address: &ChannelAddress,
        filter: Option<&ChannelFilter>,
    ) {
        self.request(ActionKind::Update, address, filter);
    }
}
