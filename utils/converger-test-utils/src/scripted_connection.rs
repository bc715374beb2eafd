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


use channel_converger::{
    filters_equal, ActionKind, ChannelAddress, ChannelFilter, Connection, ConnectionEvent,
    ConnectionState, EventQueue,
};
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;
use tracing::debug;

/// Every call the converger made on a [`ScriptedConnection`], in order.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordedRequest {
    Connect,
    Disconnect,
    Subscribe(ChannelAddress, Option<ChannelFilter>),
    Unsubscribe(ChannelAddress),
    Update(ChannelAddress, Option<ChannelFilter>),
}

#[derive(Clone, Debug)]
struct PendingRequest {
    kind: ActionKind,
    address: ChannelAddress,
    filter: Option<ChannelFilter>,
}

struct ScriptState {
    state: ConnectionState,
    auto_complete: bool,
    subscribed: BTreeMap<ChannelAddress, Option<ChannelFilter>>,
    pending: VecDeque<PendingRequest>,
    history: Vec<RecordedRequest>,
    implicit: BTreeMap<ChannelAddress, Vec<(ChannelAddress, Option<ChannelFilter>)>>,
}

/// In-memory connection whose remote side is driven by the test.
///
/// Requests stay pending until the test calls [`complete_next`](Self::complete_next)
/// or [`fail_next`](Self::fail_next), unless auto-completion is switched on. Outcomes
/// are reported through the converger's [`EventQueue`], exactly as a real
/// connection would. Clones share state, so a test keeps one handle while the
/// converger owns a boxed clone.
#[derive(Clone)]
pub struct ScriptedConnection {
    system_id: u32,
    queue: EventQueue,
    inner: Rc<RefCell<ScriptState>>,
}

impl ScriptedConnection {
    pub fn new(system_id: u32, queue: EventQueue, state: ConnectionState) -> Self {
        Self {
            system_id,
            queue,
            inner: Rc::new(RefCell::new(ScriptState {
                state,
                auto_complete: false,
                subscribed: BTreeMap::new(),
                pending: VecDeque::new(),
                history: Vec::new(),
                implicit: BTreeMap::new(),
            })),
        }
    }

    /// A connection that is already connected.
    pub fn connected(system_id: u32, queue: EventQueue) -> Self {
        Self::new(system_id, queue, ConnectionState::Connected)
    }

    pub fn boxed(&self) -> Box<dyn Connection> {
        Box::new(self.clone())
    }

    pub fn system_id(&self) -> u32 {
        self.system_id
    }

    /// When enabled, connects and requests complete as soon as they are issued.
    pub fn set_auto_complete(&self, auto_complete: bool) {
        self.inner.borrow_mut().auto_complete = auto_complete;
    }

    /// Makes the remote side subscribe `dependency` whenever `dependent` is subscribed.
    pub fn add_implicit_dependency(
        &self,
        dependent: ChannelAddress,
        dependency: ChannelAddress,
        filter: Option<ChannelFilter>,
    ) {
        self.inner
            .borrow_mut()
            .implicit
            .entry(dependent)
            .or_default()
            .push((dependency, filter));
    }

    /// Changes the state and reports it, as the session layer would.
    pub fn transition(&self, state: ConnectionState) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.state = state;
            if state != ConnectionState::Connected {
                inner.subscribed.clear();
                inner.pending.clear();
            }
        }
        match state {
            ConnectionState::Connected => self.queue.push(ConnectionEvent::Connected {
                system_id: self.system_id,
            }),
            ConnectionState::Disconnected | ConnectionState::Error => {
                self.queue.push(ConnectionEvent::Disconnected {
                    system_id: self.system_id,
                })
            }
            ConnectionState::Connecting | ConnectionState::Disconnecting => {}
        }
    }

    /// Subscribes `address` on the remote side without any request from the converger.
    pub fn mark_subscribed(&self, address: &ChannelAddress, filter: Option<ChannelFilter>) {
        self.inner
            .borrow_mut()
            .subscribed
            .insert(address.clone(), filter);
    }

    /// Settles the oldest pending request successfully.
    pub fn complete_next(&self) -> bool {
        let Some(request) = self.inner.borrow_mut().pending.pop_front() else {
            return false;
        };
        self.complete(request);
        true
    }

    /// Settles every pending request successfully. Returns how many were settled.
    pub fn complete_all(&self) -> usize {
        let mut completed = 0;
        while self.complete_next() {
            completed += 1;
        }
        completed
    }

    /// Rejects the oldest pending request.
    pub fn fail_next(&self, reason: &str) -> bool {
        let Some(request) = self.inner.borrow_mut().pending.pop_front() else {
            return false;
        };
        let reason = reason.to_string();
        let address = request.address;
        self.queue.push(match request.kind {
            ActionKind::Add => ConnectionEvent::SubscribeFailed { address, reason },
            ActionKind::Remove => ConnectionEvent::UnsubscribeFailed { address, reason },
            ActionKind::Update => ConnectionEvent::SubscriptionUpdateFailed { address, reason },
        });
        true
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.borrow().history.clone()
    }

    pub fn subscribe_requests(&self) -> Vec<ChannelAddress> {
        self.inner
            .borrow()
            .history
            .iter()
            .filter_map(|request| match request {
                RecordedRequest::Subscribe(address, _) => Some(address.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn pending_len(&self) -> usize {
        self.inner.borrow().pending.len()
    }

    pub fn subscribed_filter(&self, address: &ChannelAddress) -> Option<Option<ChannelFilter>> {
        self.inner.borrow().subscribed.get(address).cloned()
    }

    pub fn subscribed_addresses(&self) -> Vec<ChannelAddress> {
        self.inner.borrow().subscribed.keys().cloned().collect()
    }

    fn complete(&self, request: PendingRequest) {
        let PendingRequest {
            kind,
            address,
            filter,
        } = request;
        debug!(system_id = self.system_id, action = %kind, address = %address, "scripted completion");

        match kind {
            ActionKind::Add => {
                let implied = {
                    let mut inner = self.inner.borrow_mut();
                    inner.subscribed.insert(address.clone(), filter.clone());
                    let implied = inner.implicit.get(&address).cloned().unwrap_or_default();
                    for (dependency, dependency_filter) in &implied {
                        inner
                            .subscribed
                            .insert(dependency.clone(), dependency_filter.clone());
                    }
                    implied
                };
                self.queue.push(ConnectionEvent::SubscribeCompleted {
                    address: address.clone(),
                    filter,
                });
                for (dependency, dependency_filter) in implied {
                    self.queue.push(ConnectionEvent::ImplicitSubscribeCompleted {
                        address: dependency,
                        filter: dependency_filter,
                        required_by: address.clone(),
                    });
                }
            }
            ActionKind::Remove => {
                self.inner.borrow_mut().subscribed.remove(&address);
                self.queue
                    .push(ConnectionEvent::UnsubscribeCompleted { address });
            }
            ActionKind::Update => {
                self.inner
                    .borrow_mut()
                    .subscribed
                    .insert(address.clone(), filter.clone());
                self.queue
                    .push(ConnectionEvent::SubscriptionUpdateCompleted { address, filter });
            }
        }
    }

    fn enqueue(&mut self, kind: ActionKind, address: &ChannelAddress, filter: Option<&ChannelFilter>) {
        let request = PendingRequest {
            kind,
            address: address.clone(),
            filter: filter.cloned(),
        };
        let auto_complete = {
            let mut inner = self.inner.borrow_mut();
            inner.history.push(match kind {
                ActionKind::Add => RecordedRequest::Subscribe(address.clone(), filter.cloned()),
                ActionKind::Remove => RecordedRequest::Unsubscribe(address.clone()),
                ActionKind::Update => RecordedRequest::Update(address.clone(), filter.cloned()),
            });
            if !inner.auto_complete {
                inner.pending.push_back(request.clone());
            }
            inner.auto_complete
        };
        if auto_complete {
            self.complete(request);
        }
    }
}

impl Connection for ScriptedConnection {
    fn state(&self) -> ConnectionState {
        self.inner.borrow().state
    }

    fn connect(&mut self) {
        let auto_complete = {
            let mut inner = self.inner.borrow_mut();
            inner.history.push(RecordedRequest::Connect);
            inner.state = ConnectionState::Connecting;
            inner.auto_complete
        };
        if auto_complete {
            self.transition(ConnectionState::Connected);
        }
    }

    fn disconnect(&mut self) {
        let auto_complete = {
            let mut inner = self.inner.borrow_mut();
            inner.history.push(RecordedRequest::Disconnect);
            inner.state = ConnectionState::Disconnecting;
            inner.auto_complete
        };
        if auto_complete {
            self.transition(ConnectionState::Disconnected);
        }
    }

    fn is_subscribed(&self, address: &ChannelAddress) -> bool {
        self.inner.borrow().subscribed.contains_key(address)
    }

    fn index_of_pending_action(
        &self,
        kind: ActionKind,
        address: &ChannelAddress,
        filter: Option<&ChannelFilter>,
    ) -> Option<usize> {
        self.inner.borrow().pending.iter().position(|pending| {
            pending.kind == kind
                && &pending.address == address
                && (kind == ActionKind::Remove || filters_equal(pending.filter.as_ref(), filter))
        })
    }

    fn request_subscribe(&mut self, address: &ChannelAddress, filter: Option<&ChannelFilter>) {
        self.enqueue(ActionKind::Add, address, filter);
    }

    fn request_unsubscribe(&mut self, address: &ChannelAddress) {
        self.enqueue(ActionKind::Remove, address, None);
    }

    fn request_subscription_update(
        &mut self,
        address: &ChannelAddress,
        filter: Option<&ChannelFilter>,
    ) {
        self.enqueue(ActionKind::Update, address, filter);
    }
}
