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

//! In-crate connection double for unit tests.

use crate::connector::connection::{ActionKind, Connection, ConnectionState};
use crate::filter::filters_equal;
use crate::{ChannelAddress, ChannelFilter};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum FakeRequest {
    Subscribe(ChannelAddress, Option<ChannelFilter>),
    Unsubscribe(ChannelAddress),
    Update(ChannelAddress, Option<ChannelFilter>),
}

struct FakeState {
    state: ConnectionState,
    connect_calls: usize,
    disconnect_calls: usize,
    subscribed: BTreeSet<ChannelAddress>,
    pending: Vec<(ActionKind, ChannelAddress, Option<ChannelFilter>)>,
    requests: Vec<FakeRequest>,
}

/// Records requests and keeps them pending until the test settles them.
#[derive(Clone)]
pub(crate) struct FakeConnection {
    inner: Rc<RefCell<FakeState>>,
}

impl FakeConnection {
    pub(crate) fn new(state: ConnectionState) -> Self {
        Self {
            inner: Rc::new(RefCell::new(FakeState {
                state,
                connect_calls: 0,
                disconnect_calls: 0,
                subscribed: BTreeSet::new(),
                pending: Vec::new(),
                requests: Vec::new(),
            })),
        }
    }

    pub(crate) fn boxed(&self) -> Box<dyn Connection> {
        Box::new(self.clone())
    }

    pub(crate) fn set_state(&self, state: ConnectionState) {
        self.inner.borrow_mut().state = state;
    }

    pub(crate) fn connect_calls(&self) -> usize {
        self.inner.borrow().connect_calls
    }

    pub(crate) fn disconnect_calls(&self) -> usize {
        self.inner.borrow().disconnect_calls
    }

    pub(crate) fn requests(&self) -> Vec<FakeRequest> {
        self.inner.borrow().requests.clone()
    }

    pub(crate) fn is_subscribed_now(&self, address: &ChannelAddress) -> bool {
        self.inner.borrow().subscribed.contains(address)
    }

    pub(crate) fn mark_subscribed(&self, address: &ChannelAddress) {
        self.inner.borrow_mut().subscribed.insert(address.clone());
    }

    /// Forgets every pending action without applying it.
    pub(crate) fn drop_pending(&self) {
        self.inner.borrow_mut().pending.clear();
    }

    /// Drops every pending action, marking adds as subscribed and removes as not.
    pub(crate) fn settle(&self) {
        let mut inner = self.inner.borrow_mut();
        for (kind, address, _) in std::mem::take(&mut inner.pending) {
            match kind {
                ActionKind::Add => {
                    inner.subscribed.insert(address);
                }
                ActionKind::Remove => {
                    inner.subscribed.remove(&address);
                }
                ActionKind::Update => {}
            }
        }
    }
}

impl Connection for FakeConnection {
    fn state(&self) -> ConnectionState {
        self.inner.borrow().state
    }

    fn connect(&mut self) {
        let mut inner = self.inner.borrow_mut();
        inner.connect_calls += 1;
        inner.state = ConnectionState::Connecting;
    }

    fn disconnect(&mut self) {
        let mut inner = self.inner.borrow_mut();
        inner.disconnect_calls += 1;
        inner.state = ConnectionState::Disconnecting;
    }

    fn is_subscribed(&self, address: &ChannelAddress) -> bool {
        self.inner.borrow().subscribed.contains(address)
    }

    fn index_of_pending_action(
        &self,
        kind: ActionKind,
        address: &ChannelAddress,
        filter: Option<&ChannelFilter>,
    ) -> Option<usize> {
        self.inner
            .borrow()
            .pending
            .iter()
            .position(|(pending_kind, pending_address, pending_filter)| {
                *pending_kind == kind
                    && pending_address == address
                    && (kind == ActionKind::Remove
                        || filters_equal(pending_filter.as_ref(), filter))
            })
    }

    fn request_subscribe(&mut self, address: &ChannelAddress, filter: Option<&ChannelFilter>) {
        let mut inner = self.inner.borrow_mut();
        inner
            .pending
            .push((ActionKind::Add, address.clone(), filter.cloned()));
        inner
            .requests
            .push(FakeRequest::Subscribe(address.clone(), filter.cloned()));
    }

    fn request_unsubscribe(&mut self, address: &ChannelAddress) {
        let mut inner = self.inner.borrow_mut();
        inner
            .pending
            .push((ActionKind::Remove, address.clone(), None));
        inner
            .requests
            .push(FakeRequest::Unsubscribe(address.clone()));
    }

    fn request_subscription_update(
        &mut self,
        address: &ChannelAddress,
        filter: Option<&ChannelFilter>,
    ) {
        let mut inner = self.inner.borrow_mut();
        inner
            .pending
            .push((ActionKind::Update, address.clone(), filter.cloned()));
        inner
            .requests
            .push(FakeRequest::Update(address.clone(), filter.cloned()));
    }
}
