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

//! Observer lists with deferred mutation.
//!
//! Listeners may add or remove listeners (including themselves) while a dispatch is
//! running. Such changes are queued and applied once the outermost dispatch returns,
//! so every dispatch delivers to exactly the listeners registered when it started.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

enum PendingChange<L: ?Sized> {
    Add(Rc<L>),
    Remove(Rc<L>),
}

/// Single-threaded fan-out list of shared listeners.
pub struct ListenerList<L: ?Sized> {
    listeners: RefCell<Vec<Rc<L>>>,
    pending: RefCell<Vec<PendingChange<L>>>,
    dispatch_depth: Cell<usize>,
}

impl<L: ?Sized> Default for ListenerList<L> {
    fn default() -> Self {
        Self {
            listeners: RefCell::new(Vec::new()),
            pending: RefCell::new(Vec::new()),
            dispatch_depth: Cell::new(0),
        }
    }
}

impl<L: ?Sized> ListenerList<L> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener. Registering the same `Rc` twice is a no-op.
    pub fn add(&self, listener: Rc<L>) {
        if self.is_dispatching() {
            self.pending.borrow_mut().push(PendingChange::Add(listener));
        } else {
            self.apply(PendingChange::Add(listener));
        }
    }

    /// Unregisters a listener by pointer identity.
    pub fn remove(&self, listener: &Rc<L>) {
        if self.is_dispatching() {
            self.pending
                .borrow_mut()
                .push(PendingChange::Remove(listener.clone()));
        } else {
            self.apply(PendingChange::Remove(listener.clone()));
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.borrow().is_empty()
    }

    pub fn is_dispatching(&self) -> bool {
        self.dispatch_depth.get() > 0
    }

    /// Invokes `notify` for every listener registered when the dispatch started.
    pub fn dispatch(&self, mut notify: impl FnMut(&L)) {
        self.dispatch_depth.set(self.dispatch_depth.get() + 1);
        let snapshot: Vec<Rc<L>> = self.listeners.borrow().clone();
        for listener in &snapshot {
            notify(&**listener);
        }
        self.dispatch_depth.set(self.dispatch_depth.get() - 1);

        if !self.is_dispatching() {
            let pending: Vec<PendingChange<L>> = self.pending.borrow_mut().drain(..).collect();
            for change in pending {
                self.apply(change);
            }
        }
    }

    fn apply(&self, change: PendingChange<L>) {
        let mut listeners = self.listeners.borrow_mut();
        match change {
            PendingChange::Add(listener) => {
                if !listeners.iter().any(|existing| Rc::ptr_eq(existing, &listener)) {
                    listeners.push(listener);
                }
            }
            PendingChange::Remove(listener) => {
                listeners.retain(|existing| !Rc::ptr_eq(existing, &listener));
            }
        }
    }
}
