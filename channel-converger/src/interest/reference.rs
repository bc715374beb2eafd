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

//! Capability objects handed to application code.
//!
//! A reference owns one count on its target. Releasing it is idempotent; every other
//! operation on a released reference fails with
//! [`ConvergerError::ReferenceReleased`].

use crate::error::{ConvergerError, Result};
use crate::interest::graph::InterestGraph;
use crate::interest::keys::{ReferenceKey, ScopeKey, SubscriptionKey};

#[must_use = "a scope reference keeps its scope alive until released"]
#[derive(Debug)]
pub struct ScopeReference {
    reference: Option<ReferenceKey>,
    scope: ScopeKey,
}

impl ScopeReference {
    pub(crate) fn new(reference: ReferenceKey, scope: ScopeKey) -> Self {
        Self {
            reference: Some(reference),
            scope,
        }
    }

    /// Returns the referenced scope, failing once the reference is released.
    pub fn scope(&self, graph: &InterestGraph) -> Result<ScopeKey> {
        match self.reference {
            Some(reference) if graph.is_reference_live(reference) => Ok(self.scope),
            _ => Err(ConvergerError::ReferenceReleased),
        }
    }

    pub fn is_released(&self) -> bool {
        self.reference.is_none()
    }

    /// Creates another application-held reference to the same scope.
    pub fn create_reference(&self, graph: &mut InterestGraph) -> Result<ScopeReference> {
        let scope = self.scope(graph)?;
        graph.create_scope_reference(scope)
    }

    pub fn require_scope(&self, graph: &mut InterestGraph, child: &ScopeReference) -> Result<()> {
        let parent = self.scope(graph)?;
        let child = child.scope(graph)?;
        graph.require_scope(parent, child)
    }

    pub fn require_subscription(
        &self,
        graph: &mut InterestGraph,
        subscription: SubscriptionKey,
    ) -> Result<()> {
        let scope = self.scope(graph)?;
        graph.require_subscription(scope, subscription)
    }

    /// Releases this reference. Releasing the last reference destroys the scope and
    /// cascades to everything it required. A second call is a no-op.
    pub fn release(&mut self, graph: &mut InterestGraph) {
        if let Some(reference) = self.reference.take() {
            graph.release_reference(reference);
        }
    }
}

#[must_use = "a subscription reference keeps its subscription alive until released"]
#[derive(Debug)]
pub struct SubscriptionReference {
    reference: Option<ReferenceKey>,
    subscription: SubscriptionKey,
}

impl SubscriptionReference {
    pub(crate) fn new(reference: ReferenceKey, subscription: SubscriptionKey) -> Self {
        Self {
            reference: Some(reference),
            subscription,
        }
    }

    /// Returns the referenced subscription. Fails once the reference is released,
    /// including when the subscription itself was deleted underneath it.
    pub fn subscription(&self, graph: &InterestGraph) -> Result<SubscriptionKey> {
        match self.reference {
            Some(reference) if graph.is_reference_live(reference) => Ok(self.subscription),
            _ => Err(ConvergerError::ReferenceReleased),
        }
    }

    pub fn is_released(&self) -> bool {
        self.reference.is_none()
    }

    pub fn release(&mut self, graph: &mut InterestGraph) {
        if let Some(reference) = self.reference.take() {
            graph.release_reference(reference);
        }
    }
}
