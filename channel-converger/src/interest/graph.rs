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

//! Arena-backed graph of reference-counted scopes and subscriptions.

use crate::error::{ConvergerError, Result};
use crate::interest::events::{InterestEvent, InterestListener};
use crate::interest::keys::{KeyAllocator, ReferenceKey, ScopeKey, SubscriptionKey};
use crate::interest::reference::{ScopeReference, SubscriptionReference};
use crate::interest::scope::Scope;
use crate::interest::subscription::Subscription;
use crate::listener::ListenerList;
use crate::observability::{events, fields};
use crate::{ChannelAddress, ChannelFilter};
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::{debug, warn};

const COMPONENT: &str = "interest_graph";

/// Shared listener list for [`InterestEvent`]s.
pub type InterestListeners = Rc<ListenerList<dyn InterestListener>>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ReferenceHolder {
    Application,
    Scope(ScopeKey),
    Subscription(SubscriptionKey),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ReferenceTarget {
    Scope(ScopeKey),
    Subscription(SubscriptionKey),
}

#[derive(Debug)]
struct ReferenceRecord {
    holder: ReferenceHolder,
    target: ReferenceTarget,
}

/// Owner of every [`Scope`], [`Subscription`] and reference edge.
///
/// Require-edges are checked at creation time only: a node may not require itself
/// and may not require the same live target twice. Releasing a reference runs the
/// whole cascade synchronously before any listener is notified.
pub struct InterestGraph {
    keys: KeyAllocator,
    scopes: BTreeMap<ScopeKey, Scope>,
    subscriptions: BTreeMap<SubscriptionKey, Subscription>,
    subscriptions_by_address: BTreeMap<ChannelAddress, SubscriptionKey>,
    references: BTreeMap<ReferenceKey, ReferenceRecord>,
    listeners: InterestListeners,
}

impl Default for InterestGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl InterestGraph {
    pub fn new() -> Self {
        Self::with_listeners(Rc::new(ListenerList::new()))
    }

    /// Creates a graph that reports to an existing listener list.
    pub fn with_listeners(listeners: InterestListeners) -> Self {
        Self {
            keys: KeyAllocator::default(),
            scopes: BTreeMap::new(),
            subscriptions: BTreeMap::new(),
            subscriptions_by_address: BTreeMap::new(),
            references: BTreeMap::new(),
            listeners,
        }
    }

    pub fn listeners(&self) -> InterestListeners {
        self.listeners.clone()
    }

    /// Creates a scope and returns the first application-held reference to it.
    pub fn create_scope(&mut self, name: impl Into<String>) -> ScopeReference {
        let name = name.into();
        let scope = ScopeKey::new(self.keys.next_raw());
        self.scopes.insert(scope, Scope::new(name.clone()));
        let reference = self.link(ReferenceHolder::Application, ReferenceTarget::Scope(scope));

        debug!(
            event = events::SCOPE_CREATED,
            component = COMPONENT,
            scope = %scope,
            name = %name,
            "scope created"
        );
        self.emit(vec![InterestEvent::ScopeCreated { scope, name }]);

        ScopeReference::new(reference, scope)
    }

    pub fn is_scope_active(&self, scope: ScopeKey) -> bool {
        self.scopes.contains_key(&scope)
    }

    pub fn scope(&self, scope: ScopeKey) -> Result<&Scope> {
        self.scopes
            .get(&scope)
            .ok_or(ConvergerError::InactiveScope(scope))
    }

    pub fn scopes(&self) -> impl Iterator<Item = (ScopeKey, &Scope)> {
        self.scopes.iter().map(|(key, scope)| (*key, scope))
    }

    pub fn create_scope_reference(&mut self, scope: ScopeKey) -> Result<ScopeReference> {
        self.scope(scope)?;
        let reference = self.link(ReferenceHolder::Application, ReferenceTarget::Scope(scope));
        Ok(ScopeReference::new(reference, scope))
    }

    /// Makes `parent` hold a reference to `child` until `parent` is destroyed.
    pub fn require_scope(&mut self, parent: ScopeKey, child: ScopeKey) -> Result<()> {
        self.scope(parent)?;
        self.scope(child)?;
        if parent == child {
            return Err(self.rejected(ConvergerError::SelfRequirement(parent.to_string())));
        }

        self.purge_scope_references(parent);
        let target = ReferenceTarget::Scope(child);
        if self.scopes[&parent]
            .outward
            .iter()
            .any(|reference| self.targets(*reference, target))
        {
            return Err(self.rejected(ConvergerError::AlreadyRequired {
                holder: parent.to_string(),
                target: child.to_string(),
            }));
        }

        let reference = self.link(ReferenceHolder::Scope(parent), target);
        if let Some(node) = self.scopes.get_mut(&parent) {
            node.outward.push(reference);
        }
        self.scope_updated(parent, child.to_string());
        Ok(())
    }

    /// Returns the scopes `scope` still requires, dropping edges released elsewhere.
    pub fn required_scopes(&mut self, scope: ScopeKey) -> Result<Vec<ScopeKey>> {
        self.scope(scope)?;
        self.purge_scope_references(scope);
        Ok(self.scopes[&scope]
            .outward
            .iter()
            .filter_map(|reference| match self.references.get(reference) {
                Some(ReferenceRecord {
                    target: ReferenceTarget::Scope(child),
                    ..
                }) => Some(*child),
                _ => None,
            })
            .collect())
    }

    /// Makes `scope` hold a reference to `subscription` until `scope` is destroyed.
    pub fn require_subscription(
        &mut self,
        scope: ScopeKey,
        subscription: SubscriptionKey,
    ) -> Result<()> {
        self.scope(scope)?;
        self.subscription(subscription)?;

        self.purge_scope_references(scope);
        let target = ReferenceTarget::Subscription(subscription);
        if self.scopes[&scope]
            .subscription_references
            .iter()
            .any(|reference| self.targets(*reference, target))
        {
            return Err(self.rejected(ConvergerError::AlreadyRequired {
                holder: scope.to_string(),
                target: subscription.to_string(),
            }));
        }

        let reference = self.link(ReferenceHolder::Scope(scope), target);
        if let Some(node) = self.scopes.get_mut(&scope) {
            node.subscription_references.push(reference);
        }
        self.scope_updated(scope, subscription.to_string());
        Ok(())
    }

    pub fn required_subscriptions(&mut self, scope: ScopeKey) -> Result<Vec<SubscriptionKey>> {
        self.scope(scope)?;
        self.purge_scope_references(scope);
        Ok(self.scopes[&scope]
            .subscription_references
            .iter()
            .filter_map(|reference| self.subscription_target(*reference))
            .collect())
    }

    /// Records a new subscription. At most one subscription may exist per address.
    pub fn record_subscription(
        &mut self,
        address: ChannelAddress,
        filter: Option<ChannelFilter>,
        explicit: bool,
    ) -> Result<SubscriptionKey> {
        if self.subscriptions_by_address.contains_key(&address) {
            return Err(self.rejected(ConvergerError::DuplicateSubscription(address)));
        }

        let subscription = SubscriptionKey::new(self.keys.next_raw());
        self.subscriptions.insert(
            subscription,
            Subscription::new(address.clone(), filter.clone(), explicit),
        );
        self.subscriptions_by_address
            .insert(address.clone(), subscription);

        debug!(
            event = events::SUBSCRIPTION_RECORDED,
            component = COMPONENT,
            subscription = %subscription,
            address = %address,
            filter = %fields::format_filter(filter.as_ref()),
            explicit,
            "subscription recorded"
        );
        self.emit(vec![InterestEvent::SubscriptionCreated {
            subscription,
            address,
            explicit,
        }]);

        Ok(subscription)
    }

    pub fn is_subscription_active(&self, subscription: SubscriptionKey) -> bool {
        self.subscriptions.contains_key(&subscription)
    }

    pub fn subscription(&self, subscription: SubscriptionKey) -> Result<&Subscription> {
        self.subscriptions
            .get(&subscription)
            .ok_or(ConvergerError::InactiveSubscription(subscription))
    }

    pub fn find_subscription(&self, address: &ChannelAddress) -> Option<SubscriptionKey> {
        self.subscriptions_by_address.get(address).copied()
    }

    /// Live subscriptions in address order.
    pub fn subscriptions(&self) -> impl Iterator<Item = (SubscriptionKey, &Subscription)> {
        self.subscriptions_by_address
            .values()
            .filter_map(|key| self.subscriptions.get(key).map(|node| (*key, node)))
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn create_subscription_reference(
        &mut self,
        subscription: SubscriptionKey,
    ) -> Result<SubscriptionReference> {
        self.subscription(subscription)?;
        let reference = self.link(
            ReferenceHolder::Application,
            ReferenceTarget::Subscription(subscription),
        );
        self.subscription_updated(subscription);
        Ok(SubscriptionReference::new(reference, subscription))
    }

    /// Records that `dependent` cannot be established without `dependency`.
    pub fn require_subscription_dependency(
        &mut self,
        dependent: SubscriptionKey,
        dependency: SubscriptionKey,
    ) -> Result<()> {
        self.subscription(dependent)?;
        self.subscription(dependency)?;
        if dependent == dependency {
            return Err(self.rejected(ConvergerError::SelfRequirement(dependent.to_string())));
        }

        self.purge_subscription_references(dependent);
        let target = ReferenceTarget::Subscription(dependency);
        if self.subscriptions[&dependent]
            .required
            .iter()
            .any(|reference| self.targets(*reference, target))
        {
            return Err(self.rejected(ConvergerError::AlreadyRequired {
                holder: dependent.to_string(),
                target: dependency.to_string(),
            }));
        }

        let reference = self.link(ReferenceHolder::Subscription(dependent), target);
        if let Some(node) = self.subscriptions.get_mut(&dependent) {
            node.required.push(reference);
        }
        debug!(
            event = events::REQUIREMENT_ADDED,
            component = COMPONENT,
            holder = %dependent,
            target = %dependency,
            "subscription dependency added"
        );
        self.subscription_updated(dependent);
        Ok(())
    }

    /// Returns the subscriptions `subscription` still requires, dropping stale edges.
    pub fn subscription_requirements(
        &mut self,
        subscription: SubscriptionKey,
    ) -> Result<Vec<SubscriptionKey>> {
        self.subscription(subscription)?;
        self.purge_subscription_references(subscription);
        Ok(self.live_requirements(subscription))
    }

    pub(crate) fn live_requirements(&self, subscription: SubscriptionKey) -> Vec<SubscriptionKey> {
        self.subscriptions
            .get(&subscription)
            .map(|node| {
                node.required
                    .iter()
                    .filter_map(|reference| self.subscription_target(*reference))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Subscriptions held by the application or by a scope, in address order.
    pub(crate) fn held_subscriptions(&self) -> Vec<SubscriptionKey> {
        self.subscriptions()
            .filter(|(_, node)| {
                node.incoming.iter().any(|reference| {
                    matches!(
                        self.references.get(reference),
                        Some(ReferenceRecord {
                            holder: ReferenceHolder::Application | ReferenceHolder::Scope(_),
                            ..
                        })
                    )
                })
            })
            .map(|(key, _)| key)
            .collect()
    }

    pub fn update_subscription_filter(
        &mut self,
        subscription: SubscriptionKey,
        filter: Option<ChannelFilter>,
    ) -> Result<()> {
        let node = self
            .subscriptions
            .get_mut(&subscription)
            .ok_or(ConvergerError::InactiveSubscription(subscription))?;
        node.filter = filter;
        let address = node.address.clone();
        self.emit(vec![InterestEvent::SubscriptionUpdated {
            subscription,
            address,
        }]);
        Ok(())
    }

    pub fn mark_explicit(&mut self, subscription: SubscriptionKey) -> Result<()> {
        let node = self
            .subscriptions
            .get_mut(&subscription)
            .ok_or(ConvergerError::InactiveSubscription(subscription))?;
        if node.explicit {
            return Ok(());
        }
        node.explicit = true;
        let address = node.address.clone();
        self.emit(vec![InterestEvent::SubscriptionUpdated {
            subscription,
            address,
        }]);
        Ok(())
    }

    /// Drops the explicit marker. Returns `true` when that released the subscription.
    pub fn clear_explicit(&mut self, subscription: SubscriptionKey) -> Result<bool> {
        let node = self
            .subscriptions
            .get_mut(&subscription)
            .ok_or(ConvergerError::InactiveSubscription(subscription))?;
        node.explicit = false;
        let address = node.address.clone();

        if !node.is_releasable() {
            self.emit(vec![InterestEvent::SubscriptionUpdated {
                subscription,
                address,
            }]);
            return Ok(false);
        }

        let mut cascade = Vec::new();
        let mut released = Vec::new();
        self.remove_subscription(subscription, &mut cascade, &mut released);
        released.extend(self.release_cascade(cascade));
        self.emit(released);
        Ok(true)
    }

    /// Releases a subscription regardless of who still references it.
    ///
    /// Every incoming reference becomes released: holders drop the edge lazily and
    /// application references fail on next access.
    pub fn delete_subscription(&mut self, subscription: SubscriptionKey) -> Result<()> {
        let node = self
            .subscriptions
            .get_mut(&subscription)
            .ok_or(ConvergerError::InactiveSubscription(subscription))?;
        node.explicit = false;
        let incoming = std::mem::take(&mut node.incoming);
        let address = node.address.clone();
        for reference in &incoming {
            self.references.remove(reference);
        }

        debug!(
            event = events::SUBSCRIPTION_DELETED,
            component = COMPONENT,
            subscription = %subscription,
            address = %address,
            ref_count = incoming.len(),
            "subscription deleted"
        );

        let mut cascade = Vec::new();
        let mut released = Vec::new();
        self.remove_subscription(subscription, &mut cascade, &mut released);
        released.extend(self.release_cascade(cascade));
        self.emit(released);
        Ok(())
    }

    pub fn is_reference_live(&self, reference: ReferenceKey) -> bool {
        self.references.contains_key(&reference)
    }

    /// Releases one reference and everything that release makes unreachable.
    pub(crate) fn release_reference(&mut self, reference: ReferenceKey) {
        let released = self.release_cascade(vec![reference]);
        self.emit(released);
    }

    fn release_cascade(&mut self, initial: Vec<ReferenceKey>) -> Vec<InterestEvent> {
        let mut released = Vec::new();
        let mut stack = initial;

        while let Some(reference) = stack.pop() {
            let Some(record) = self.references.remove(&reference) else {
                continue;
            };

            match record.target {
                ReferenceTarget::Scope(scope) => {
                    let destroy = match self.scopes.get_mut(&scope) {
                        Some(node) => {
                            node.incoming.remove(&reference);
                            node.incoming.is_empty()
                        }
                        None => false,
                    };
                    if destroy {
                        if let Some(node) = self.scopes.remove(&scope) {
                            debug!(
                                event = events::SCOPE_RELEASED,
                                component = COMPONENT,
                                scope = %scope,
                                name = %node.name,
                                "scope released"
                            );
                            stack.extend(node.subscription_references.iter().rev().copied());
                            stack.extend(node.outward.iter().rev().copied());
                            released.push(InterestEvent::ScopeReleased {
                                scope,
                                name: node.name,
                            });
                        }
                    }
                }
                ReferenceTarget::Subscription(subscription) => {
                    let release = match self.subscriptions.get_mut(&subscription) {
                        Some(node) => {
                            node.incoming.remove(&reference);
                            node.is_releasable()
                        }
                        None => false,
                    };
                    if release {
                        self.remove_subscription(subscription, &mut stack, &mut released);
                    }
                }
            }
        }

        released
    }

    fn remove_subscription(
        &mut self,
        subscription: SubscriptionKey,
        cascade: &mut Vec<ReferenceKey>,
        released: &mut Vec<InterestEvent>,
    ) {
        let Some(node) = self.subscriptions.remove(&subscription) else {
            return;
        };
        if self.subscriptions_by_address.get(&node.address) == Some(&subscription) {
            self.subscriptions_by_address.remove(&node.address);
        }

        debug!(
            event = events::SUBSCRIPTION_RELEASED,
            component = COMPONENT,
            subscription = %subscription,
            address = %node.address,
            "subscription released"
        );
        cascade.extend(node.required.iter().rev().copied());
        released.push(InterestEvent::SubscriptionReleased {
            subscription,
            address: node.address,
        });
    }

    fn link(&mut self, holder: ReferenceHolder, target: ReferenceTarget) -> ReferenceKey {
        let reference = ReferenceKey::new(self.keys.next_raw());
        self.references
            .insert(reference, ReferenceRecord { holder, target });
        match target {
            ReferenceTarget::Scope(scope) => {
                if let Some(node) = self.scopes.get_mut(&scope) {
                    node.incoming.insert(reference);
                }
            }
            ReferenceTarget::Subscription(subscription) => {
                if let Some(node) = self.subscriptions.get_mut(&subscription) {
                    node.incoming.insert(reference);
                }
            }
        }
        reference
    }

    fn targets(&self, reference: ReferenceKey, target: ReferenceTarget) -> bool {
        self.references
            .get(&reference)
            .is_some_and(|record| record.target == target)
    }

    fn subscription_target(&self, reference: ReferenceKey) -> Option<SubscriptionKey> {
        match self.references.get(&reference) {
            Some(ReferenceRecord {
                target: ReferenceTarget::Subscription(subscription),
                ..
            }) => Some(*subscription),
            _ => None,
        }
    }

    fn purge_scope_references(&mut self, scope: ScopeKey) {
        let references = &self.references;
        if let Some(node) = self.scopes.get_mut(&scope) {
            node.outward
                .retain(|reference| references.contains_key(reference));
            node.subscription_references
                .retain(|reference| references.contains_key(reference));
        }
    }

    fn purge_subscription_references(&mut self, subscription: SubscriptionKey) {
        let references = &self.references;
        if let Some(node) = self.subscriptions.get_mut(&subscription) {
            node.required
                .retain(|reference| references.contains_key(reference));
        }
    }

    fn rejected(&self, error: ConvergerError) -> ConvergerError {
        warn!(
            event = events::REQUIREMENT_REJECTED,
            component = COMPONENT,
            err = %error,
            "interest graph operation rejected"
        );
        error
    }

    fn scope_updated(&self, scope: ScopeKey, target: String) {
        let Some(node) = self.scopes.get(&scope) else {
            return;
        };
        debug!(
            event = events::REQUIREMENT_ADDED,
            component = COMPONENT,
            holder = %scope,
            target = %target,
            "scope requirement added"
        );
        self.emit(vec![InterestEvent::ScopeUpdated {
            scope,
            name: node.name().to_string(),
        }]);
    }

    fn subscription_updated(&self, subscription: SubscriptionKey) {
        if let Some(node) = self.subscriptions.get(&subscription) {
            self.emit(vec![InterestEvent::SubscriptionUpdated {
                subscription,
                address: node.address.clone(),
            }]);
        }
    }

    fn emit(&self, interest_events: Vec<InterestEvent>) {
        for event in interest_events {
            self.listeners
                .dispatch(|listener| listener.on_interest_changed(&event));
        }
    }
}
