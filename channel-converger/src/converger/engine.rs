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

//! The reconciliation engine.

use crate::config::ConvergerConfig;
use crate::connector::connection::{ActionKind, Connection, ConnectionState};
use crate::connector::connector_system::{ConnectorListeners, ConnectorSystem};
use crate::converger::converge_action::{can_group, Admission, ConvergeAction, GroupCandidate};
use crate::converger::event_queue::{ConnectionEvent, EventQueue};
use crate::converger::invalidator::ConvergeInvalidator;
use crate::converger::plan::{ConvergePlan, ConvergeTarget};
use crate::error::{ConvergerError, Result};
use crate::filter::filters_equal;
use crate::interest::area_of_interest::{AreaOfInterestService, AreaOfInterestStatus};
use crate::interest::graph::{InterestGraph, InterestListeners};
use crate::interest::keys::{AreaOfInterestKey, SubscriptionKey};
use crate::listener::ListenerList;
use crate::observability::{events, fields};
use crate::{ChannelAddress, ChannelFilter};
use serde::Serialize;
use std::collections::BTreeSet;
use std::rc::Rc;
use tracing::{debug, info, warn};

const COMPONENT: &str = "converger";

/// Callback run at the start of every pass, before targets are computed.
pub type PreConvergeAction = Box<dyn FnMut(&mut AreaOfInterestService, &mut InterestGraph)>;

/// Counters describing what the converger has done so far.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ConvergerStats {
    pub passes: u64,
    pub adds_submitted: u64,
    pub updates_submitted: u64,
    pub removes_submitted: u64,
    pub throttled: u64,
    pub remote_failures: u64,
    pub orphans_dropped: u64,
}

/// The rate-limited action admitted by the most recent pass that acted.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OutstandingAction {
    pub kind: ActionKind,
    pub address: ChannelAddress,
}

/// Reconciles desired interest with established subscriptions.
///
/// The converger owns the interest graph, the area-of-interest service and the
/// connector system. Every mutation of those re-arms convergence through a
/// listener. A pass submits at most one rate-limited request, plus any requests
/// grouped behind it, then returns. Completions come back through the
/// [`EventQueue`] and are applied by [`process_events`](Self::process_events).
pub struct Converger {
    config: ConvergerConfig,
    graph: InterestGraph,
    areas: AreaOfInterestService,
    connector: ConnectorSystem,
    events: EventQueue,
    invalidator: Rc<ConvergeInvalidator>,
    active: bool,
    pause_depth: usize,
    converge_complete: bool,
    throttled: bool,
    plan: Option<ConvergePlan>,
    outstanding: Option<OutstandingAction>,
    pre_converge_action: Option<PreConvergeAction>,
    stats: ConvergerStats,
}

impl Converger {
    pub fn new(config: ConvergerConfig) -> Self {
        let interest_listeners: InterestListeners = Rc::new(ListenerList::new());
        let connector_listeners: ConnectorListeners = Rc::new(ListenerList::new());
        let invalidator = Rc::new(ConvergeInvalidator::default());
        interest_listeners.add(invalidator.clone());
        connector_listeners.add(invalidator.clone());

        Self {
            graph: InterestGraph::with_listeners(interest_listeners.clone()),
            areas: AreaOfInterestService::with_listeners(interest_listeners),
            connector: ConnectorSystem::with_listeners(config.rate_limit, connector_listeners),
            config,
            events: EventQueue::new(),
            invalidator,
            active: false,
            pause_depth: 0,
            converge_complete: false,
            throttled: false,
            plan: None,
            outstanding: None,
            pre_converge_action: None,
            stats: ConvergerStats::default(),
        }
    }

    pub fn config(&self) -> &ConvergerConfig {
        &self.config
    }

    pub fn graph(&self) -> &InterestGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut InterestGraph {
        &mut self.graph
    }

    pub fn areas(&self) -> &AreaOfInterestService {
        &self.areas
    }

    pub fn areas_mut(&mut self) -> &mut AreaOfInterestService {
        &mut self.areas
    }

    pub fn connector(&self) -> &ConnectorSystem {
        &self.connector
    }

    pub fn connector_mut(&mut self) -> &mut ConnectorSystem {
        &mut self.connector
    }

    /// Queue that connections report completions into.
    pub fn event_queue(&self) -> EventQueue {
        self.events.clone()
    }

    /// Listener list shared by the interest graph and the area-of-interest service.
    pub fn interest_listeners(&self) -> InterestListeners {
        self.graph.listeners()
    }

    pub fn connector_listeners(&self) -> ConnectorListeners {
        self.connector.listeners()
    }

    pub fn stats(&self) -> ConvergerStats {
        self.stats
    }

    pub fn outstanding_action(&self) -> Option<&OutstandingAction> {
        self.outstanding.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_paused(&self) -> bool {
        self.pause_depth > 0
    }

    pub fn is_converge_complete(&self) -> bool {
        self.converge_complete && !self.invalidator.is_incomplete()
    }

    pub fn mark_converge_incomplete(&mut self) {
        self.converge_complete = false;
    }

    /// Starts converging and asks every connection to connect.
    pub fn activate(&mut self) {
        info!(event = events::CONVERGER_ACTIVATED, component = COMPONENT, "converger activated");
        self.active = true;
        self.converge_complete = false;
        self.connector.activate();
        self.process_events();
    }

    /// Stops converging and asks every connection to disconnect.
    pub fn deactivate(&mut self) {
        info!(event = events::CONVERGER_DEACTIVATED, component = COMPONENT, "converger deactivated");
        self.active = false;
        self.outstanding = None;
        self.plan = None;
        self.connector.deactivate();
    }

    /// Suspends convergence until the matching [`resume`](Self::resume). Pauses nest.
    pub fn pause(&mut self) {
        self.pause_depth += 1;
    }

    /// Ends one pause. Leaving the outermost pause runs convergence immediately.
    pub fn resume(&mut self) {
        self.pause_depth = self.pause_depth.saturating_sub(1);
        if self.pause_depth == 0 {
            self.process_events();
        }
    }

    /// Runs `action` with convergence paused, then resumes, so that several
    /// desired-state edits are reconciled in one pass.
    pub fn pause_and_run<F, R>(&mut self, action: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        self.pause();
        let result = action(self);
        self.resume();
        result
    }

    pub fn set_pre_converge_action<F>(&mut self, action: F)
    where
        F: FnMut(&mut AreaOfInterestService, &mut InterestGraph) + 'static,
    {
        self.pre_converge_action = Some(Box::new(action));
        self.converge_complete = false;
    }

    pub fn clear_pre_converge_action(&mut self) {
        self.pre_converge_action = None;
    }

    /// Applies queued connection events and runs convergence until it settles.
    ///
    /// Connections that complete synchronously keep refilling the queue. The loop is
    /// bounded by `max_passes_per_drain` and stops early when a pass is throttled.
    /// Returns the number of passes run.
    pub fn process_events(&mut self) -> usize {
        let mut passes = 0;
        loop {
            while let Some(event) = self.events.pop() {
                self.apply_event(event);
            }
            if !self.converge_step() {
                break;
            }
            passes += 1;
            if self.throttled {
                break;
            }
            if passes >= self.config.max_passes_per_drain {
                warn!(
                    event = events::CONVERGE_PASS_LIMIT_REACHED,
                    component = COMPONENT,
                    passes,
                    queued = self.events.len(),
                    "convergence pass limit reached"
                );
                break;
            }
        }
        passes
    }

    /// Re-checks connection states and retries throttled work.
    pub fn tick(&mut self) -> usize {
        self.connector.update_status();
        self.process_events()
    }

    /// Runs one convergence pass if one is due. Returns `true` when a pass ran.
    pub fn converge_step(&mut self) -> bool {
        self.absorb_invalidations();
        if !self.active || self.is_paused() || self.converge_complete {
            return false;
        }
        if self.connector.state() != ConnectionState::Connected {
            debug!(
                event = events::CONVERGE_PASS_SKIPPED,
                component = COMPONENT,
                state = %self.connector.state(),
                reason = fields::REASON_NOT_CONNECTED,
                "convergence pass skipped"
            );
            return false;
        }

        if let Some(action) = self.pre_converge_action.as_mut() {
            action(&mut self.areas, &mut self.graph);
        }
        self.absorb_invalidations();

        let plan = match self.plan.take() {
            Some(plan) => plan,
            None => ConvergePlan::build(&self.graph, &self.areas),
        };
        self.throttled = false;
        self.stats.passes += 1;

        let acted = self.converge_targets(&plan.targets);
        if !acted {
            self.remove_orphan_subscriptions(&plan.expected);
        }
        self.plan = Some(plan);

        if self.throttled {
            self.stats.throttled += 1;
        } else {
            self.converge_complete = true;
        }
        debug!(
            event = events::CONVERGE_PASS_COMPLETE,
            component = COMPONENT,
            acted,
            throttled = self.throttled,
            "convergence pass finished"
        );
        true
    }

    /// Converges one area of interest.
    ///
    /// `group` is the request already admitted in the current pass, if any. Calling
    /// this with a disposed area is a programming error.
    pub fn converge_area_of_interest(
        &mut self,
        area_of_interest: AreaOfInterestKey,
        group: Option<&GroupCandidate>,
    ) -> Result<ConvergeAction> {
        self.converge_area(area_of_interest, group)
            .map(|(action, _)| action)
    }

    fn converge_targets(&mut self, targets: &[ConvergeTarget]) -> bool {
        let mut group: Option<GroupCandidate> = None;

        for target in targets {
            let (action, admitted) = match *target {
                ConvergeTarget::AreaOfInterest(key) => self
                    .converge_area(key, group.as_ref())
                    .unwrap_or((ConvergeAction::NoAction, None)),
                ConvergeTarget::Subscription(key) => self.converge_subscription(key, group.as_ref()),
            };

            match action {
                ConvergeAction::Terminate => break,
                ConvergeAction::SubmittedAdd | ConvergeAction::SubmittedUpdate => {
                    if group.is_none() {
                        group = admitted;
                    }
                }
                ConvergeAction::InProgress => {
                    if group.is_none() {
                        return true;
                    }
                }
                ConvergeAction::NoAction => {}
            }
        }

        group.is_some()
    }

    fn converge_area(
        &mut self,
        key: AreaOfInterestKey,
        group: Option<&GroupCandidate>,
    ) -> Result<(ConvergeAction, Option<GroupCandidate>)> {
        let area = self.areas.area_of_interest(key).map_err(|err| {
            warn!(
                event = events::CONVERGE_TARGET_REJECTED,
                component = COMPONENT,
                area_of_interest = %key,
                err = %err,
                "cannot converge a disposed area of interest"
            );
            err
        })?;
        if area.status().is_failed() {
            return Ok((ConvergeAction::NoAction, None));
        }
        let address = area.address().clone();
        let filter = area.filter().cloned();

        Ok(self.converge_address(&address, filter.as_ref(), Some(key), group))
    }

    fn converge_subscription(
        &mut self,
        key: SubscriptionKey,
        group: Option<&GroupCandidate>,
    ) -> (ConvergeAction, Option<GroupCandidate>) {
        let Ok(subscription) = self.graph.subscription(key) else {
            return (ConvergeAction::NoAction, None);
        };
        let address = subscription.address().clone();
        let filter = subscription.filter().cloned();

        self.converge_address(&address, filter.as_ref(), None, group)
    }

    fn converge_address(
        &mut self,
        address: &ChannelAddress,
        filter: Option<&ChannelFilter>,
        area_of_interest: Option<AreaOfInterestKey>,
        group: Option<&GroupCandidate>,
    ) -> (ConvergeAction, Option<GroupCandidate>) {
        let system_id = address.system_id();
        let Some(entry) = self.connector.entry(system_id) else {
            debug!(
                event = events::CONVERGE_TARGET_SKIPPED,
                component = COMPONENT,
                address = %address,
                reason = fields::REASON_UNKNOWN_SYSTEM,
                "convergence target skipped"
            );
            return (ConvergeAction::NoAction, None);
        };
        if entry.state() != ConnectionState::Connected {
            debug!(
                event = events::CONVERGE_TARGET_SKIPPED,
                component = COMPONENT,
                address = %address,
                state = %entry.state(),
                reason = fields::REASON_NOT_CONNECTED,
                "convergence target skipped"
            );
            return (ConvergeAction::NoAction, None);
        }

        let connection = entry.connection();
        let subscribed = connection.is_subscribed(address);
        let pending_add = connection.index_of_pending_action(ActionKind::Add, address, filter);
        let pending_remove = connection.index_of_pending_action(ActionKind::Remove, address, None);
        let pending_update = connection.index_of_pending_action(ActionKind::Update, address, filter);

        if (!subscribed && pending_add.is_none()) || pending_remove > pending_add {
            let candidate = GroupCandidate::new(ActionKind::Add, address.clone(), filter.cloned());
            return self.submit_target(candidate, area_of_interest, group);
        }
        if pending_add.is_some() || pending_update.is_some() {
            return (ConvergeAction::InProgress, None);
        }
        let Some(area_of_interest) = area_of_interest else {
            return (ConvergeAction::NoAction, None);
        };

        let established = self
            .graph
            .find_subscription(address)
            .and_then(|subscription| self.graph.subscription(subscription).ok());
        let converged = established
            .is_some_and(|subscription| filters_equal(subscription.filter(), filter));
        if !converged {
            let candidate = GroupCandidate::new(ActionKind::Update, address.clone(), filter.cloned());
            return self.submit_target(candidate, Some(area_of_interest), group);
        }

        let status = match self.areas.area_of_interest(area_of_interest).map(|area| area.status()) {
            Ok(AreaOfInterestStatus::Updating | AreaOfInterestStatus::Updated) => {
                AreaOfInterestStatus::Updated
            }
            _ => AreaOfInterestStatus::Loaded,
        };
        self.areas.set_status(area_of_interest, status, None);
        (ConvergeAction::NoAction, None)
    }

    fn submit_target(
        &mut self,
        candidate: GroupCandidate,
        area_of_interest: Option<AreaOfInterestKey>,
        group: Option<&GroupCandidate>,
    ) -> (ConvergeAction, Option<GroupCandidate>) {
        let admission = match group {
            None => Admission::RateLimited,
            Some(group) if can_group(group, &candidate) => Admission::Immediate,
            Some(_) => return (ConvergeAction::Terminate, None),
        };
        if !self.submit(&candidate, admission) {
            return (ConvergeAction::InProgress, None);
        }

        let (action, status) = match candidate.kind {
            ActionKind::Update => {
                self.stats.updates_submitted += 1;
                (ConvergeAction::SubmittedUpdate, AreaOfInterestStatus::Updating)
            }
            _ => {
                self.stats.adds_submitted += 1;
                (ConvergeAction::SubmittedAdd, AreaOfInterestStatus::Loading)
            }
        };
        if let Some(area_of_interest) = area_of_interest {
            self.areas.set_status(area_of_interest, status, None);
        }
        (action, Some(candidate))
    }

    /// Hands one request to its connection. Returns `false` when throttled.
    fn submit(&mut self, candidate: &GroupCandidate, admission: Admission) -> bool {
        let system_id = candidate.address.system_id();
        let Some(entry) = self.connector.entry_mut(system_id) else {
            return false;
        };

        let request = |connection: &mut dyn Connection| match candidate.kind {
            ActionKind::Add => {
                connection.request_subscribe(&candidate.address, candidate.filter.as_ref())
            }
            ActionKind::Remove => connection.request_unsubscribe(&candidate.address),
            ActionKind::Update => connection
                .request_subscription_update(&candidate.address, candidate.filter.as_ref()),
        };
        let admitted = match admission {
            Admission::RateLimited => entry.attempt(request),
            Admission::Immediate => {
                request(entry.connection_mut());
                true
            }
        };

        if !admitted {
            self.throttled = true;
            debug!(
                event = events::CONVERGE_ACTION_THROTTLED,
                component = COMPONENT,
                action = %candidate.kind,
                address = %candidate.address,
                "convergence action throttled"
            );
            return false;
        }

        if admission == Admission::RateLimited {
            self.outstanding = Some(OutstandingAction {
                kind: candidate.kind,
                address: candidate.address.clone(),
            });
        }
        info!(
            event = events::CONVERGE_ACTION_SUBMITTED,
            component = COMPONENT,
            action = %candidate.kind,
            address = %candidate.address,
            filter = %fields::format_filter(candidate.filter.as_ref()),
            grouped = admission == Admission::Immediate,
            "convergence action submitted"
        );
        true
    }

    /// Unsubscribes explicit subscriptions that are no longer desired.
    ///
    /// Orphans the connection does not report as subscribed, and that have no add
    /// pending, are dropped locally instead. Implicit subscriptions are never
    /// removed here; they go away with whatever required them.
    fn remove_orphan_subscriptions(&mut self, expected: &BTreeSet<ChannelAddress>) {
        let orphans: Vec<(SubscriptionKey, ChannelAddress, Option<ChannelFilter>)> = self
            .graph
            .subscriptions()
            .filter(|(_, subscription)| {
                subscription.is_explicit() && !expected.contains(subscription.address())
            })
            .map(|(key, subscription)| {
                (
                    key,
                    subscription.address().clone(),
                    subscription.filter().cloned(),
                )
            })
            .collect();

        let mut group: Option<GroupCandidate> = None;
        for (key, address, filter) in orphans {
            let Some(entry) = self.connector.entry(address.system_id()) else {
                continue;
            };
            if entry.state() != ConnectionState::Connected {
                continue;
            }
            let connection = entry.connection();
            if connection.is_action_pending(ActionKind::Remove, &address, None) {
                continue;
            }
            if !connection.is_subscribed(&address)
                && !connection.is_action_pending(ActionKind::Add, &address, filter.as_ref())
            {
                debug!(
                    event = events::CONVERGE_ORPHAN_DROPPED,
                    component = COMPONENT,
                    address = %address,
                    "unsubscribed orphan dropped locally"
                );
                if self.graph.clear_explicit(key).is_ok() {
                    self.stats.orphans_dropped += 1;
                }
                continue;
            }

            let candidate = GroupCandidate::new(ActionKind::Remove, address, None);
            let admission = match &group {
                None => Admission::RateLimited,
                Some(group) if can_group(group, &candidate) => Admission::Immediate,
                Some(_) => break,
            };
            if !self.submit(&candidate, admission) {
                break;
            }
            self.stats.removes_submitted += 1;
            if group.is_none() {
                group = Some(candidate);
            }
        }
    }

    fn absorb_invalidations(&mut self) {
        if self.invalidator.take_targets_stale() {
            self.plan = None;
        }
        if self.invalidator.take_incomplete() {
            self.converge_complete = false;
        }
    }

    fn apply_event(&mut self, event: ConnectionEvent) {
        debug!(
            event = events::CONNECTION_EVENT_RECEIVED,
            component = COMPONENT,
            system_id = event.system_id(),
            connection_event = event.name(),
            "connection event received"
        );
        self.converge_complete = false;

        match event {
            ConnectionEvent::Connected { .. } => self.connector.update_status(),
            ConnectionEvent::Disconnected { system_id } => {
                if self
                    .outstanding
                    .as_ref()
                    .is_some_and(|action| action.address.system_id() == system_id)
                {
                    self.outstanding = None;
                }
                self.connector.update_status();
            }
            ConnectionEvent::InvalidConnect { system_id, reason }
            | ConnectionEvent::InvalidDisconnect { system_id, reason } => {
                warn!(
                    event = events::CONNECTION_INVALID_TRANSITION,
                    component = COMPONENT,
                    system_id,
                    reason = %reason,
                    "connection rejected a state transition"
                );
                self.connector.update_status();
            }
            ConnectionEvent::SubscribeCompleted { address, filter } => {
                self.clear_outstanding(ActionKind::Add, &address);
                self.record_established(&address, filter, true);
                self.set_area_status(&address, AreaOfInterestStatus::Loaded, None);
            }
            ConnectionEvent::ImplicitSubscribeCompleted {
                address,
                filter,
                required_by,
            } => self.record_implicit(address, filter, &required_by),
            ConnectionEvent::SubscribeFailed { address, reason } => {
                self.clear_outstanding(ActionKind::Add, &address);
                self.remote_failure(&address, ActionKind::Add, reason);
            }
            ConnectionEvent::UnsubscribeCompleted { address } => {
                self.clear_outstanding(ActionKind::Remove, &address);
                if let Some(subscription) = self.graph.find_subscription(&address) {
                    if let Err(err) = self.graph.clear_explicit(subscription) {
                        self.log_ignored(&address, &err);
                    }
                }
                self.set_area_status(&address, AreaOfInterestStatus::Unloaded, None);
            }
            ConnectionEvent::UnsubscribeFailed { address, reason } => {
                self.clear_outstanding(ActionKind::Remove, &address);
                self.stats.remote_failures += 1;
                warn!(
                    event = events::REMOTE_ACTION_FAILED,
                    component = COMPONENT,
                    action = %ActionKind::Remove,
                    address = %address,
                    reason = %reason,
                    "unsubscribe failed, retrying on a later pass"
                );
            }
            ConnectionEvent::SubscriptionUpdateCompleted { address, filter } => {
                self.clear_outstanding(ActionKind::Update, &address);
                self.record_established(&address, filter, false);
                self.set_area_status(&address, AreaOfInterestStatus::Updated, None);
            }
            ConnectionEvent::SubscriptionUpdateFailed { address, reason } => {
                self.clear_outstanding(ActionKind::Update, &address);
                self.remote_failure(&address, ActionKind::Update, reason);
            }
        }
    }

    /// Records the filter the remote side confirmed for `address`.
    fn record_established(
        &mut self,
        address: &ChannelAddress,
        filter: Option<ChannelFilter>,
        explicit: bool,
    ) {
        let result = match self.graph.find_subscription(address) {
            Some(subscription) => {
                let marked = if explicit {
                    self.graph.mark_explicit(subscription)
                } else {
                    Ok(())
                };
                let changed = self
                    .graph
                    .subscription(subscription)
                    .map(|node| !filters_equal(node.filter(), filter.as_ref()))
                    .unwrap_or(false);
                marked.and_then(|_| {
                    if changed {
                        self.graph.update_subscription_filter(subscription, filter)
                    } else {
                        Ok(())
                    }
                })
            }
            None => self
                .graph
                .record_subscription(address.clone(), filter, true)
                .map(|_| ()),
        };
        if let Err(err) = result {
            self.log_ignored(address, &err);
        }
    }

    fn record_implicit(
        &mut self,
        address: ChannelAddress,
        filter: Option<ChannelFilter>,
        required_by: &ChannelAddress,
    ) {
        let Some(dependent) = self.graph.find_subscription(required_by) else {
            warn!(
                event = events::CONNECTION_EVENT_IGNORED,
                component = COMPONENT,
                address = %address,
                reason = fields::REASON_UNKNOWN_DEPENDENT,
                required_by = %required_by,
                "implicit subscription for an unknown dependent ignored"
            );
            return;
        };

        let dependency = match self.graph.find_subscription(&address) {
            Some(existing) => Ok(existing),
            None => self.graph.record_subscription(address.clone(), filter, false),
        };
        let linked = dependency.and_then(|dependency| {
            match self.graph.require_subscription_dependency(dependent, dependency) {
                Err(ConvergerError::AlreadyRequired { .. }) => Ok(()),
                other => other,
            }
        });
        if let Err(err) = linked {
            self.log_ignored(&address, &err);
        }
    }

    /// Marks the area failed and forgets the subscription.
    ///
    /// A failed filter update leaves the remote subscription in place, so while the
    /// connection still reports it the record is kept with its last confirmed
    /// filter. Orphan removal then unsubscribes it once the area goes away.
    fn remote_failure(&mut self, address: &ChannelAddress, kind: ActionKind, reason: String) {
        self.stats.remote_failures += 1;
        let still_subscribed = kind == ActionKind::Update
            && self
                .connector
                .entry(address.system_id())
                .is_some_and(|entry| entry.connection().is_subscribed(address));
        warn!(
            event = events::REMOTE_ACTION_FAILED,
            component = COMPONENT,
            action = %kind,
            address = %address,
            reason = %reason,
            still_subscribed,
            "remote action failed"
        );
        if let Some(subscription) = self.graph.find_subscription(address) {
            let result = if still_subscribed {
                self.graph.mark_explicit(subscription)
            } else {
                self.graph.delete_subscription(subscription)
            };
            if let Err(err) = result {
                self.log_ignored(address, &err);
            }
        }
        let status = match kind {
            ActionKind::Update => AreaOfInterestStatus::UpdateFailed,
            _ => AreaOfInterestStatus::LoadFailed,
        };
        self.set_area_status(address, status, Some(reason));
    }

    fn set_area_status(
        &mut self,
        address: &ChannelAddress,
        status: AreaOfInterestStatus,
        error: Option<String>,
    ) {
        if let Some(area_of_interest) = self.areas.find_area_of_interest(address) {
            self.areas.set_status(area_of_interest, status, error);
        }
    }

    fn clear_outstanding(&mut self, kind: ActionKind, address: &ChannelAddress) {
        if self
            .outstanding
            .as_ref()
            .is_some_and(|action| action.kind == kind && &action.address == address)
        {
            self.outstanding = None;
        }
    }

    fn log_ignored(&self, address: &ChannelAddress, err: &ConvergerError) {
        warn!(
            event = events::CONNECTION_EVENT_IGNORED,
            component = COMPONENT,
            address = %address,
            err = %err,
            "connection event could not be applied"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{Converger, OutstandingAction};
    use crate::config::{ConvergerConfig, RateLimitConfig};
    use crate::connector::connection::{ActionKind, ConnectionState};
    use crate::converger::converge_action::ConvergeAction;
    use crate::converger::event_queue::ConnectionEvent;
    use crate::error::ConvergerError;
    use crate::interest::area_of_interest::AreaOfInterestStatus;
    use crate::testing::{FakeConnection, FakeRequest};
    use crate::{ChannelAddress, ChannelFilter};

    fn converger_with(rate_limit: RateLimitConfig, state: ConnectionState) -> (Converger, FakeConnection) {
        let mut converger = Converger::new(ConvergerConfig {
            rate_limit,
            ..ConvergerConfig::default()
        });
        converger.activate();
        let connection = FakeConnection::new(state);
        converger
            .connector_mut()
            .add_connection(1, connection.boxed(), true)
            .unwrap();
        (converger, connection)
    }

    fn connected() -> (Converger, FakeConnection) {
        converger_with(RateLimitConfig::unlimited(), ConnectionState::Connected)
    }

    fn complete_adds(converger: &mut Converger, connection: &FakeConnection) {
        let queue = converger.event_queue();
        for request in connection.requests() {
            if let FakeRequest::Subscribe(address, filter) = request {
                if !connection.is_subscribed_now(&address) {
                    queue.push(ConnectionEvent::SubscribeCompleted { address, filter });
                }
            }
        }
        connection.settle();
        converger.process_events();
    }

    #[test]
    fn new_area_of_interest_submits_one_subscribe() {
        let (mut converger, connection) = connected();
        let address = ChannelAddress::new(1, 5);
        let area = converger
            .areas_mut()
            .create_or_update_area_of_interest(address.clone(), None);

        let action = converger.converge_area_of_interest(area, None).unwrap();

        assert_eq!(action, ConvergeAction::SubmittedAdd);
        assert_eq!(connection.requests(), vec![FakeRequest::Subscribe(address, None)]);
        assert_eq!(
            converger.areas().area_of_interest(area).unwrap().status(),
            AreaOfInterestStatus::Loading
        );
    }

    #[test]
    fn changed_filter_submits_one_update() {
        let (mut converger, connection) = connected();
        let address = ChannelAddress::new(1, 5);
        connection.mark_subscribed(&address);
        converger
            .graph_mut()
            .record_subscription(address.clone(), Some(ChannelFilter::from("OldFilter")), true)
            .unwrap();
        let area = converger
            .areas_mut()
            .create_or_update_area_of_interest(address.clone(), Some(ChannelFilter::from("Filter1")));

        let action = converger.converge_area_of_interest(area, None).unwrap();

        assert_eq!(action, ConvergeAction::SubmittedUpdate);
        assert_eq!(
            connection.requests(),
            vec![FakeRequest::Update(address, Some(ChannelFilter::from("Filter1")))]
        );
    }

    #[test]
    fn disposed_area_of_interest_is_rejected_without_requests() {
        let (mut converger, connection) = connected();
        let area = converger
            .areas_mut()
            .create_or_update_area_of_interest(ChannelAddress::new(1, 5), None);
        converger.areas_mut().dispose_area_of_interest(area).unwrap();

        assert_eq!(
            converger.converge_area_of_interest(area, None),
            Err(ConvergerError::DisposedAreaOfInterest(area))
        );
        assert!(connection.requests().is_empty());
    }

    #[test]
    fn dependency_is_requested_before_its_dependent() {
        let (mut converger, connection) = connected();
        let dependency = ChannelAddress::new(1, 1);
        let dependent = ChannelAddress::new(1, 2);
        connection.mark_subscribed(&dependent);
        let graph = converger.graph_mut();
        let dependent_key = graph.record_subscription(dependent.clone(), None, true).unwrap();
        let dependency_key = graph.record_subscription(dependency.clone(), None, false).unwrap();
        graph
            .require_subscription_dependency(dependent_key, dependency_key)
            .unwrap();
        converger
            .areas_mut()
            .create_or_update_area_of_interest(dependent, None);

        converger.process_events();

        assert_eq!(
            connection.requests(),
            vec![FakeRequest::Subscribe(dependency.clone(), None)]
        );
        assert_eq!(
            converger.outstanding_action(),
            Some(&OutstandingAction {
                kind: ActionKind::Add,
                address: dependency,
            })
        );
    }

    #[test]
    fn unsubscribed_dependent_waits_for_its_dependency_to_complete() {
        let (mut converger, connection) = connected();
        let dependency = ChannelAddress::new(1, 1);
        let dependent = ChannelAddress::new(1, 2);
        let graph = converger.graph_mut();
        let dependent_key = graph.record_subscription(dependent.clone(), None, true).unwrap();
        let dependency_key = graph.record_subscription(dependency.clone(), None, false).unwrap();
        graph
            .require_subscription_dependency(dependent_key, dependency_key)
            .unwrap();
        converger
            .areas_mut()
            .create_or_update_area_of_interest(dependent.clone(), None);

        converger.process_events();
        converger.process_events();

        assert_eq!(
            connection.requests(),
            vec![FakeRequest::Subscribe(dependency.clone(), None)]
        );
        assert!(!connection.is_subscribed_now(&dependent));

        complete_adds(&mut converger, &connection);

        assert_eq!(
            connection.requests(),
            vec![
                FakeRequest::Subscribe(dependency, None),
                FakeRequest::Subscribe(dependent.clone(), None),
            ]
        );
        assert_eq!(
            converger.outstanding_action(),
            Some(&OutstandingAction {
                kind: ActionKind::Add,
                address: dependent,
            })
        );
    }

    #[test]
    fn requiring_a_subscription_after_a_settled_pass_reconverges() {
        let (mut converger, connection) = connected();
        let address = ChannelAddress::new(1, 7);
        let screen = converger.graph_mut().create_scope("screen");
        let subscription = converger
            .graph_mut()
            .record_subscription(address.clone(), None, false)
            .unwrap();
        converger.process_events();
        assert!(converger.is_converge_complete());
        assert!(connection.requests().is_empty());

        screen
            .require_subscription(converger.graph_mut(), subscription)
            .unwrap();

        assert_eq!(converger.process_events(), 1);
        assert_eq!(connection.requests(), vec![FakeRequest::Subscribe(address, None)]);
    }

    #[test]
    fn equivalent_adds_are_grouped_behind_one_admission() {
        let (mut converger, connection) =
            converger_with(RateLimitConfig::default(), ConnectionState::Connected);
        for root_id in 1..=3 {
            converger
                .areas_mut()
                .create_or_update_area_of_interest(ChannelAddress::instance(1, 5, root_id), None);
        }
        converger
            .areas_mut()
            .create_or_update_area_of_interest(ChannelAddress::new(1, 6), None);

        assert_eq!(converger.process_events(), 1);

        assert_eq!(
            connection.requests(),
            (1..=3)
                .map(|root_id| FakeRequest::Subscribe(ChannelAddress::instance(1, 5, root_id), None))
                .collect::<Vec<_>>()
        );
        assert_eq!(converger.stats().adds_submitted, 3);
    }

    #[test]
    fn converged_state_is_a_fixed_point() {
        let (mut converger, connection) = connected();
        let address = ChannelAddress::new(1, 5);
        let area = converger
            .areas_mut()
            .create_or_update_area_of_interest(address.clone(), None);
        converger.process_events();

        complete_adds(&mut converger, &connection);

        assert!(converger.is_converge_complete());
        assert_eq!(converger.process_events(), 0);
        assert_eq!(connection.requests().len(), 1);
        assert_eq!(converger.outstanding_action(), None);
        assert_eq!(
            converger.areas().area_of_interest(area).unwrap().status(),
            AreaOfInterestStatus::Loaded
        );
        assert!(converger
            .graph()
            .find_subscription(&address)
            .is_some_and(|key| converger.graph().subscription(key).unwrap().is_explicit()));
    }

    #[test]
    fn disposed_area_is_unsubscribed_as_an_orphan() {
        let (mut converger, connection) = connected();
        let address = ChannelAddress::new(1, 5);
        let area = converger
            .areas_mut()
            .create_or_update_area_of_interest(address.clone(), None);
        converger.process_events();
        complete_adds(&mut converger, &connection);

        converger.areas_mut().dispose_area_of_interest(area).unwrap();
        converger.process_events();

        assert_eq!(
            connection.requests().last(),
            Some(&FakeRequest::Unsubscribe(address.clone()))
        );
        assert_eq!(converger.stats().removes_submitted, 1);

        converger.process_events();
        assert_eq!(converger.stats().removes_submitted, 1);

        connection.settle();
        converger
            .event_queue()
            .push(ConnectionEvent::UnsubscribeCompleted { address });
        converger.process_events();
        assert_eq!(converger.graph().subscription_count(), 0);
    }

    #[test]
    fn orphan_the_connection_never_subscribed_is_dropped_locally() {
        let (mut converger, connection) = connected();
        converger
            .graph_mut()
            .record_subscription(ChannelAddress::new(1, 9), None, true)
            .unwrap();

        converger.process_events();

        assert!(connection.requests().is_empty());
        assert_eq!(converger.graph().subscription_count(), 0);
        assert_eq!(converger.stats().orphans_dropped, 1);
    }

    #[test]
    fn failed_subscribe_marks_area_failed_until_redeclared() {
        let (mut converger, connection) = connected();
        let address = ChannelAddress::new(1, 5);
        let area = converger
            .areas_mut()
            .create_or_update_area_of_interest(address.clone(), None);
        converger.process_events();

        connection.drop_pending();
        converger.event_queue().push(ConnectionEvent::SubscribeFailed {
            address: address.clone(),
            reason: "denied".to_string(),
        });
        converger.process_events();

        let failed = converger.areas().area_of_interest(area).unwrap();
        assert_eq!(failed.status(), AreaOfInterestStatus::LoadFailed);
        assert_eq!(failed.last_error(), Some("denied"));
        assert_eq!(connection.requests().len(), 1);
        assert_eq!(converger.stats().remote_failures, 1);

        converger
            .areas_mut()
            .create_or_update_area_of_interest(address, None);
        converger.process_events();
        assert_eq!(connection.requests().len(), 2);
    }

    #[test]
    fn failed_update_keeps_the_remote_subscription_until_disposed() {
        let (mut converger, connection) = connected();
        let address = ChannelAddress::new(1, 5);
        let area = converger
            .areas_mut()
            .create_or_update_area_of_interest(address.clone(), Some(ChannelFilter::from("Old")));
        converger.process_events();
        complete_adds(&mut converger, &connection);

        converger
            .areas_mut()
            .create_or_update_area_of_interest(address.clone(), Some(ChannelFilter::from("New")));
        converger.process_events();
        assert_eq!(
            connection.requests().last(),
            Some(&FakeRequest::Update(address.clone(), Some(ChannelFilter::from("New"))))
        );

        connection.drop_pending();
        converger
            .event_queue()
            .push(ConnectionEvent::SubscriptionUpdateFailed {
                address: address.clone(),
                reason: "filter rejected".to_string(),
            });
        converger.process_events();

        assert_eq!(
            converger.areas().area_of_interest(area).unwrap().status(),
            AreaOfInterestStatus::UpdateFailed
        );
        let kept = converger.graph().find_subscription(&address).unwrap();
        assert_eq!(
            converger.graph().subscription(kept).unwrap().filter(),
            Some(&ChannelFilter::from("Old"))
        );

        converger.areas_mut().dispose_area_of_interest(area).unwrap();
        converger.process_events();

        assert_eq!(
            connection.requests().last(),
            Some(&FakeRequest::Unsubscribe(address.clone()))
        );
        connection.settle();
        converger
            .event_queue()
            .push(ConnectionEvent::UnsubscribeCompleted { address });
        converger.process_events();
        assert_eq!(converger.graph().subscription_count(), 0);
    }

    #[test]
    fn deactivating_forgets_the_outstanding_action() {
        let (mut converger, connection) = connected();
        converger
            .areas_mut()
            .create_or_update_area_of_interest(ChannelAddress::new(1, 5), None);
        converger.process_events();
        assert!(converger.outstanding_action().is_some());

        converger.deactivate();

        assert_eq!(converger.outstanding_action(), None);
        assert_eq!(connection.disconnect_calls(), 1);
        assert_eq!(converger.process_events(), 0);
    }

    #[test]
    fn pause_and_run_batches_edits_into_one_pass() {
        let (mut converger, connection) = connected();

        let passes_while_paused = converger.pause_and_run(|converger| {
            for root_id in 1..=2 {
                converger
                    .areas_mut()
                    .create_or_update_area_of_interest(ChannelAddress::instance(1, 5, root_id), None);
            }
            converger.process_events()
        });

        assert_eq!(passes_while_paused, 0);
        assert!(!converger.is_paused());
        assert_eq!(connection.requests().len(), 2);
    }

    #[test]
    fn pre_converge_action_runs_before_targets_are_computed() {
        let (mut converger, connection) = connected();
        let address = ChannelAddress::new(1, 3);
        let declared = address.clone();
        converger.set_pre_converge_action(move |areas, _graph| {
            areas.create_or_update_area_of_interest(declared.clone(), None);
        });

        converger.process_events();

        assert_eq!(connection.requests(), vec![FakeRequest::Subscribe(address, None)]);
    }

    #[test]
    fn nothing_converges_until_the_system_connects() {
        let (mut converger, connection) =
            converger_with(RateLimitConfig::unlimited(), ConnectionState::Connecting);
        converger
            .areas_mut()
            .create_or_update_area_of_interest(ChannelAddress::new(1, 5), None);

        assert_eq!(converger.process_events(), 0);
        assert!(connection.requests().is_empty());

        connection.set_state(ConnectionState::Connected);
        converger
            .event_queue()
            .push(ConnectionEvent::Connected { system_id: 1 });
        converger.process_events();

        assert_eq!(connection.requests().len(), 1);
    }

    #[test]
    fn throttled_pass_stays_incomplete() {
        let (mut converger, connection) =
            converger_with(RateLimitConfig::default(), ConnectionState::Connected);
        for channel_id in 1..=3 {
            converger
                .areas_mut()
                .create_or_update_area_of_interest(ChannelAddress::new(1, channel_id), None);
        }

        converger.process_events();
        complete_adds(&mut converger, &connection);
        complete_adds(&mut converger, &connection);

        assert_eq!(connection.requests().len(), 2);
        assert_eq!(converger.stats().throttled, 1);
        assert!(!converger.is_converge_complete());
    }
}
