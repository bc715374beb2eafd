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

//! Dependency-ordered walk over desired state.

use crate::interest::area_of_interest::AreaOfInterestService;
use crate::interest::graph::InterestGraph;
use crate::interest::keys::{AreaOfInterestKey, SubscriptionKey};
use crate::observability::events;
use crate::ChannelAddress;
use std::collections::BTreeSet;
use tracing::{debug, warn};

const COMPONENT: &str = "converge_plan";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum ConvergeTarget {
    AreaOfInterest(AreaOfInterestKey),
    /// A subscription that is required or held but has no area of interest of its own.
    Subscription(SubscriptionKey),
}

/// Targets in post order, so every dependency precedes its dependents.
#[derive(Debug, Default)]
pub(crate) struct ConvergePlan {
    pub(crate) targets: Vec<ConvergeTarget>,
    pub(crate) expected: BTreeSet<ChannelAddress>,
}

impl ConvergePlan {
    /// Walks from every area of interest and every application- or scope-held
    /// subscription, visiting required subscriptions before their dependents.
    /// Each address is visited once.
    pub(crate) fn build(graph: &InterestGraph, areas: &AreaOfInterestService) -> Self {
        let mut builder = PlanBuilder {
            graph,
            areas,
            on_stack: BTreeSet::new(),
            plan: ConvergePlan::default(),
        };

        for (_, area) in areas.areas_of_interest() {
            builder.visit(area.address().clone());
        }
        for subscription in graph.held_subscriptions() {
            if let Ok(node) = graph.subscription(subscription) {
                builder.visit(node.address().clone());
            }
        }

        debug!(
            event = events::CONVERGE_PLAN_BUILT,
            component = COMPONENT,
            target_count = builder.plan.targets.len(),
            expected_count = builder.plan.expected.len(),
            "convergence plan built"
        );
        builder.plan
    }
}

struct PlanBuilder<'a> {
    graph: &'a InterestGraph,
    areas: &'a AreaOfInterestService,
    on_stack: BTreeSet<ChannelAddress>,
    plan: ConvergePlan,
}

impl PlanBuilder<'_> {
    fn visit(&mut self, root: ChannelAddress) {
        let mut stack = vec![(root, false)];

        while let Some((address, expanded)) = stack.pop() {
            if expanded {
                self.on_stack.remove(&address);
                self.finish(address);
                continue;
            }
            if self.plan.expected.contains(&address) {
                continue;
            }
            if self.on_stack.contains(&address) {
                warn!(
                    event = events::CONVERGE_CYCLE_SKIPPED,
                    component = COMPONENT,
                    address = %address,
                    "requirement cycle skipped"
                );
                continue;
            }

            self.on_stack.insert(address.clone());
            stack.push((address.clone(), true));
            let requirements = self
                .graph
                .find_subscription(&address)
                .map(|subscription| self.graph.live_requirements(subscription))
                .unwrap_or_default();
            for requirement in requirements.into_iter().rev() {
                if let Ok(node) = self.graph.subscription(requirement) {
                    stack.push((node.address().clone(), false));
                }
            }
        }
    }

    fn finish(&mut self, address: ChannelAddress) {
        if !self.plan.expected.insert(address.clone()) {
            return;
        }
        if let Some(area) = self.areas.find_area_of_interest(&address) {
            self.plan.targets.push(ConvergeTarget::AreaOfInterest(area));
        } else if let Some(subscription) = self.graph.find_subscription(&address) {
            self.plan
                .targets
                .push(ConvergeTarget::Subscription(subscription));
        }
    }
}
