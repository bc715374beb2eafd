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

//! # channel-converger
//!
//! `channel-converger` keeps a set of independently connected data systems subscribed
//! to exactly the channels an application has declared interest in.
//!
//! Desired state is expressed as [`AreaOfInterest`]s and as subscriptions held by
//! reference-counted [`Scope`]s. Actual state is the set of [`Subscription`]s the
//! remote systems have confirmed. The [`Converger`] walks desired state in
//! dependency order and issues the subscribe, unsubscribe and update requests needed
//! to reconcile the two, one admitted request per pass.
//!
//! ## Reference-counted interest
//!
//! ```
//! use channel_converger::{ChannelAddress, InterestGraph};
//!
//! let mut graph = InterestGraph::new();
//! let mut dashboard = graph.create_scope("dashboard");
//! let prices = graph
//!     .record_subscription(ChannelAddress::new(1, 5), None, false)
//!     .unwrap();
//! dashboard.require_subscription(&mut graph, prices).unwrap();
//!
//! // A second holder keeps the scope, and its subscriptions, alive.
//! let mut sidebar = dashboard.create_reference(&mut graph).unwrap();
//! dashboard.release(&mut graph);
//! assert!(graph.is_subscription_active(prices));
//!
//! sidebar.release(&mut graph);
//! assert!(!graph.is_subscription_active(prices));
//! assert!(sidebar.scope(&graph).is_err());
//! ```
//!
//! ## Internal architecture map
//!
//! - Interest: scopes, subscriptions and references in an arena graph, plus the
//!   area-of-interest service
//! - Connector: the `Connection` boundary, token-bucket admission and the composite
//!   connection state
//! - Converger: dependency-ordered plan, per-target reconciliation, completion intake
//!   through the event queue
//!
//! ## Observability model
//!
//! The workspace uses `tracing` for logs/events.
//! Library code emits events and does not initialize a global subscriber.
//! Binaries and tests are responsible for one-time `tracing_subscriber`
//! initialization at process boundaries.

mod channel_address;
pub use channel_address::ChannelAddress;

mod config;
pub use config::{ConvergerConfig, RateLimitConfig};

mod connector;
pub use connector::connection::{ActionKind, Connection, ConnectionState};
pub use connector::connection_entry::ConnectionEntry;
pub use connector::connector_system::{
    composite_state, ConnectorListener, ConnectorListeners, ConnectorSystem,
};
pub use connector::rate_limiter::RateLimiter;

mod converger;
pub use converger::converge_action::{can_group, Admission, ConvergeAction, GroupCandidate};
pub use converger::engine::{Converger, ConvergerStats, OutstandingAction, PreConvergeAction};
pub use converger::event_queue::{ConnectionEvent, EventQueue};

mod error;
pub use error::{ConvergerError, Result};

mod filter;
pub use filter::{filters_equal, ChannelFilter};

mod interest;
pub use interest::area_of_interest::{AreaOfInterest, AreaOfInterestService, AreaOfInterestStatus};
pub use interest::events::{InterestEvent, InterestListener};
pub use interest::graph::{InterestGraph, InterestListeners};
pub use interest::keys::{AreaOfInterestKey, ReferenceKey, ScopeKey, SubscriptionKey};
pub use interest::reference::{ScopeReference, SubscriptionReference};
pub use interest::scope::Scope;
pub use interest::subscription::Subscription;

mod listener;
pub use listener::ListenerList;

#[doc(hidden)]
pub mod observability;

#[cfg(test)]
mod testing;
