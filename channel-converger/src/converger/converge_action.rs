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

//! Per-target convergence outcomes and the grouping predicate.

use crate::connector::connection::ActionKind;
use crate::filter::filters_equal;
use crate::{ChannelAddress, ChannelFilter};
use std::fmt::{Display, Formatter};

/// Result of converging one target.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConvergeAction {
    /// Nothing to do: converged, disposed, failed or its system is not connected.
    NoAction,
    /// Waiting on an action already queued on the connection.
    InProgress,
    SubmittedAdd,
    SubmittedUpdate,
    /// While grouping: this target needs its own pass.
    Terminate,
}

impl ConvergeAction {
    pub fn is_submitted(&self) -> bool {
        matches!(self, Self::SubmittedAdd | Self::SubmittedUpdate)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoAction => "no_action",
            Self::InProgress => "in_progress",
            Self::SubmittedAdd => "submitted_add",
            Self::SubmittedUpdate => "submitted_update",
            Self::Terminate => "terminate",
        }
    }
}

impl Display for ConvergeAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a request reaches the connection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Admission {
    /// The first request of a pass goes through the entry's rate limiter.
    RateLimited,
    /// Requests grouped behind an admitted one bypass the limiter.
    Immediate,
}

/// The request admitted first in a pass, which later requests may be grouped with.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupCandidate {
    pub kind: ActionKind,
    pub address: ChannelAddress,
    pub filter: Option<ChannelFilter>,
}

impl GroupCandidate {
    pub fn new(kind: ActionKind, address: ChannelAddress, filter: Option<ChannelFilter>) -> Self {
        Self {
            kind,
            address,
            filter,
        }
    }
}

/// Returns `true` when `b` may ride along with the already admitted `a`.
///
/// Both must be the same kind of action on the same channel of the same system
/// (any root id) with normalized-equal filters. The same rule applies to adds,
/// removes and updates.
pub fn can_group(a: &GroupCandidate, b: &GroupCandidate) -> bool {
    a.kind == b.kind
        && a.address.same_channel_type(&b.address)
        && filters_equal(a.filter.as_ref(), b.filter.as_ref())
}
