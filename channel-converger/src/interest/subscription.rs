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

use crate::interest::keys::ReferenceKey;
use crate::{ChannelAddress, ChannelFilter};
use std::collections::BTreeSet;

/// Actual-state record of one established channel interest.
///
/// A subscription is explicit when the application asked for it directly and
/// implicit when it only exists because another subscription requires it. It is
/// released once it is no longer explicit and no reference points at it.
#[derive(Debug)]
pub struct Subscription {
    pub(super) address: ChannelAddress,
    pub(super) filter: Option<ChannelFilter>,
    pub(super) explicit: bool,
    pub(super) incoming: BTreeSet<ReferenceKey>,
    pub(super) required: Vec<ReferenceKey>,
}

impl Subscription {
    pub(super) fn new(address: ChannelAddress, filter: Option<ChannelFilter>, explicit: bool) -> Self {
        Self {
            address,
            filter,
            explicit,
            incoming: BTreeSet::new(),
            required: Vec::new(),
        }
    }

    pub fn address(&self) -> &ChannelAddress {
        &self.address
    }

    pub fn filter(&self) -> Option<&ChannelFilter> {
        self.filter.as_ref()
    }

    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    pub fn reference_count(&self) -> usize {
        self.incoming.len()
    }

    pub(super) fn is_releasable(&self) -> bool {
        !self.explicit && self.incoming.is_empty()
    }
}
