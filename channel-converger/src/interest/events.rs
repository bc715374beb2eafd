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

//! Lifecycle notifications emitted by the interest graph and the area-of-interest service.

use crate::interest::area_of_interest::AreaOfInterestStatus;
use crate::interest::keys::{AreaOfInterestKey, ScopeKey, SubscriptionKey};
use crate::ChannelAddress;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum InterestEvent {
    ScopeCreated {
        scope: ScopeKey,
        name: String,
    },
    /// The scope gained a required scope or subscription.
    ScopeUpdated {
        scope: ScopeKey,
        name: String,
    },
    ScopeReleased {
        scope: ScopeKey,
        name: String,
    },
    SubscriptionCreated {
        subscription: SubscriptionKey,
        address: ChannelAddress,
        explicit: bool,
    },
    SubscriptionUpdated {
        subscription: SubscriptionKey,
        address: ChannelAddress,
    },
    SubscriptionReleased {
        subscription: SubscriptionKey,
        address: ChannelAddress,
    },
    AreaOfInterestCreated {
        area_of_interest: AreaOfInterestKey,
        address: ChannelAddress,
    },
    AreaOfInterestUpdated {
        area_of_interest: AreaOfInterestKey,
        address: ChannelAddress,
    },
    AreaOfInterestStatusChanged {
        area_of_interest: AreaOfInterestKey,
        address: ChannelAddress,
        status: AreaOfInterestStatus,
    },
    AreaOfInterestDisposed {
        area_of_interest: AreaOfInterestKey,
        address: ChannelAddress,
    },
}

impl InterestEvent {
    /// Returns `true` for events that change desired or actual interest, as opposed to
    /// progress reports about convergence itself.
    pub fn changes_interest(&self) -> bool {
        !matches!(self, InterestEvent::AreaOfInterestStatusChanged { .. })
    }
}

/// Receives [`InterestEvent`]s after the emitting mutation has fully completed.
pub trait InterestListener {
    fn on_interest_changed(&self, event: &InterestEvent);
}
