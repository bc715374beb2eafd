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

//! Error types for invariant violations.
//!
//! Remote failures never surface as [`ConvergerError`]: they arrive as
//! [`ConnectionEvent`](crate::ConnectionEvent) failures and are absorbed by the
//! [`Converger`](crate::Converger).

use crate::interest::keys::{AreaOfInterestKey, ScopeKey, SubscriptionKey};
use crate::ChannelAddress;
use thiserror::Error;

/// Result type for channel-converger operations.
pub type Result<T> = std::result::Result<T, ConvergerError>;

/// Synchronous, fail-fast programming errors.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ConvergerError {
    /// A live subscription for the address already exists.
    #[error("a subscription for channel {0} already exists")]
    DuplicateSubscription(ChannelAddress),

    /// The holder already requires the target through a live reference.
    #[error("{target} is already required by {holder}")]
    AlreadyRequired { holder: String, target: String },

    /// A scope or subscription attempted to require itself.
    #[error("{0} cannot require itself")]
    SelfRequirement(String),

    #[error("{0} is not active")]
    InactiveScope(ScopeKey),

    #[error("{0} is not active")]
    InactiveSubscription(SubscriptionKey),

    /// The reference object was released and may no longer be used.
    #[error("reference has already been released")]
    ReferenceReleased,

    #[error("{0} has been disposed")]
    DisposedAreaOfInterest(AreaOfInterestKey),

    #[error("no connection registered for system {0}")]
    UnknownSystem(u32),

    #[error("a connection for system {0} is already registered")]
    DuplicateSystem(u32),
}
