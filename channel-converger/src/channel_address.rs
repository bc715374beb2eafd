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

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// [`ChannelAddress`] identifies one replicated data channel inside one data system.
///
/// A "type" channel has no root id, an "instance" channel carries the id of the
/// entity it is rooted at. Two addresses that share the channel id but differ in
/// root id are distinct channels.
///
/// Ordering is lexicographic over `(system_id, channel_id, root_id, filter_instance_id)`
/// with an absent component ordering before a present one.
///
/// # Examples
///
/// ```
/// use channel_converger::ChannelAddress;
///
/// let type_channel = ChannelAddress::new(1, 5);
/// let instance_channel = ChannelAddress::instance(1, 5, 42);
///
/// assert!(type_channel.is_type_channel());
/// assert_ne!(type_channel, instance_channel);
/// assert!(type_channel < instance_channel);
/// assert_eq!(instance_channel.to_string(), "1.5.42");
/// ```
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct ChannelAddress {
    system_id: u32,
    channel_id: u32,
    #[serde(default)]
    root_id: Option<u32>,
    #[serde(default)]
    filter_instance_id: Option<String>,
}

impl ChannelAddress {
    /// Creates the address of a type channel.
    pub fn new(system_id: u32, channel_id: u32) -> Self {
        Self {
            system_id,
            channel_id,
            root_id: None,
            filter_instance_id: None,
        }
    }

    /// Creates the address of an instance channel rooted at `root_id`.
    pub fn instance(system_id: u32, channel_id: u32, root_id: u32) -> Self {
        Self {
            root_id: Some(root_id),
            ..Self::new(system_id, channel_id)
        }
    }

    pub fn with_filter_instance(mut self, filter_instance_id: impl Into<String>) -> Self {
        self.filter_instance_id = Some(filter_instance_id.into());
        self
    }

    pub fn system_id(&self) -> u32 {
        self.system_id
    }

    pub fn channel_id(&self) -> u32 {
        self.channel_id
    }

    pub fn root_id(&self) -> Option<u32> {
        self.root_id
    }

    pub fn filter_instance_id(&self) -> Option<&str> {
        self.filter_instance_id.as_deref()
    }

    pub fn is_type_channel(&self) -> bool {
        self.root_id.is_none()
    }

    pub fn is_instance_channel(&self) -> bool {
        self.root_id.is_some()
    }

    /// Returns `true` when both addresses name the same channel of the same system,
    /// regardless of root or filter instance.
    pub fn same_channel_type(&self, other: &ChannelAddress) -> bool {
        self.system_id == other.system_id && self.channel_id == other.channel_id
    }
}

impl Display for ChannelAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.system_id, self.channel_id)?;
        if let Some(root_id) = self.root_id {
            write!(f, ".{root_id}")?;
        }
        if let Some(filter_instance_id) = &self.filter_instance_id {
            write!(f, "#{filter_instance_id}")?;
        }
        Ok(())
    }
}
