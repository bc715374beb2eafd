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

//! Desired-state records: the channels the application wants data for.

use crate::error::{ConvergerError, Result};
use crate::filter::filters_equal;
use crate::interest::events::InterestEvent;
use crate::interest::graph::InterestListeners;
use crate::interest::keys::{AreaOfInterestKey, KeyAllocator};
use crate::listener::ListenerList;
use crate::observability::{events, fields};
use crate::{ChannelAddress, ChannelFilter};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::rc::Rc;
use tracing::debug;

const COMPONENT: &str = "area_of_interest_service";

/// Convergence progress of one [`AreaOfInterest`].
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaOfInterestStatus {
    #[default]
    NotAsked,
    Loading,
    Loaded,
    LoadFailed,
    Updating,
    Updated,
    UpdateFailed,
    Unloading,
    Unloaded,
    Deleted,
}

impl AreaOfInterestStatus {
    /// Failed areas are skipped by convergence until the application updates them.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::LoadFailed | Self::UpdateFailed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotAsked => "not_asked",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
            Self::LoadFailed => "load_failed",
            Self::Updating => "updating",
            Self::Updated => "updated",
            Self::UpdateFailed => "update_failed",
            Self::Unloading => "unloading",
            Self::Unloaded => "unloaded",
            Self::Deleted => "deleted",
        }
    }
}

impl Display for AreaOfInterestStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One channel the application wants, with the filter it wants it with.
#[derive(Clone, Debug)]
pub struct AreaOfInterest {
    address: ChannelAddress,
    filter: Option<ChannelFilter>,
    status: AreaOfInterestStatus,
    last_error: Option<String>,
}

impl AreaOfInterest {
    pub fn address(&self) -> &ChannelAddress {
        &self.address
    }

    pub fn filter(&self) -> Option<&ChannelFilter> {
        self.filter.as_ref()
    }

    pub fn status(&self) -> AreaOfInterestStatus {
        self.status
    }

    /// Reason reported by the most recent failed action, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

/// Owns every live [`AreaOfInterest`], at most one per address.
pub struct AreaOfInterestService {
    keys: KeyAllocator,
    areas: BTreeMap<AreaOfInterestKey, AreaOfInterest>,
    by_address: BTreeMap<ChannelAddress, AreaOfInterestKey>,
    listeners: InterestListeners,
}

impl Default for AreaOfInterestService {
    fn default() -> Self {
        Self::new()
    }
}

impl AreaOfInterestService {
    pub fn new() -> Self {
        Self::with_listeners(Rc::new(ListenerList::new()))
    }

    pub fn with_listeners(listeners: InterestListeners) -> Self {
        Self {
            keys: KeyAllocator::default(),
            areas: BTreeMap::new(),
            by_address: BTreeMap::new(),
            listeners,
        }
    }

    pub fn listeners(&self) -> InterestListeners {
        self.listeners.clone()
    }

    /// Declares interest in `address`.
    ///
    /// When an area already exists for the address its filter is updated in place
    /// and a failed status is reset so convergence retries it. Re-declaring an
    /// unchanged, healthy area emits nothing.
    pub fn create_or_update_area_of_interest(
        &mut self,
        address: ChannelAddress,
        filter: Option<ChannelFilter>,
    ) -> AreaOfInterestKey {
        if let Some(key) = self.by_address.get(&address).copied() {
            let Some(area) = self.areas.get_mut(&key) else {
                return key;
            };
            if filters_equal(area.filter.as_ref(), filter.as_ref()) && !area.status.is_failed() {
                return key;
            }

            area.filter = filter;
            if area.status.is_failed() {
                area.status = AreaOfInterestStatus::NotAsked;
                area.last_error = None;
            }
            debug!(
                event = events::AREA_OF_INTEREST_UPDATED,
                component = COMPONENT,
                area_of_interest = %key,
                address = %address,
                filter = %fields::format_filter(area.filter.as_ref()),
                "area of interest updated"
            );
            self.emit(InterestEvent::AreaOfInterestUpdated {
                area_of_interest: key,
                address,
            });
            return key;
        }

        let key = AreaOfInterestKey::new(self.keys.next_raw());
        debug!(
            event = events::AREA_OF_INTEREST_CREATED,
            component = COMPONENT,
            area_of_interest = %key,
            address = %address,
            filter = %fields::format_filter(filter.as_ref()),
            "area of interest created"
        );
        self.areas.insert(
            key,
            AreaOfInterest {
                address: address.clone(),
                filter,
                status: AreaOfInterestStatus::NotAsked,
                last_error: None,
            },
        );
        self.by_address.insert(address.clone(), key);
        self.emit(InterestEvent::AreaOfInterestCreated {
            area_of_interest: key,
            address,
        });
        key
    }

    pub fn find_area_of_interest(&self, address: &ChannelAddress) -> Option<AreaOfInterestKey> {
        self.by_address.get(address).copied()
    }

    pub fn area_of_interest(&self, key: AreaOfInterestKey) -> Result<&AreaOfInterest> {
        self.areas
            .get(&key)
            .ok_or(ConvergerError::DisposedAreaOfInterest(key))
    }

    pub fn is_disposed(&self, key: AreaOfInterestKey) -> bool {
        !self.areas.contains_key(&key)
    }

    /// Withdraws interest. The subscription is removed by the next convergence pass.
    pub fn dispose_area_of_interest(&mut self, key: AreaOfInterestKey) -> Result<()> {
        let area = self
            .areas
            .remove(&key)
            .ok_or(ConvergerError::DisposedAreaOfInterest(key))?;
        self.by_address.remove(&area.address);

        debug!(
            event = events::AREA_OF_INTEREST_DISPOSED,
            component = COMPONENT,
            area_of_interest = %key,
            address = %area.address,
            status = %area.status,
            "area of interest disposed"
        );
        self.emit(InterestEvent::AreaOfInterestDisposed {
            area_of_interest: key,
            address: area.address,
        });
        Ok(())
    }

    /// Live areas in address order.
    pub fn areas_of_interest(&self) -> impl Iterator<Item = (AreaOfInterestKey, &AreaOfInterest)> {
        self.by_address
            .values()
            .filter_map(|key| self.areas.get(key).map(|area| (*key, area)))
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    pub(crate) fn set_status(
        &mut self,
        key: AreaOfInterestKey,
        status: AreaOfInterestStatus,
        error: Option<String>,
    ) {
        let Some(area) = self.areas.get_mut(&key) else {
            return;
        };
        if area.status == status && error.is_none() {
            return;
        }
        let previous = area.status;
        area.status = status;
        if error.is_some() || !status.is_failed() {
            area.last_error = error;
        }
        let address = area.address.clone();

        debug!(
            event = events::AREA_OF_INTEREST_STATUS_CHANGED,
            component = COMPONENT,
            area_of_interest = %key,
            address = %address,
            previous_state = %previous,
            state = %status,
            "area of interest status changed"
        );
        self.emit(InterestEvent::AreaOfInterestStatusChanged {
            area_of_interest: key,
            address,
            status,
        });
    }

    fn emit(&self, event: InterestEvent) {
        self.listeners
            .dispatch(|listener| listener.on_interest_changed(&event));
    }
}
