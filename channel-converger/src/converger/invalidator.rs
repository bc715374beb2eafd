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

//! Listener that re-arms convergence when desired or connection state changes.

use crate::connector::connection::ConnectionState;
use crate::connector::connector_system::ConnectorListener;
use crate::interest::events::{InterestEvent, InterestListener};
use std::cell::Cell;

/// Records invalidations until the converger absorbs them at the start of a pass.
#[derive(Debug, Default)]
pub(crate) struct ConvergeInvalidator {
    targets_stale: Cell<bool>,
    incomplete: Cell<bool>,
}

impl ConvergeInvalidator {
    /// Returns and clears the "cached plan is stale" flag.
    pub(crate) fn take_targets_stale(&self) -> bool {
        self.targets_stale.take()
    }

    pub(crate) fn take_incomplete(&self) -> bool {
        self.incomplete.take()
    }

    pub(crate) fn is_incomplete(&self) -> bool {
        self.incomplete.get()
    }
}

impl InterestListener for ConvergeInvalidator {
    fn on_interest_changed(&self, event: &InterestEvent) {
        if event.changes_interest() {
            self.targets_stale.set(true);
            self.incomplete.set(true);
        }
    }
}

impl ConnectorListener for ConvergeInvalidator {
    fn on_state_changed(&self, _previous: ConnectionState, _current: ConnectionState) {
        self.incomplete.set(true);
    }
}
