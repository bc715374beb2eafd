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
use std::collections::BTreeSet;

/// A named, reference-counted grouping of required scopes and subscriptions.
///
/// A scope lives while at least one reference points at it. Releasing the last
/// incoming reference releases every outward scope and subscription reference.
#[derive(Debug)]
pub struct Scope {
    pub(super) name: String,
    pub(super) incoming: BTreeSet<ReferenceKey>,
    pub(super) outward: Vec<ReferenceKey>,
    pub(super) subscription_references: Vec<ReferenceKey>,
}

impl Scope {
    pub(super) fn new(name: String) -> Self {
        Self {
            name,
            incoming: BTreeSet::new(),
            outward: Vec::new(),
            subscription_references: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of live references pointing at this scope.
    pub fn reference_count(&self) -> usize {
        self.incoming.len()
    }
}
