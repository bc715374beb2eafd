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

//! Channel filter values and the normalized equality used to compare them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

/// Filter parameters attached to a channel subscription.
///
/// Filters are opaque JSON values to the engine. Two filters are equal when their
/// canonical renderings are equal: object keys are sorted recursively before
/// rendering, so key order never affects equality. Number formatting is preserved,
/// which means `1` and `1.0` are different filters.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelFilter(Value);

impl ChannelFilter {
    pub fn new(value: impl Into<Value>) -> Self {
        Self(value.into())
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Renders the filter with object keys sorted at every level.
    pub fn canonical(&self) -> String {
        canonicalize(&self.0).to_string()
    }
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|left, right| left.0.cmp(right.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key.clone(), canonicalize(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

impl PartialEq for ChannelFilter {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for ChannelFilter {}

impl Hash for ChannelFilter {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

impl Display for ChannelFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl From<Value> for ChannelFilter {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<&str> for ChannelFilter {
    fn from(value: &str) -> Self {
        Self(Value::String(value.to_string()))
    }
}

impl From<String> for ChannelFilter {
    fn from(value: String) -> Self {
        Self(Value::String(value))
    }
}

/// Normalized filter equality. An absent filter only equals another absent filter.
pub fn filters_equal(left: Option<&ChannelFilter>, right: Option<&ChannelFilter>) -> bool {
    match (left, right) {
        (None, None) => true,
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}
