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

//! Arena keys for interest-graph nodes.
//!
//! Keys are allocated from a monotonically increasing counter and never reused, so a
//! key that outlives its node can only ever resolve to "not found".

use std::fmt::{Display, Formatter};

macro_rules! arena_key {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
        pub struct $name(u64);

        impl $name {
            pub(crate) fn new(raw: u64) -> Self {
                Self(raw)
            }

            pub fn raw(&self) -> u64 {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}#{}", $label, self.0)
            }
        }
    };
}

arena_key!(
    /// Identifies one [`Scope`](crate::Scope) in an [`InterestGraph`](crate::InterestGraph).
    ScopeKey,
    "scope"
);
arena_key!(
    /// Identifies one [`Subscription`](crate::Subscription) in an [`InterestGraph`](crate::InterestGraph).
    SubscriptionKey,
    "subscription"
);
arena_key!(
    /// Identifies one reference edge in an [`InterestGraph`](crate::InterestGraph).
    ReferenceKey,
    "reference"
);
arena_key!(
    /// Identifies one [`AreaOfInterest`](crate::AreaOfInterest).
    AreaOfInterestKey,
    "area_of_interest"
);

#[derive(Debug, Default)]
pub(crate) struct KeyAllocator {
    next: u64,
}

impl KeyAllocator {
    pub(crate) fn next_raw(&mut self) -> u64 {
        self.next += 1;
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::{KeyAllocator, ScopeKey};

    #[test]
    fn allocator_never_reuses_keys() {
        let mut allocator = KeyAllocator::default();
        let first = ScopeKey::new(allocator.next_raw());
        let second = ScopeKey::new(allocator.next_raw());

        assert_ne!(first, second);
        assert_eq!(first.to_string(), "scope#1");
        assert_eq!(second.raw(), 2);
    }
}
