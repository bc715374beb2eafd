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

//! Completion reports flowing from connections back into the converger.

use crate::{ChannelAddress, ChannelFilter};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Outcome reported by a connection for one system.
#[derive(Clone, Debug, PartialEq)]
pub enum ConnectionEvent {
    Connected {
        system_id: u32,
    },
    Disconnected {
        system_id: u32,
    },
    /// A connect attempt was rejected, e.g. bad credentials.
    InvalidConnect {
        system_id: u32,
        reason: String,
    },
    InvalidDisconnect {
        system_id: u32,
        reason: String,
    },
    SubscribeCompleted {
        address: ChannelAddress,
        filter: Option<ChannelFilter>,
    },
    /// The remote side subscribed `address` on its own because `required_by` needs it.
    ImplicitSubscribeCompleted {
        address: ChannelAddress,
        filter: Option<ChannelFilter>,
        required_by: ChannelAddress,
    },
    SubscribeFailed {
        address: ChannelAddress,
        reason: String,
    },
    UnsubscribeCompleted {
        address: ChannelAddress,
    },
    UnsubscribeFailed {
        address: ChannelAddress,
        reason: String,
    },
    SubscriptionUpdateCompleted {
        address: ChannelAddress,
        filter: Option<ChannelFilter>,
    },
    SubscriptionUpdateFailed {
        address: ChannelAddress,
        reason: String,
    },
}

impl ConnectionEvent {
    pub fn system_id(&self) -> u32 {
        match self {
            Self::Connected { system_id }
            | Self::Disconnected { system_id }
            | Self::InvalidConnect { system_id, .. }
            | Self::InvalidDisconnect { system_id, .. } => *system_id,
            Self::SubscribeCompleted { address, .. }
            | Self::ImplicitSubscribeCompleted { address, .. }
            | Self::SubscribeFailed { address, .. }
            | Self::UnsubscribeCompleted { address }
            | Self::UnsubscribeFailed { address, .. }
            | Self::SubscriptionUpdateCompleted { address, .. }
            | Self::SubscriptionUpdateFailed { address, .. } => address.system_id(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::Disconnected { .. } => "disconnected",
            Self::InvalidConnect { .. } => "invalid_connect",
            Self::InvalidDisconnect { .. } => "invalid_disconnect",
            Self::SubscribeCompleted { .. } => "subscribe_completed",
            Self::ImplicitSubscribeCompleted { .. } => "implicit_subscribe_completed",
            Self::SubscribeFailed { .. } => "subscribe_failed",
            Self::UnsubscribeCompleted { .. } => "unsubscribe_completed",
            Self::UnsubscribeFailed { .. } => "unsubscribe_failed",
            Self::SubscriptionUpdateCompleted { .. } => "subscription_update_completed",
            Self::SubscriptionUpdateFailed { .. } => "subscription_update_failed",
        }
    }
}

/// Shared FIFO that connections push completions into.
///
/// Connections never call back into the converger directly. They enqueue, and the
/// owner of the converger drains the queue with
/// [`Converger::process_events`](crate::Converger::process_events), which keeps the
/// stack depth bounded no matter how many completions chain.
#[derive(Clone, Default)]
pub struct EventQueue {
    inner: Rc<RefCell<VecDeque<ConnectionEvent>>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: ConnectionEvent) {
        self.inner.borrow_mut().push_back(event);
    }

    pub fn pop(&self) -> Option<ConnectionEvent> {
        self.inner.borrow_mut().pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{ConnectionEvent, EventQueue};
    use crate::ChannelAddress;

    #[test]
    fn clones_share_one_fifo() {
        let queue = EventQueue::new();
        let producer = queue.clone();
        producer.push(ConnectionEvent::Connected { system_id: 1 });
        producer.push(ConnectionEvent::UnsubscribeCompleted {
            address: ChannelAddress::new(2, 3),
        });

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop().map(|event| event.system_id()), Some(1));
        assert_eq!(queue.pop().map(|event| event.system_id()), Some(2));
        assert!(queue.is_empty());
    }
}
