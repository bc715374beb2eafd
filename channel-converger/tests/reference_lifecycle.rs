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


mod support;

use channel_converger::{
    ConvergerError, InterestEvent, InterestGraph, InterestListener, InterestListeners,
    ListenerList,
};
use converger_test_utils::{type_channel, RecordedRequest};
use std::cell::RefCell;
use std::rc::Rc;
use support::{converger_with_systems, settle};

#[derive(Default)]
struct EventLog {
    events: RefCell<Vec<InterestEvent>>,
}

impl InterestListener for EventLog {
    fn on_interest_changed(&self, event: &InterestEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

/// Unregisters itself from `listeners` the first time it is notified.
struct OneShot {
    listeners: InterestListeners,
    this: RefCell<Option<Rc<dyn InterestListener>>>,
    calls: RefCell<usize>,
}

impl InterestListener for OneShot {
    fn on_interest_changed(&self, _event: &InterestEvent) {
        *self.calls.borrow_mut() += 1;
        if let Some(this) = self.this.borrow_mut().take() {
            self.listeners.remove(&this);
        }
    }
}

#[test]
fn releasing_the_last_scope_reference_cascades_to_subscriptions() {
    converger_test_utils::init_logging();
    let mut graph = InterestGraph::new();
    let mut screen = graph.create_scope("screen");
    let mut panel = graph.create_scope("panel");
    let ticker = graph
        .record_subscription(type_channel(1, 5), None, false)
        .unwrap();
    panel.require_subscription(&mut graph, ticker).unwrap();
    screen.require_scope(&mut graph, &panel).unwrap();

    panel.release(&mut graph);
    assert!(graph.is_subscription_active(ticker));
    assert_eq!(panel.scope(&graph), Err(ConvergerError::ReferenceReleased));

    screen.release(&mut graph);
    assert!(!graph.is_subscription_active(ticker));
    assert_eq!(graph.scopes().count(), 0);

    screen.release(&mut graph);
    assert!(screen.is_released());
}

#[test]
fn requiring_the_same_target_twice_is_rejected() {
    converger_test_utils::init_logging();
    let mut graph = InterestGraph::new();
    let screen = graph.create_scope("screen");
    let ticker = graph
        .record_subscription(type_channel(1, 5), None, false)
        .unwrap();
    screen.require_subscription(&mut graph, ticker).unwrap();

    assert!(matches!(
        screen.require_subscription(&mut graph, ticker),
        Err(ConvergerError::AlreadyRequired { .. })
    ));
    assert!(matches!(
        screen.require_scope(&mut graph, &screen),
        Err(ConvergerError::SelfRequirement(_))
    ));
    assert_eq!(
        graph.record_subscription(type_channel(1, 5), None, true),
        Err(ConvergerError::DuplicateSubscription(type_channel(1, 5)))
    );
}

#[test]
fn deleted_subscription_invalidates_application_references() {
    converger_test_utils::init_logging();
    let mut graph = InterestGraph::new();
    let ticker = graph
        .record_subscription(type_channel(1, 5), None, true)
        .unwrap();
    let mut held = graph.create_subscription_reference(ticker).unwrap();
    assert_eq!(held.subscription(&graph), Ok(ticker));

    graph.delete_subscription(ticker).unwrap();

    assert_eq!(held.subscription(&graph), Err(ConvergerError::ReferenceReleased));
    held.release(&mut graph);
    assert_eq!(graph.subscription_count(), 0);
}

#[test]
fn listeners_observe_completed_cascades_and_may_unregister_mid_dispatch() {
    converger_test_utils::init_logging();
    let listeners: InterestListeners = Rc::new(ListenerList::new());
    let log = Rc::new(EventLog::default());
    listeners.add(log.clone());
    let one_shot = Rc::new(OneShot {
        listeners: Rc::clone(&listeners),
        this: RefCell::new(None),
        calls: RefCell::new(0),
    });
    let one_shot_listener: Rc<dyn InterestListener> = one_shot.clone();
    *one_shot.this.borrow_mut() = Some(Rc::clone(&one_shot_listener));
    listeners.add(one_shot_listener);

    let mut graph = InterestGraph::with_listeners(Rc::clone(&listeners));
    let mut screen = graph.create_scope("screen");
    let ticker = graph
        .record_subscription(type_channel(1, 5), None, false)
        .unwrap();
    screen.require_subscription(&mut graph, ticker).unwrap();
    screen.release(&mut graph);

    assert_eq!(*one_shot.calls.borrow(), 1);
    assert_eq!(listeners.len(), 1);
    let events = log.events.borrow();
    assert!(matches!(events[0], InterestEvent::ScopeCreated { .. }));
    assert!(matches!(events[1], InterestEvent::SubscriptionCreated { explicit: false, .. }));
    assert!(matches!(events[2], InterestEvent::ScopeUpdated { .. }));
    assert!(matches!(events[3], InterestEvent::ScopeReleased { .. }));
    assert!(matches!(events[4], InterestEvent::SubscriptionReleased { .. }));
    assert_eq!(events.len(), 5);
}

#[test]
fn scope_held_subscription_is_kept_until_the_scope_goes_away() {
    converger_test_utils::init_logging();
    let (mut converger, connections) = converger_with_systems(&[1]);
    let connection = &connections[0];
    let ticker_address = type_channel(1, 5);

    let graph = converger.graph_mut();
    let mut screen = graph.create_scope("screen");
    let ticker = graph
        .record_subscription(ticker_address.clone(), None, false)
        .unwrap();
    screen.require_subscription(graph, ticker).unwrap();
    settle(&mut converger, connection);

    assert!(converger.graph().subscription(ticker).unwrap().is_explicit());
    assert_eq!(connection.subscribe_requests(), vec![ticker_address.clone()]);

    screen.release(converger.graph_mut());
    assert!(converger.graph().is_subscription_active(ticker));
    settle(&mut converger, connection);

    assert!(!converger.graph().is_subscription_active(ticker));
    assert_eq!(
        connection.requests(),
        vec![
            RecordedRequest::Subscribe(ticker_address.clone(), None),
            RecordedRequest::Unsubscribe(ticker_address),
        ]
    );
}
