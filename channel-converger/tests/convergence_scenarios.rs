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

use channel_converger::{AreaOfInterestStatus, ChannelFilter};
use converger_test_utils::{instance_channel, type_channel, RecordedRequest};
use std::cell::RefCell;
use std::rc::Rc;
use support::{converger_with_systems, declare, settle, status};

#[test]
fn declared_area_is_subscribed_and_loaded() {
    converger_test_utils::init_logging();
    let (mut converger, connections) = converger_with_systems(&[1]);
    let connection = &connections[0];
    let prices = type_channel(1, 5);

    let area = declare(&mut converger, &prices, None);
    converger.process_events();
    assert_eq!(status(&converger, area), AreaOfInterestStatus::Loading);
    assert_eq!(connection.pending_len(), 1);

    settle(&mut converger, connection);

    assert_eq!(status(&converger, area), AreaOfInterestStatus::Loaded);
    assert_eq!(
        connection.requests(),
        vec![RecordedRequest::Subscribe(prices.clone(), None)]
    );
    let subscription = converger
        .graph()
        .find_subscription(&prices)
        .expect("completed subscribe should be recorded");
    assert!(converger.graph().subscription(subscription).unwrap().is_explicit());
    assert!(converger.is_converge_complete());
    assert!(converger.outstanding_action().is_none());
}

#[test]
fn disposed_area_is_unsubscribed_and_forgotten() {
    converger_test_utils::init_logging();
    let (mut converger, connections) = converger_with_systems(&[1]);
    let connection = &connections[0];
    let prices = type_channel(1, 5);
    let area = declare(&mut converger, &prices, None);
    settle(&mut converger, connection);

    converger.areas_mut().dispose_area_of_interest(area).unwrap();
    settle(&mut converger, connection);

    assert_eq!(
        connection.requests(),
        vec![
            RecordedRequest::Subscribe(prices.clone(), None),
            RecordedRequest::Unsubscribe(prices.clone()),
        ]
    );
    assert!(converger.graph().find_subscription(&prices).is_none());
    assert!(connection.subscribed_addresses().is_empty());
    assert_eq!(converger.stats().removes_submitted, 1);
}

#[test]
fn changed_filter_is_applied_with_an_update() {
    converger_test_utils::init_logging();
    let (mut converger, connections) = converger_with_systems(&[1]);
    let connection = &connections[0];
    let quotes = type_channel(1, 7);
    let area = declare(&mut converger, &quotes, Some("OldFilter"));
    settle(&mut converger, connection);

    declare(&mut converger, &quotes, Some("Filter1"));
    converger.process_events();
    assert_eq!(status(&converger, area), AreaOfInterestStatus::Updating);

    settle(&mut converger, connection);

    assert_eq!(status(&converger, area), AreaOfInterestStatus::Updated);
    assert_eq!(
        connection.requests(),
        vec![
            RecordedRequest::Subscribe(quotes.clone(), Some(ChannelFilter::from("OldFilter"))),
            RecordedRequest::Update(quotes.clone(), Some(ChannelFilter::from("Filter1"))),
        ]
    );
    let subscription = converger.graph().find_subscription(&quotes).unwrap();
    assert_eq!(
        converger.graph().subscription(subscription).unwrap().filter(),
        Some(&ChannelFilter::from("Filter1"))
    );
    assert_eq!(
        connection.subscribed_filter(&quotes),
        Some(Some(ChannelFilter::from("Filter1")))
    );
}

#[test]
fn dependency_reported_by_the_remote_side_lives_as_long_as_its_dependent() {
    converger_test_utils::init_logging();
    let (mut converger, connections) = converger_with_systems(&[1]);
    let connection = &connections[0];
    let orders = type_channel(1, 2);
    let accounts = type_channel(1, 1);
    connection.add_implicit_dependency(orders.clone(), accounts.clone(), None);

    let area = declare(&mut converger, &orders, None);
    settle(&mut converger, connection);

    assert_eq!(status(&converger, area), AreaOfInterestStatus::Loaded);
    assert_eq!(connection.subscribe_requests(), vec![orders.clone()]);
    let graph = converger.graph_mut();
    let dependent = graph.find_subscription(&orders).unwrap();
    let dependency = graph
        .find_subscription(&accounts)
        .expect("implicit subscription should be recorded");
    assert!(!graph.subscription(dependency).unwrap().is_explicit());
    assert_eq!(graph.subscription_requirements(dependent).unwrap(), vec![dependency]);

    converger.areas_mut().dispose_area_of_interest(area).unwrap();
    settle(&mut converger, connection);

    assert_eq!(converger.graph().subscription_count(), 0);
    assert!(!connection
        .requests()
        .contains(&RecordedRequest::Unsubscribe(accounts)));
}

#[test]
fn failed_subscribe_waits_for_the_area_to_be_declared_again() {
    converger_test_utils::init_logging();
    let (mut converger, connections) = converger_with_systems(&[1]);
    let connection = &connections[0];
    let restricted = type_channel(1, 9);
    let area = declare(&mut converger, &restricted, None);
    converger.process_events();

    assert!(connection.fail_next("access denied"));
    converger.process_events();
    converger.mark_converge_incomplete();
    converger.process_events();

    let failed = converger.areas().area_of_interest(area).unwrap();
    assert_eq!(failed.status(), AreaOfInterestStatus::LoadFailed);
    assert_eq!(failed.last_error(), Some("access denied"));
    assert_eq!(connection.subscribe_requests().len(), 1);
    assert_eq!(converger.stats().remote_failures, 1);

    declare(&mut converger, &restricted, None);
    converger.process_events();

    assert_eq!(status(&converger, area), AreaOfInterestStatus::Loading);
    assert_eq!(connection.subscribe_requests().len(), 2);
}

#[test]
fn synchronous_completions_converge_in_one_drain() {
    converger_test_utils::init_logging();
    let (mut converger, connections) = converger_with_systems(&[1, 2]);
    for connection in &connections {
        connection.set_auto_complete(true);
    }
    let areas = [
        declare(&mut converger, &type_channel(1, 5), None),
        declare(&mut converger, &type_channel(1, 6), None),
        declare(&mut converger, &type_channel(2, 5), None),
    ];

    let passes = converger.process_events();

    assert!(passes >= 3);
    assert!(converger.is_converge_complete());
    for area in areas {
        assert_eq!(status(&converger, area), AreaOfInterestStatus::Loaded);
    }
    assert_eq!(connections[0].subscribe_requests().len(), 2);
    assert_eq!(connections[1].subscribe_requests(), vec![type_channel(2, 5)]);
}

#[test]
fn instances_of_one_channel_type_share_a_pass() {
    converger_test_utils::init_logging();
    let (mut converger, connections) = converger_with_systems(&[1]);
    let connection = &connections[0];

    converger.pause_and_run(|converger| {
        for root_id in 1..=3 {
            declare(converger, &instance_channel(1, 5, root_id), Some("Filter1"));
        }
        declare(converger, &type_channel(1, 6), None);
        assert!(connection.requests().is_empty());
    });

    assert_eq!(connection.subscribe_requests().len(), 3);
    assert!(connection
        .subscribe_requests()
        .iter()
        .all(|address| address.channel_id() == 5));
    assert_eq!(converger.stats().passes, 2);

    settle(&mut converger, connection);

    assert_eq!(connection.subscribe_requests().len(), 4);
}

#[test]
fn pre_converge_action_mirrors_a_watch_list() {
    converger_test_utils::init_logging();
    let (mut converger, connections) = converger_with_systems(&[1]);
    let connection = &connections[0];
    let watch_list = Rc::new(RefCell::new(vec![type_channel(1, 3)]));

    let watched = Rc::clone(&watch_list);
    converger.set_pre_converge_action(move |areas, _graph| {
        for address in watched.borrow().iter() {
            areas.create_or_update_area_of_interest(address.clone(), None);
        }
    });
    settle(&mut converger, connection);
    assert_eq!(connection.subscribe_requests(), vec![type_channel(1, 3)]);

    watch_list.borrow_mut().push(type_channel(1, 4));
    converger.mark_converge_incomplete();
    settle(&mut converger, connection);

    assert_eq!(
        connection.subscribe_requests(),
        vec![type_channel(1, 3), type_channel(1, 4)]
    );
    assert_eq!(converger.areas().len(), 2);
}
