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


use channel_converger::{
    AreaOfInterestKey, AreaOfInterestStatus, ChannelAddress, ChannelFilter, ConnectionState,
    Converger,
};
use converger_test_utils::{unthrottled_config, ScriptedConnection};

/// An active converger with one required, connected system per id.
pub(crate) fn converger_with_systems(system_ids: &[u32]) -> (Converger, Vec<ScriptedConnection>) {
    let mut converger = Converger::new(unthrottled_config());
    converger.activate();

    let connections: Vec<ScriptedConnection> = system_ids
        .iter()
        .map(|system_id| {
            let connection = ScriptedConnection::new(
                *system_id,
                converger.event_queue(),
                ConnectionState::Connected,
            );
            converger
                .connector_mut()
                .add_connection(*system_id, connection.boxed(), true)
                .expect("system ids should be unique");
            connection
        })
        .collect();
    converger.process_events();

    (converger, connections)
}

#[allow(dead_code)]
pub(crate) fn declare(
    converger: &mut Converger,
    address: &ChannelAddress,
    filter: Option<&str>,
) -> AreaOfInterestKey {
    converger
        .areas_mut()
        .create_or_update_area_of_interest(address.clone(), filter.map(ChannelFilter::from))
}

#[allow(dead_code)]
pub(crate) fn status(converger: &Converger, area_of_interest: AreaOfInterestKey) -> AreaOfInterestStatus {
    converger
        .areas()
        .area_of_interest(area_of_interest)
        .expect("area of interest should not be disposed")
        .status()
}

/// Completes every request the connection has pending, then lets the converger react,
/// until nothing is left to complete.
#[allow(dead_code)]
pub(crate) fn settle(converger: &mut Converger, connection: &ScriptedConnection) {
    converger.process_events();
    while connection.complete_all() > 0 {
        converger.process_events();
    }
}
