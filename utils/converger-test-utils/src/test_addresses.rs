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


use channel_converger::ChannelAddress;

pub fn type_channel(system_id: u32, channel_id: u32) -> ChannelAddress {
    ChannelAddress::new(system_id, channel_id)
}

pub fn instance_channel(system_id: u32, channel_id: u32, root_id: u32) -> ChannelAddress {
    ChannelAddress::instance(system_id, channel_id, root_id)
}
