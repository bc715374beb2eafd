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


mod scripted_connection;
pub use scripted_connection::{RecordedRequest, ScriptedConnection};

mod test_addresses;
pub use test_addresses::{instance_channel, type_channel};

mod test_setup;
pub use test_setup::{init_logging, unthrottled_config};
