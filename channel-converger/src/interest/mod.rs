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

//! Desired and actual interest: scopes, subscriptions, references and areas of interest.

pub(crate) mod area_of_interest;
pub(crate) mod events;
pub(crate) mod graph;
pub(crate) mod keys;
pub(crate) mod reference;
pub(crate) mod scope;
pub(crate) mod subscription;
