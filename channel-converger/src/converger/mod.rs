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

//! Reconciliation engine: plan, per-target outcomes, event intake.

pub(crate) mod converge_action;
pub(crate) mod engine;
pub(crate) mod event_queue;
pub(crate) mod invalidator;
pub(crate) mod plan;
