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


use channel_converger::ConvergerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("unable to read scenario file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse scenario file: {0}")]
    Parse(#[from] json5::Error),

    #[error("invalid scenario: {0}")]
    Invalid(String),

    #[error(transparent)]
    Converger(#[from] ConvergerError),

    #[error("unable to render report: {0}")]
    Report(#[from] serde_json::Error),
}
