//
// Copyright (c) 2025 Contributors to the Eclipse Foundation
//
// See the NOTICE file(s) distributed with this work for additional
// information regarding copyright ownership.
//
// This program and the accompanying materials are made available under the
// terms of the Apache License Version 2.0 which is available at
// <https://www.apache.org/licenses/LICENSE-2.0>
//
// SPDX-License-Identifier: Apache-2.0
//

pub use crate::types::*;

#[cfg(not(any(feature = "tracing", feature = "log")))]
compile_error!("At least one of features 'tracing' or 'log' must be enabled!");

#[cfg(feature = "tracing")]
pub use tracing::{debug, error, info, trace, warn, Level};

#[cfg(all(feature = "log", not(feature = "tracing")))]
pub use log::{debug, error, info, trace, warn, Level};
