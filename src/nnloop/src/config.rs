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

use ::core::time::Duration;
use serde::{Deserialize, Serialize};

///
/// Delay applied before a registration is re-armed after the transport reported a transient unavailability.
///
/// `attempt` counts the retries of one operation, starting at 0. It is reset once the operation resolves.
///
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetryPolicy {
    Fixed { delay_ms: u64 },
    Linear { initial_ms: u64, step_ms: u64, max_ms: u64 },
    Exponential { initial_ms: u64, factor: u32, max_ms: u64 },
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::Fixed { delay_ms: 1000 }
    }
}

impl RetryPolicy {
    pub fn delay(&self, attempt: u32) -> Duration {
        let ms = match *self {
            RetryPolicy::Fixed { delay_ms } => delay_ms,
            RetryPolicy::Linear { initial_ms, step_ms, max_ms } => initial_ms.saturating_add(step_ms.saturating_mul(attempt as u64)).min(max_ms),
            RetryPolicy::Exponential { initial_ms, factor, max_ms } => {
                let multiplier = (factor as u64).checked_pow(attempt).unwrap_or(u64::MAX);
                initial_ms.saturating_mul(multiplier).min(max_ms)
            }
        };

        Duration::from_millis(ms)
    }
}

///
/// Per socket configuration, set through [`crate::SocketBuilder`].
///
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketConfig {
    pub retry: RetryPolicy,

    /// Try a zero timeout writability poll and an immediate send before suspending.
    pub optimistic_send: bool,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            optimistic_send: true,
        }
    }
}
