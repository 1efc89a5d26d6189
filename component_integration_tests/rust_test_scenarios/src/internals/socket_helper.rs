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

use nnloop::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

pub type InprocSocket = Socket<InprocTransport, LocalHandle>;

/// Event loop configuration.
#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(default)]
pub struct LoopConfig {
    pub fd_capacity: Option<usize>,
}

///
/// Loop, in-process fabric and socket configuration shared by the sockets of one scenario.
///
/// Read from the `loop` and `socket` fields of the input, both optional.
///
pub struct SocketEnv {
    pub event_loop: EventLoop,
    fabric: InprocTransport,
    config: SocketConfig,
}

impl SocketEnv {
    pub fn from_json(input: &str) -> Result<Self, String> {
        let v: Value = serde_json::from_str(input).map_err(|e| format!("Failed to parse input string: {}", e))?;
        let loop_config: LoopConfig = field_or_default(&v, "loop")?;
        let config: SocketConfig = field_or_default(&v, "socket")?;

        debug!("Creating event loop with {:?}, sockets with {:?}", loop_config, config);

        let event_loop = match loop_config.fd_capacity {
            Some(capacity) => EventLoop::with_capacity(capacity),
            None => EventLoop::new(),
        }
        .map_err(|e| e.to_string())?;

        Ok(Self {
            event_loop,
            fabric: InprocTransport::new(),
            config,
        })
    }

    pub fn handle(&self) -> LocalHandle {
        self.event_loop.handle()
    }

    pub fn open(&self, protocol: Protocol) -> Result<InprocSocket, String> {
        Socket::builder(self.fabric.clone(), self.event_loop.handle(), protocol)
            .config(self.config.clone())
            .build()
            .map_err(|e| e.to_string())
    }
}

fn field_or_default<T: for<'de> Deserialize<'de> + Default>(v: &Value, field: &str) -> Result<T, String> {
    match &v[field] {
        Value::Null => Ok(T::default()),
        value => serde_json::from_value(value.clone()).map_err(|e| format!("Failed to parse \"{}\" field: {}", field, e)),
    }
}

/// Parses the mandatory `test` field of the input.
pub fn test_input<T: for<'de> Deserialize<'de>>(input: &str) -> Result<T, String> {
    let v: Value = serde_json::from_str(input).map_err(|e| format!("Failed to parse input string: {}", e))?;
    serde_json::from_value(v["test"].clone()).map_err(|e| format!("Failed to parse \"test\" field: {}", e))
}
