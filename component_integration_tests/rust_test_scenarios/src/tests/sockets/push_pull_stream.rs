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

use crate::internals::socket_helper::{test_input, SocketEnv};
use test_scenarios_rust::scenario::Scenario;

use nnloop::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

#[derive(Serialize, Deserialize, Debug)]
struct TestInput {
    address: String,
    count: u32,
    interval_ms: u64,
}

pub struct PushPullStream;

impl Scenario for PushPullStream {
    fn name(&self) -> &str {
        "push_pull_stream"
    }

    ///
    /// A spawned task pushes `count` numbered messages, one every `interval_ms`. The main task pulls them in order.
    ///
    fn run(&self, input: &str) -> Result<(), String> {
        let logic: TestInput = test_input(input)?;
        let env = SocketEnv::from_json(input)?;

        let pull = env.open(Protocol::Pull)?;
        let push = env.open(Protocol::Push)?;
        pull.bind(&logic.address).map_err(|e| e.to_string())?;
        push.connect(&logic.address).map_err(|e| e.to_string())?;

        let handle = env.handle();
        let ticker = handle.clone();
        let (count, interval) = (logic.count, Duration::from_millis(logic.interval_ms));
        handle.spawn(async move {
            for index in 0..count {
                ticker.sleep(interval).await;
                if let Err(e) = push.send(&index.to_le_bytes()).await {
                    error!(id = "push", index = index, error = %e);
                    return;
                }
                info!(id = "push", index = index);
            }
        });

        env.event_loop.block_on(async {
            for expected in 0..logic.count {
                let msg = pull.recv().await.map_err(|e| e.to_string())?;
                let index = <[u8; 4]>::try_from(msg.as_slice())
                    .map(u32::from_le_bytes)
                    .map_err(|_| format!("Unexpected message of {} bytes", msg.len()))?;
                info!(id = "pull", index = index);

                if index != expected {
                    return Err(format!("Expected message {}, got {}", expected, index));
                }
            }
            Ok(())
        })
    }
}
