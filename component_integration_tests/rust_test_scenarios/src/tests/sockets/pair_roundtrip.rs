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
use tracing::info;

#[derive(Serialize, Deserialize, Debug)]
struct TestInput {
    address: String,
    messages: Vec<String>,
}

pub struct PairRoundtrip;

impl Scenario for PairRoundtrip {
    fn name(&self) -> &str {
        "pair_roundtrip"
    }

    ///
    /// Sends each message from the binding socket, echoes it from the connecting one and waits for the echo.
    ///
    fn run(&self, input: &str) -> Result<(), String> {
        let logic: TestInput = test_input(input)?;
        let env = SocketEnv::from_json(input)?;

        let server = env.open(Protocol::Pair)?;
        let client = env.open(Protocol::Pair)?;
        server.bind(&logic.address).map_err(|e| e.to_string())?;
        client.connect(&logic.address).map_err(|e| e.to_string())?;

        env.event_loop.block_on(async {
            for message in &logic.messages {
                let sent = server.send(message.as_bytes()).await?;
                let request = client.recv().await?;
                client.send(&request).await?;
                let echo = server.recv().await?;

                info!(id = "pair", sent = sent, echo = String::from_utf8_lossy(&echo).as_ref());
            }
            Ok::<_, SocketError>(())
        })
        .map_err(|e| e.to_string())
    }
}
