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
    topic: String,
    messages: Vec<String>,
}

pub struct PubSubTopic;

impl Scenario for PubSubTopic {
    fn name(&self) -> &str {
        "pub_sub_topic"
    }

    ///
    /// Publishes all messages, then receives the ones starting with `topic`.
    ///
    fn run(&self, input: &str) -> Result<(), String> {
        let logic: TestInput = test_input(input)?;
        let env = SocketEnv::from_json(input)?;

        let sub = env.open(Protocol::Sub)?;
        let publisher = env.open(Protocol::Pub)?;
        sub.bind(&logic.address).map_err(|e| e.to_string())?;
        sub.subscribe(logic.topic.as_bytes()).map_err(|e| e.to_string())?;
        publisher.connect(&logic.address).map_err(|e| e.to_string())?;

        let matching = logic.messages.iter().filter(|m| m.starts_with(&logic.topic)).count();

        env.event_loop.block_on(async {
            for message in &logic.messages {
                publisher.send(message.as_bytes()).await?;
            }

            for _ in 0..matching {
                let msg = sub.recv().await?;
                info!(id = "sub", topic = logic.topic.as_str(), message = String::from_utf8_lossy(&msg).as_ref());
            }
            Ok::<_, SocketError>(())
        })
        .map_err(|e| e.to_string())
    }
}
