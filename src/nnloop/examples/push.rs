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

//! Connects a PUSH socket to tcp://localhost:5555 and sends a message every second.

use foundation::prelude::*;
use logging_tracing::TracingLibraryBuilder;
use nnloop::prelude::*;
use std::time::Duration;

const ADDR: &str = "tcp://localhost:5555";

fn main() {
    let mut logger = TracingLibraryBuilder::new()
        .global_log_level(Level::INFO)
        .enable_logging(true)
        .build();
    logger.init_log_trace().unwrap();

    let event_loop = EventLoop::new().unwrap();
    let handle = event_loop.handle();
    let socket = Socket::new(NanomsgTransport::new(), handle.clone(), Domain::Sp, Protocol::Push).unwrap();
    socket.connect(ADDR).unwrap();

    event_loop.block_on(async {
        for i in 0_u64.. {
            let msg = format!("topic message {}", i);
            match socket.send(msg.as_bytes()).await {
                Ok(n) => info!("Sent {} bytes", n),
                Err(e) => {
                    error!("Send failed: {}", e);
                    break;
                }
            }
            handle.sleep(Duration::from_secs(1)).await;
        }
    });
}
