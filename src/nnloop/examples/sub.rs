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

//! Binds a SUB socket on tcp://localhost:5555 and prints every message of the "topic" topic.
//! A publisher to try it with: `nanocat --pub --connect tcp://localhost:5555 --data "topic hello" --interval 1`.

use foundation::prelude::*;
use logging_tracing::TracingLibraryBuilder;
use nnloop::prelude::*;

const ADDR: &str = "tcp://localhost:5555";

fn main() {
    let mut logger = TracingLibraryBuilder::new()
        .global_log_level(Level::INFO)
        .enable_logging(true)
        .build();
    logger.init_log_trace().unwrap();

    let event_loop = EventLoop::new().unwrap();
    let socket = Socket::new(NanomsgTransport::new(), event_loop.handle(), Domain::Sp, Protocol::Sub).unwrap();
    socket.bind(ADDR).unwrap();
    socket.subscribe(b"topic").unwrap();

    event_loop.block_on(async {
        loop {
            match socket.recv().await {
                Ok(msg) => info!("Received {:?}", String::from_utf8_lossy(&msg)),
                Err(e) => {
                    error!("Receive failed: {}", e);
                    break;
                }
            }
        }
    });
}
