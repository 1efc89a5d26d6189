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

use foundation::prelude::*;
use logging_tracing::TracingLibraryBuilder;
use nnloop::prelude::*;
use std::time::Duration;

fn main() {
    let mut logger = TracingLibraryBuilder::new()
        .global_log_level(Level::DEBUG)
        .enable_logging(true)
        .build();
    logger.init_log_trace().unwrap();
    let _span = logger.create_span().entered();

    let event_loop = EventLoop::new().unwrap();
    let handle = event_loop.handle();
    let fabric = InprocTransport::new();

    let server = Socket::new(fabric.clone(), handle.clone(), Domain::Sp, Protocol::Pair).unwrap();
    let client = Socket::new(fabric, handle.clone(), Domain::Sp, Protocol::Pair).unwrap();
    server.bind("inproc://demo").unwrap();
    client.connect("inproc://demo").unwrap();

    let ticker = handle.clone();
    handle.spawn(async move {
        for i in 0..3 {
            ticker.sleep(Duration::from_millis(200)).await;
            let msg = format!("hello {}", i);
            match client.send(msg.as_bytes()).await {
                Ok(n) => info!("Sent {} bytes", n),
                Err(e) => error!("Send failed: {}", e),
            }
        }
    });

    event_loop.block_on(async {
        for _ in 0..3 {
            match server.recv().await {
                Ok(msg) => info!("Received {:?}", String::from_utf8_lossy(&msg)),
                Err(e) => error!("Receive failed: {}", e),
            }
        }
    });
}
