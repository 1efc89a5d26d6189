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
use nnloop::transport::errno;
use std::rc::Rc;
use std::time::{Duration, Instant};

type InprocSocket = Socket<InprocTransport, LocalHandle>;

fn open(fabric: &InprocTransport, event_loop: &EventLoop, protocol: Protocol) -> InprocSocket {
    Socket::builder(fabric.clone(), event_loop.handle(), protocol)
        .retry_policy(RetryPolicy::Fixed { delay_ms: 10 })
        .build()
        .unwrap()
}

#[test]
fn pair_recv_awaited_before_send() {
    let event_loop = EventLoop::new().unwrap();
    let fabric = InprocTransport::new();
    let a = open(&fabric, &event_loop, Protocol::Pair);
    let b = open(&fabric, &event_loop, Protocol::Pair);
    a.bind("inproc://hello").unwrap();
    b.connect("inproc://hello").unwrap();

    let handle = event_loop.handle();
    let sender = handle.clone();
    handle.spawn(async move {
        sender.sleep(Duration::from_millis(20)).await;
        assert_eq!(b.send(b"hello").await, Ok(5));
    });

    assert_eq!(event_loop.block_on(a.recv()), Ok(b"hello".to_vec()));
}

#[test]
fn pair_send_completed_before_recv() {
    let event_loop = EventLoop::new().unwrap();
    let fabric = InprocTransport::new();
    let a = open(&fabric, &event_loop, Protocol::Pair);
    let b = open(&fabric, &event_loop, Protocol::Pair);
    a.bind("inproc://hello").unwrap();
    b.connect("inproc://hello").unwrap();

    assert_eq!(event_loop.block_on(b.send(b"hello")), Ok(5));

    assert_eq!(event_loop.block_on(a.recv()), Ok(b"hello".to_vec()));
    assert_eq!(fabric.queued(a.id()), 0);
}

#[test]
fn pair_delivers_arbitrary_buffers_exactly_once() {
    let event_loop = EventLoop::new().unwrap();
    let fabric = InprocTransport::new();
    let a = open(&fabric, &event_loop, Protocol::Pair);
    let b = open(&fabric, &event_loop, Protocol::Pair);
    a.bind("inproc://buffers").unwrap();
    b.connect("inproc://buffers").unwrap();

    let all_bytes: Vec<u8> = (0..=255).collect();
    let large: Vec<u8> = (0..64 * 1024).map(|i| (i % 251) as u8).collect();
    let buffers: [&[u8]; 5] = [b"", &[0x7f], &all_bytes, b"\0nul\0inside\0", &large];

    for buffer in buffers {
        assert_eq!(event_loop.block_on(b.send(buffer)), Ok(buffer.len()));

        assert_eq!(event_loop.block_on(a.recv()), Ok(buffer.to_vec()));
        assert_eq!(fabric.queued(a.id()), 0);
    }

    for buffer in buffers {
        assert_eq!(event_loop.block_on(a.send(buffer)), Ok(buffer.len()));
    }
    for buffer in buffers {
        assert_eq!(event_loop.block_on(b.recv()), Ok(buffer.to_vec()));
    }
    assert_eq!(fabric.queued(b.id()), 0);
}

#[test]
fn pair_talks_both_ways() {
    let event_loop = EventLoop::new().unwrap();
    let fabric = InprocTransport::new();
    let a = open(&fabric, &event_loop, Protocol::Pair);
    let b = open(&fabric, &event_loop, Protocol::Pair);
    a.bind("inproc://ping").unwrap();
    b.connect("inproc://ping").unwrap();

    let reply = event_loop.block_on(async {
        a.send(b"ping").await?;
        let ping = b.recv().await?;
        b.send(&[ping.as_slice(), b"-pong"].concat()).await?;
        a.recv().await
    });

    assert_eq!(reply, Ok(b"ping-pong".to_vec()));
}

#[test]
fn push_pull_stream_keeps_order() {
    let event_loop = EventLoop::new().unwrap();
    let fabric = InprocTransport::new();
    let pull = open(&fabric, &event_loop, Protocol::Pull);
    let push = open(&fabric, &event_loop, Protocol::Push);
    pull.bind("inproc://stream").unwrap();
    push.connect("inproc://stream").unwrap();

    let handle = event_loop.handle();
    let sender = handle.clone();
    handle.spawn(async move {
        for i in 0..5_u8 {
            sender.sleep(Duration::from_millis(5)).await;
            push.send(&[i]).await.unwrap();
        }
    });

    let received = event_loop.block_on(async {
        let mut received = Vec::new();
        for _ in 0..5 {
            received.push(pull.recv().await.unwrap()[0]);
        }
        received
    });

    assert_eq!(received, vec![0, 1, 2, 3, 4]);
    assert_eq!(event_loop.pending_tasks(), 0);
}

#[test]
fn sub_receives_only_subscribed_topic() {
    let event_loop = EventLoop::new().unwrap();
    let fabric = InprocTransport::new();
    let sub = open(&fabric, &event_loop, Protocol::Sub);
    let publisher = open(&fabric, &event_loop, Protocol::Pub);
    sub.bind("inproc://news").unwrap();
    sub.subscribe(b"topic").unwrap();
    publisher.connect("inproc://news").unwrap();

    let received = event_loop.block_on(async {
        publisher.send(b"other:0").await?;
        publisher.send(b"topic:1").await?;
        sub.recv().await
    });

    assert_eq!(received, Ok(b"topic:1".to_vec()));
}

#[test]
fn send_retries_until_peer_appears() {
    let event_loop = EventLoop::new().unwrap();
    let fabric = InprocTransport::new();
    let push = open(&fabric, &event_loop, Protocol::Push);
    let pull = Rc::new(open(&fabric, &event_loop, Protocol::Pull));
    push.connect("inproc://late").unwrap();

    let handle = event_loop.handle();
    let binder = handle.clone();
    let late = Rc::clone(&pull);
    handle.spawn(async move {
        binder.sleep(Duration::from_millis(50)).await;
        late.bind("inproc://late").unwrap();
    });

    let started = Instant::now();
    assert_eq!(event_loop.block_on(push.send(b"waiting")), Ok(7));
    assert!(started.elapsed() >= Duration::from_millis(50));

    assert_eq!(event_loop.block_on(pull.recv()), Ok(b"waiting".to_vec()));
}

#[test]
fn recv_on_send_only_socket_fails() {
    let event_loop = EventLoop::new().unwrap();
    let fabric = InprocTransport::new();
    let push = open(&fabric, &event_loop, Protocol::Push);

    let err = event_loop.block_on(push.recv()).unwrap_err();

    assert_eq!(err.code(), Some(errno::ENOTSUP));
    assert_eq!(event_loop.handle().registered_fds(), 0);
}

#[test]
fn unread_messages_do_not_spin_the_loop() {
    let event_loop = EventLoop::new().unwrap();
    let fabric = InprocTransport::new();
    let a = open(&fabric, &event_loop, Protocol::Pair);
    let b = open(&fabric, &event_loop, Protocol::Pair);
    a.bind("inproc://idle").unwrap();
    b.connect("inproc://idle").unwrap();

    let handle = event_loop.handle();
    event_loop.block_on(async {
        b.send(b"unread").await.unwrap();
        handle.sleep(Duration::from_millis(30)).await;
    });

    // The reader was dropped on the first wakeup and is re-armed by a timer.
    assert!(handle.pending_timers() <= 1);
    assert_eq!(event_loop.block_on(a.recv()), Ok(b"unread".to_vec()));
}

#[test]
fn closed_socket_leaves_no_registrations() {
    let event_loop = EventLoop::new().unwrap();
    let fabric = InprocTransport::new();
    let a = open(&fabric, &event_loop, Protocol::Pair);
    a.bind("inproc://closed").unwrap();
    assert_eq!(event_loop.handle().registered_fds(), 1);

    drop(a);

    assert_eq!(event_loop.handle().registered_fds(), 0);
    let b = open(&fabric, &event_loop, Protocol::Pair);
    assert!(b.bind("inproc://closed").is_ok());
}
