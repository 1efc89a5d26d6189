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

//! Transport between sockets of the same thread, addressed as `inproc://<name>`.
//!
//! Supports `Pair`, `Push`/`Pull` and `Pub`/`Sub`. Messages are queued on the receiving socket; a full queue or a
//! missing peer makes send fail with `EAGAIN`, as a non-blocking native send would.

mod signal;

use super::{errno, Direction, Domain, EndpointId, MsgFlags, NativeRc, NativeResult, Protocol, RawMsg, SocketId, SocketOption, Transport};
use foundation::prelude::*;
use signal::Signal;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::os::fd::RawFd;
use std::ptr::NonNull;
use std::rc::Rc;

pub const DEFAULT_QUEUE_DEPTH: usize = 128;

const SCHEME: &str = "inproc://";

type Outcome<T> = Result<T, i32>;

///
/// Handle to an in-process message fabric. Clones share the same fabric, sockets of different fabrics never see
/// each other.
///
#[derive(Clone)]
pub struct InprocTransport {
    shared: Rc<Shared>,
}

struct Shared {
    registry: RefCell<Registry>,
    last_error: Cell<i32>,
}

struct Registry {
    sockets: HashMap<SocketId, InprocSocket>,
    bound: HashMap<String, SocketId>,
    waiting: HashMap<String, Vec<SocketId>>,
    next_socket: i32,
    next_endpoint: i32,
    queue_depth: usize,
}

struct InprocSocket {
    protocol: Protocol,
    peers: Vec<SocketId>,
    next_peer: usize,
    queue: VecDeque<Box<[u8]>>,
    subscriptions: Vec<Vec<u8>>,
    recv_signal: Option<Signal>,
    send_signal: Option<Signal>,
}

impl Default for InprocTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl InprocTransport {
    pub fn new() -> Self {
        Self::with_queue_depth(DEFAULT_QUEUE_DEPTH)
    }

    /// Fabric whose sockets hold at most `depth` undelivered messages each.
    pub fn with_queue_depth(depth: usize) -> Self {
        Self {
            shared: Rc::new(Shared {
                registry: RefCell::new(Registry {
                    sockets: HashMap::new(),
                    bound: HashMap::new(),
                    waiting: HashMap::new(),
                    next_socket: 0,
                    next_endpoint: 0,
                    queue_depth: depth.max(1),
                }),
                last_error: Cell::new(0),
            }),
        }
    }

    /// Number of messages queued for `socket`.
    pub fn queued(&self, socket: SocketId) -> usize {
        self.shared.registry.borrow().sockets.get(&socket).map_or(0, |s| s.queue.len())
    }

    fn outcome<T>(&self, result: Outcome<T>) -> NativeResult<T> {
        result.map_err(|code| {
            self.shared.last_error.set(code);
            NativeRc(-1)
        })
    }
}

fn endpoint_name(addr: &str) -> Outcome<&str> {
    match addr.strip_prefix(SCHEME) {
        Some(name) if !name.is_empty() => Ok(name),
        Some(_) => Err(errno::EINVAL),
        None if addr.contains("://") => Err(errno::EPROTONOSUPPORT),
        None => Err(errno::EINVAL),
    }
}

fn are_peers(a: Protocol, b: Protocol) -> bool {
    matches!(
        (a, b),
        (Protocol::Pair, Protocol::Pair)
            | (Protocol::Push, Protocol::Pull)
            | (Protocol::Pull, Protocol::Push)
            | (Protocol::Pub, Protocol::Sub)
            | (Protocol::Sub, Protocol::Pub)
    )
}

impl InprocSocket {
    fn open(protocol: Protocol) -> Outcome<Self> {
        let signal = |needed: bool| -> Outcome<Option<Signal>> {
            if needed {
                Signal::new().map(Some).map_err(|e| e.raw_os_error().unwrap_or(errno::EMFILE))
            } else {
                Ok(None)
            }
        };

        Ok(Self {
            protocol,
            peers: Vec::new(),
            next_peer: 0,
            queue: VecDeque::new(),
            subscriptions: Vec::new(),
            recv_signal: signal(protocol.can_recv())?,
            send_signal: signal(protocol.can_send())?,
        })
    }

    fn accepts(&self, msg: &[u8]) -> bool {
        self.protocol != Protocol::Sub || self.subscriptions.iter().any(|topic| msg.starts_with(topic))
    }

    fn enqueue(&mut self, msg: Box<[u8]>) {
        self.queue.push_back(msg);
        if let Some(signal) = self.recv_signal.as_mut() {
            signal.raise();
        }
    }

    fn dequeue(&mut self) -> Option<Box<[u8]>> {
        let msg = self.queue.pop_front();
        if self.queue.is_empty() {
            if let Some(signal) = self.recv_signal.as_mut() {
                signal.clear();
            }
        }
        msg
    }
}

impl Registry {
    fn socket(&self, id: SocketId) -> Outcome<&InprocSocket> {
        self.sockets.get(&id).ok_or(errno::EBADF)
    }

    fn socket_mut(&mut self, id: SocketId) -> Outcome<&mut InprocSocket> {
        self.sockets.get_mut(&id).ok_or(errno::EBADF)
    }

    fn endpoint(&mut self) -> EndpointId {
        self.next_endpoint += 1;
        EndpointId(self.next_endpoint)
    }

    fn link(&mut self, a: SocketId, b: SocketId) {
        if a == b {
            return;
        }

        let (Some(sa), Some(sb)) = (self.sockets.get(&a), self.sockets.get(&b)) else {
            return;
        };

        if !are_peers(sa.protocol, sb.protocol) {
            debug!("inproc: {:?} and {:?} cannot talk to each other, not linked", sa.protocol, sb.protocol);
            return;
        }

        if sa.protocol == Protocol::Pair && (!sa.peers.is_empty() || !sb.peers.is_empty()) {
            debug!("inproc: pair socket already has a peer, {:?} not linked to {:?}", a, b);
            return;
        }

        for (from, to) in [(a, b), (b, a)] {
            if let Some(s) = self.sockets.get_mut(&from) {
                if !s.peers.contains(&to) {
                    s.peers.push(to);
                }
            }
        }

        trace!("inproc: linked {:?} with {:?}", a, b);
    }

    fn has_room(&self, id: SocketId) -> bool {
        self.sockets.get(&id).is_some_and(|s| s.queue.len() < self.queue_depth)
    }

    fn deliver(&mut self, to: SocketId, msg: &[u8]) -> bool {
        if !self.has_room(to) {
            return false;
        }

        match self.sockets.get_mut(&to) {
            Some(peer) if peer.accepts(msg) => {
                peer.enqueue(msg.into());
                true
            }
            _ => false,
        }
    }

    fn send(&mut self, id: SocketId, data: &[u8]) -> Outcome<usize> {
        let sock = self.socket(id)?;
        if !sock.protocol.can_send() {
            return Err(errno::ENOTSUP);
        }

        let peers = sock.peers.clone();
        let start = sock.next_peer;

        if sock.protocol == Protocol::Pub {
            // Fan out, subscribers that are full or not interested miss the message.
            for peer in peers {
                self.deliver(peer, data);
            }
            return Ok(data.len());
        }

        for offset in 0..peers.len() {
            let index = (start + offset) % peers.len();
            if self.has_room(peers[index]) {
                self.deliver(peers[index], data);
                self.socket_mut(id)?.next_peer = index + 1;
                return Ok(data.len());
            }
        }

        Err(errno::EAGAIN)
    }

    fn can_send_now(&self, id: SocketId) -> Outcome<bool> {
        let sock = self.socket(id)?;

        Ok(match sock.protocol {
            Protocol::Pub => true,
            p if p.can_send() => sock.peers.iter().any(|peer| self.has_room(*peer)),
            _ => false,
        })
    }
}

impl Transport for InprocTransport {
    fn open(&self, _domain: Domain, protocol: Protocol) -> NativeResult<SocketId> {
        let result = match protocol {
            Protocol::Pair | Protocol::Push | Protocol::Pull | Protocol::Pub | Protocol::Sub => InprocSocket::open(protocol).map(|socket| {
                let mut reg = self.shared.registry.borrow_mut();
                reg.next_socket += 1;
                let id = SocketId(reg.next_socket);
                reg.sockets.insert(id, socket);
                id
            }),
            _ => Err(errno::EPROTONOSUPPORT),
        };

        self.outcome(result)
    }

    fn close(&self, socket: SocketId) -> NativeResult<()> {
        let mut reg = self.shared.registry.borrow_mut();

        let result = match reg.sockets.remove(&socket) {
            Some(closed) => {
                for peer in closed.peers {
                    if let Some(s) = reg.sockets.get_mut(&peer) {
                        s.peers.retain(|p| *p != socket);
                    }
                }
                reg.bound.retain(|_, owner| *owner != socket);
                for waiting in reg.waiting.values_mut() {
                    waiting.retain(|s| *s != socket);
                }
                Ok(())
            }
            None => Err(errno::EBADF),
        };

        drop(reg);
        self.outcome(result)
    }

    fn bind(&self, socket: SocketId, addr: &str) -> NativeResult<EndpointId> {
        let mut reg = self.shared.registry.borrow_mut();

        let result = endpoint_name(addr).and_then(|name| {
            reg.socket(socket)?;
            if reg.bound.contains_key(name) {
                return Err(errno::EADDRINUSE);
            }

            reg.bound.insert(name.to_string(), socket);
            for connector in reg.waiting.remove(name).unwrap_or_default() {
                reg.link(socket, connector);
            }
            Ok(reg.endpoint())
        });

        drop(reg);
        self.outcome(result)
    }

    fn connect(&self, socket: SocketId, addr: &str) -> NativeResult<EndpointId> {
        let mut reg = self.shared.registry.borrow_mut();

        let result = endpoint_name(addr).and_then(|name| {
            reg.socket(socket)?;
            match reg.bound.get(name).copied() {
                Some(listener) => reg.link(socket, listener),
                None => reg.waiting.entry(name.to_string()).or_default().push(socket),
            }
            Ok(reg.endpoint())
        });

        drop(reg);
        self.outcome(result)
    }

    fn set_option(&self, socket: SocketId, option: &SocketOption) -> NativeResult<()> {
        let mut reg = self.shared.registry.borrow_mut();

        let result = reg.socket_mut(socket).and_then(|sock| {
            if sock.protocol != Protocol::Sub {
                return Err(errno::ENOPROTOOPT);
            }

            match option {
                SocketOption::Subscribe(topic) => {
                    if !sock.subscriptions.contains(topic) {
                        sock.subscriptions.push(topic.clone());
                    }
                    Ok(())
                }
                SocketOption::Unsubscribe(topic) => match sock.subscriptions.iter().position(|t| t == topic) {
                    Some(index) => {
                        sock.subscriptions.remove(index);
                        Ok(())
                    }
                    None => Err(errno::EINVAL),
                },
            }
        });

        drop(reg);
        self.outcome(result)
    }

    fn readiness_fd(&self, socket: SocketId, direction: Direction) -> NativeResult<RawFd> {
        let reg = self.shared.registry.borrow();

        let result = reg.socket(socket).and_then(|sock| {
            let fd = match direction {
                Direction::Receive => sock.recv_signal.as_ref().map(Signal::readable_fd),
                Direction::Send => sock.send_signal.as_ref().map(Signal::writable_fd),
            };
            fd.ok_or(errno::ENOPROTOOPT)
        });

        drop(reg);
        self.outcome(result)
    }

    fn poll_ready(&self, socket: SocketId, direction: Direction) -> NativeResult<bool> {
        let reg = self.shared.registry.borrow();

        let result = match direction {
            Direction::Receive => reg.socket(socket).map(|sock| !sock.queue.is_empty()),
            Direction::Send => reg.can_send_now(socket),
        };

        drop(reg);
        self.outcome(result)
    }

    fn send(&self, socket: SocketId, data: &[u8], _flags: MsgFlags) -> NativeResult<usize> {
        // Never blocks, the DONTWAIT flag is implied.
        let result = self.shared.registry.borrow_mut().send(socket, data);
        self.outcome(result)
    }

    fn recv(&self, socket: SocketId, _flags: MsgFlags) -> NativeResult<RawMsg> {
        let mut reg = self.shared.registry.borrow_mut();

        let result = reg.socket_mut(socket).and_then(|sock| {
            if !sock.protocol.can_recv() {
                return Err(errno::ENOTSUP);
            }

            let msg = sock.dequeue().ok_or(errno::EAGAIN)?;
            let len = msg.len();
            let ptr = NonNull::from(Box::leak(msg)).cast::<u8>();
            Ok(RawMsg { ptr, len })
        });

        drop(reg);
        self.outcome(result)
    }

    unsafe fn release(&self, msg: RawMsg) {
        // SAFETY: the caller hands back a message produced by `recv`, which leaked a `Box<[u8]>` of `len` bytes
        drop(unsafe { Box::from_raw(::core::ptr::slice_from_raw_parts_mut(msg.ptr.as_ptr(), msg.len)) });
    }

    fn last_error(&self) -> i32 {
        self.shared.last_error.get()
    }

    fn error_string(&self, code: i32) -> String {
        errno::describe(code)
    }
}
