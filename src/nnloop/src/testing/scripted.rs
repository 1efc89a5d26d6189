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

use crate::transport::{errno, Direction, Domain, EndpointId, MsgFlags, NativeRc, NativeResult, Protocol, RawMsg, SocketId, SocketOption, Transport};
use ::core::ptr::NonNull;
use ::testing::script::{Script, ScriptBuilder};
use std::cell::{Cell, RefCell};
use std::os::fd::RawFd;
use std::rc::Rc;

/// Receive descriptor reported by default.
pub const RECV_FD: RawFd = 100;
/// Send descriptor reported by default.
pub const SEND_FD: RawFd = 101;

///
/// A [`Transport`] whose send, receive and writability poll return scripted results, and which records how it was
/// used. Errors are scripted as the error code the transport reports through `last_error`.
///
/// When a script runs out, send and receive report `EAGAIN` and the writability poll reports not ready.
///
#[derive(Clone)]
pub struct ScriptedTransport {
    inner: Rc<ScriptedInner>,
}

struct ScriptedInner {
    recv_fd: Option<RawFd>,
    send_fd: Option<RawFd>,
    open_error: Option<i32>,
    endpoint_error: Option<i32>,

    send: RefCell<Script<Result<usize, i32>>>,
    recv: RefCell<Script<Result<Vec<u8>, i32>>>,
    poll_ready: RefCell<Script<Result<bool, i32>>>,

    last_error: Cell<i32>,
    fd_queries: RefCell<Vec<Direction>>,
    sent: RefCell<Vec<(Vec<u8>, MsgFlags)>>,
    recv_flags: RefCell<Vec<MsgFlags>>,
    options: RefCell<Vec<SocketOption>>,
    received: Cell<usize>,
    released: Cell<usize>,
    closed: Cell<usize>,
}

pub struct ScriptedTransportBuilder {
    recv_fd: Option<RawFd>,
    send_fd: Option<RawFd>,
    open_error: Option<i32>,
    endpoint_error: Option<i32>,
    send: Vec<Result<usize, i32>>,
    recv: Vec<Result<Vec<u8>, i32>>,
    poll_ready: Vec<Result<bool, i32>>,
}

impl Default for ScriptedTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedTransportBuilder {
    pub fn new() -> Self {
        Self {
            recv_fd: Some(RECV_FD),
            send_fd: Some(SEND_FD),
            open_error: None,
            endpoint_error: None,
            send: Vec::new(),
            recv: Vec::new(),
            poll_ready: Vec::new(),
        }
    }

    /// The socket has no descriptor for `direction`, querying it fails with `ENOPROTOOPT`.
    pub fn unsupported(mut self, direction: Direction) -> Self {
        match direction {
            Direction::Receive => self.recv_fd = None,
            Direction::Send => self.send_fd = None,
        }
        self
    }

    pub fn open_error(mut self, code: i32) -> Self {
        self.open_error = Some(code);
        self
    }

    /// Bind and connect fail with `code`.
    pub fn endpoint_error(mut self, code: i32) -> Self {
        self.endpoint_error = Some(code);
        self
    }

    pub fn send_results(mut self, results: Vec<Result<usize, i32>>) -> Self {
        self.send.extend(results);
        self
    }

    pub fn recv_results(mut self, results: Vec<Result<Vec<u8>, i32>>) -> Self {
        self.recv.extend(results);
        self
    }

    pub fn poll_ready_results(mut self, results: Vec<Result<bool, i32>>) -> Self {
        self.poll_ready.extend(results);
        self
    }

    pub fn build(self) -> ScriptedTransport {
        fn script<T>(values: Vec<T>, fallback: T) -> RefCell<Script<T>> {
            let builder = values.into_iter().fold(ScriptBuilder::new(), |builder, value| builder.will_once(value));
            RefCell::new(builder.will_repeatedly(fallback).unchecked().build())
        }

        ScriptedTransport {
            inner: Rc::new(ScriptedInner {
                recv_fd: self.recv_fd,
                send_fd: self.send_fd,
                open_error: self.open_error,
                endpoint_error: self.endpoint_error,
                send: script(self.send, Err(errno::EAGAIN)),
                recv: script(self.recv, Err(errno::EAGAIN)),
                poll_ready: script(self.poll_ready, Ok(false)),
                last_error: Cell::new(0),
                fd_queries: RefCell::new(Vec::new()),
                sent: RefCell::new(Vec::new()),
                recv_flags: RefCell::new(Vec::new()),
                options: RefCell::new(Vec::new()),
                received: Cell::new(0),
                released: Cell::new(0),
                closed: Cell::new(0),
            }),
        }
    }
}

impl ScriptedTransport {
    pub fn set_last_error(&self, code: i32) {
        self.inner.last_error.set(code);
    }

    /// Payloads and flags of every send attempt, successful or not.
    pub fn sent(&self) -> Vec<(Vec<u8>, MsgFlags)> {
        self.inner.sent.borrow().clone()
    }

    pub fn send_calls(&self) -> usize {
        self.inner.send.borrow().call_count()
    }

    pub fn recv_calls(&self) -> usize {
        self.inner.recv.borrow().call_count()
    }

    pub fn recv_flags(&self) -> Vec<MsgFlags> {
        self.inner.recv_flags.borrow().clone()
    }

    pub fn poll_ready_calls(&self) -> usize {
        self.inner.poll_ready.borrow().call_count()
    }

    pub fn fd_queries(&self, direction: Direction) -> usize {
        self.inner.fd_queries.borrow().iter().filter(|d| **d == direction).count()
    }

    pub fn options(&self) -> Vec<SocketOption> {
        self.inner.options.borrow().clone()
    }

    /// Messages handed out by successful receives.
    pub fn received(&self) -> usize {
        self.inner.received.get()
    }

    pub fn released(&self) -> usize {
        self.inner.released.get()
    }

    pub fn closed(&self) -> usize {
        self.inner.closed.get()
    }

    fn fail<T>(&self, code: i32) -> NativeResult<T> {
        self.inner.last_error.set(code);
        Err(NativeRc(-1))
    }
}

impl Transport for ScriptedTransport {
    fn open(&self, _domain: Domain, _protocol: Protocol) -> NativeResult<SocketId> {
        match self.inner.open_error {
            Some(code) => self.fail(code),
            None => Ok(SocketId(7)),
        }
    }

    fn close(&self, _socket: SocketId) -> NativeResult<()> {
        self.inner.closed.set(self.inner.closed.get() + 1);
        Ok(())
    }

    fn bind(&self, _socket: SocketId, _addr: &str) -> NativeResult<EndpointId> {
        match self.inner.endpoint_error {
            Some(code) => self.fail(code),
            None => Ok(EndpointId(1)),
        }
    }

    fn connect(&self, socket: SocketId, addr: &str) -> NativeResult<EndpointId> {
        self.bind(socket, addr)
    }

    fn set_option(&self, _socket: SocketId, option: &SocketOption) -> NativeResult<()> {
        self.inner.options.borrow_mut().push(option.clone());
        Ok(())
    }

    fn readiness_fd(&self, _socket: SocketId, direction: Direction) -> NativeResult<RawFd> {
        self.inner.fd_queries.borrow_mut().push(direction);

        let fd = match direction {
            Direction::Receive => self.inner.recv_fd,
            Direction::Send => self.inner.send_fd,
        };

        match fd {
            Some(fd) => Ok(fd),
            None => self.fail(errno::ENOPROTOOPT),
        }
    }

    fn poll_ready(&self, _socket: SocketId, _direction: Direction) -> NativeResult<bool> {
        let result = self.inner.poll_ready.borrow_mut().next();
        result.or_else(|code| self.fail(code))
    }

    fn send(&self, _socket: SocketId, data: &[u8], flags: MsgFlags) -> NativeResult<usize> {
        self.inner.sent.borrow_mut().push((data.to_vec(), flags));

        let result = self.inner.send.borrow_mut().next();
        result.or_else(|code| self.fail(code))
    }

    fn recv(&self, _socket: SocketId, flags: MsgFlags) -> NativeResult<RawMsg> {
        self.inner.recv_flags.borrow_mut().push(flags);

        let result = self.inner.recv.borrow_mut().next();
        match result {
            Ok(bytes) => {
                self.inner.received.set(self.inner.received.get() + 1);
                let msg = bytes.into_boxed_slice();
                let len = msg.len();
                let ptr = NonNull::from(Box::leak(msg)).cast::<u8>();
                Ok(RawMsg { ptr, len })
            }
            Err(code) => self.fail(code),
        }
    }

    unsafe fn release(&self, msg: RawMsg) {
        self.inner.released.set(self.inner.released.get() + 1);
        // SAFETY: produced by `recv` above from a leaked boxed slice of `len` bytes
        drop(unsafe { Box::from_raw(::core::ptr::slice_from_raw_parts_mut(msg.ptr.as_ptr(), msg.len)) });
    }

    fn last_error(&self) -> i32 {
        self.inner.last_error.get()
    }

    fn error_string(&self, code: i32) -> String {
        errno::describe(code)
    }
}
