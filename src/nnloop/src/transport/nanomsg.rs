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

//! Binding to the system `libnanomsg`.

use super::{errno, Direction, Domain, EndpointId, MsgFlags, NativeRc, NativeResult, Protocol, RawMsg, SocketId, SocketOption, Transport};
use ::core::ffi::{c_char, c_int, c_short, c_void, CStr};
use ::core::ptr::{self, NonNull};
use std::cell::Cell;
use std::ffi::CString;
use std::os::fd::RawFd;

const NN_SOL_SOCKET: c_int = 0;
const NN_SNDFD: c_int = 10;
const NN_RCVFD: c_int = 11;
const NN_SUB: c_int = 33;
const NN_SUB_SUBSCRIBE: c_int = 1;
const NN_SUB_UNSUBSCRIBE: c_int = 2;
const NN_POLLIN: c_short = 1;
const NN_POLLOUT: c_short = 2;
const NN_MSG: usize = usize::MAX;

#[repr(C)]
struct NnPollFd {
    fd: c_int,
    events: c_short,
    revents: c_short,
}

#[link(name = "nanomsg")]
extern "C" {
    fn nn_socket(domain: c_int, protocol: c_int) -> c_int;
    fn nn_close(s: c_int) -> c_int;
    fn nn_bind(s: c_int, addr: *const c_char) -> c_int;
    fn nn_connect(s: c_int, addr: *const c_char) -> c_int;
    fn nn_setsockopt(s: c_int, level: c_int, option: c_int, optval: *const c_void, optvallen: usize) -> c_int;
    fn nn_getsockopt(s: c_int, level: c_int, option: c_int, optval: *mut c_void, optvallen: *mut usize) -> c_int;
    fn nn_send(s: c_int, buf: *const c_void, len: usize, flags: c_int) -> c_int;
    fn nn_recv(s: c_int, buf: *mut c_void, len: usize, flags: c_int) -> c_int;
    fn nn_freemsg(msg: *mut c_void) -> c_int;
    fn nn_poll(fds: *mut NnPollFd, nfds: c_int, timeout: c_int) -> c_int;
    fn nn_errno() -> c_int;
    fn nn_strerror(errnum: c_int) -> *const c_char;
}

///
/// Sockets of the nanomsg library. All sockets of a process share the library state, so the handle carries only
/// the error raised by argument checks done before reaching the library.
///
#[derive(Clone, Default)]
pub struct NanomsgTransport {
    local_error: Cell<Option<i32>>,
}

impl NanomsgTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn check(&self, rc: c_int) -> NativeResult<c_int> {
        self.local_error.set(None);
        if rc < 0 {
            Err(NativeRc(rc))
        } else {
            Ok(rc)
        }
    }

    fn local_failure<T>(&self, code: i32) -> NativeResult<T> {
        self.local_error.set(Some(code));
        Err(NativeRc(-1))
    }

    fn address(&self, addr: &str) -> NativeResult<CString> {
        match CString::new(addr) {
            Ok(c_addr) => Ok(c_addr),
            Err(_) => self.local_failure(errno::EINVAL),
        }
    }
}

impl Transport for NanomsgTransport {
    fn open(&self, domain: Domain, protocol: Protocol) -> NativeResult<SocketId> {
        let rc = unsafe { nn_socket(domain.as_raw(), protocol.as_raw()) };
        self.check(rc).map(SocketId)
    }

    fn close(&self, socket: SocketId) -> NativeResult<()> {
        let rc = unsafe { nn_close(socket.0) };
        self.check(rc).map(|_| ())
    }

    fn bind(&self, socket: SocketId, addr: &str) -> NativeResult<EndpointId> {
        let c_addr = self.address(addr)?;
        let rc = unsafe { nn_bind(socket.0, c_addr.as_ptr()) };
        self.check(rc).map(EndpointId)
    }

    fn connect(&self, socket: SocketId, addr: &str) -> NativeResult<EndpointId> {
        let c_addr = self.address(addr)?;
        let rc = unsafe { nn_connect(socket.0, c_addr.as_ptr()) };
        self.check(rc).map(EndpointId)
    }

    fn set_option(&self, socket: SocketId, option: &SocketOption) -> NativeResult<()> {
        let (name, value) = match option {
            SocketOption::Subscribe(topic) => (NN_SUB_SUBSCRIBE, topic),
            SocketOption::Unsubscribe(topic) => (NN_SUB_UNSUBSCRIBE, topic),
        };

        let rc = unsafe { nn_setsockopt(socket.0, NN_SUB, name, value.as_ptr().cast::<c_void>(), value.len()) };
        self.check(rc).map(|_| ())
    }

    fn readiness_fd(&self, socket: SocketId, direction: Direction) -> NativeResult<RawFd> {
        let option = match direction {
            Direction::Receive => NN_RCVFD,
            // Signals through POLLIN. Registered as writable anyway, a pending send then retries on every loop turn.
            Direction::Send => NN_SNDFD,
        };

        let mut fd: c_int = -1;
        let mut len = ::core::mem::size_of::<c_int>();
        let rc = unsafe { nn_getsockopt(socket.0, NN_SOL_SOCKET, option, (&mut fd as *mut c_int).cast::<c_void>(), &mut len) };
        self.check(rc).map(|_| fd)
    }

    fn poll_ready(&self, socket: SocketId, direction: Direction) -> NativeResult<bool> {
        let events = match direction {
            Direction::Receive => NN_POLLIN,
            Direction::Send => NN_POLLOUT,
        };

        let mut pfd = NnPollFd {
            fd: socket.0,
            events,
            revents: 0,
        };
        let rc = unsafe { nn_poll(&mut pfd, 1, 0) };
        self.check(rc).map(|ready| ready > 0 && pfd.revents & events != 0)
    }

    fn send(&self, socket: SocketId, data: &[u8], flags: MsgFlags) -> NativeResult<usize> {
        let rc = unsafe { nn_send(socket.0, data.as_ptr().cast::<c_void>(), data.len(), flags.0) };
        self.check(rc).map(|sent| sent as usize)
    }

    fn recv(&self, socket: SocketId, flags: MsgFlags) -> NativeResult<RawMsg> {
        let mut buf: *mut c_void = ptr::null_mut();
        let rc = unsafe { nn_recv(socket.0, (&mut buf as *mut *mut c_void).cast::<c_void>(), NN_MSG, flags.0) };
        let len = self.check(rc)? as usize;

        match NonNull::new(buf.cast::<u8>()) {
            Some(ptr) => Ok(RawMsg { ptr, len }),
            None => self.local_failure(errno::EINVAL),
        }
    }

    unsafe fn release(&self, msg: RawMsg) {
        // SAFETY: the message was allocated by nn_recv with NN_MSG
        unsafe { nn_freemsg(msg.ptr.as_ptr().cast::<c_void>()) };
    }

    fn last_error(&self) -> i32 {
        match self.local_error.get() {
            Some(code) => code,
            None => unsafe { nn_errno() },
        }
    }

    fn error_string(&self, code: i32) -> String {
        let text = unsafe { nn_strerror(code) };
        if text.is_null() {
            return errno::describe(code);
        }

        // SAFETY: nn_strerror returns a static NUL terminated string
        unsafe { CStr::from_ptr(text) }.to_string_lossy().into_owned()
    }
}
