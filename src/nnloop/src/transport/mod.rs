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

//! The primitive surface of a native message transport.
//!
//! Every call is non-blocking. A failed call returns the raw negative code ([`NativeRc`]); the error code itself is
//! read afterwards through [`Transport::last_error`], the way `nn_errno` works.

pub mod errno;
pub mod inproc;
pub mod message;
#[cfg(feature = "nanomsg")]
pub mod nanomsg;

use ::core::fmt;
use ::core::ops::BitOr;
use ::core::ptr::NonNull;
use std::os::fd::RawFd;

/// Negative return code of a failed native call.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct NativeRc(pub i32);

pub type NativeResult<T> = Result<T, NativeRc>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SocketId(pub i32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct EndpointId(pub i32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Receive,
    Send,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Receive => f.write_str("receive"),
            Direction::Send => f.write_str("send"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Domain {
    /// Full protocol semantics (`AF_SP`).
    Sp,
    /// Raw sockets without protocol state (`AF_SP_RAW`).
    SpRaw,
}

impl Domain {
    pub fn as_raw(self) -> i32 {
        match self {
            Domain::Sp => 1,
            Domain::SpRaw => 2,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Protocol {
    Pair,
    Pub,
    Sub,
    Req,
    Rep,
    Push,
    Pull,
    Surveyor,
    Respondent,
    Bus,
}

impl Protocol {
    pub fn as_raw(self) -> i32 {
        match self {
            Protocol::Pair => 16,
            Protocol::Pub => 32,
            Protocol::Sub => 33,
            Protocol::Req => 48,
            Protocol::Rep => 49,
            Protocol::Push => 80,
            Protocol::Pull => 81,
            Protocol::Surveyor => 98,
            Protocol::Respondent => 99,
            Protocol::Bus => 112,
        }
    }

    pub fn can_send(self) -> bool {
        !matches!(self, Protocol::Sub | Protocol::Pull)
    }

    pub fn can_recv(self) -> bool {
        !matches!(self, Protocol::Pub | Protocol::Push)
    }
}

///
/// Flags passed to send and receive. The socket always adds [`MsgFlags::DONTWAIT`].
///
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct MsgFlags(pub i32);

impl MsgFlags {
    pub const NONE: MsgFlags = MsgFlags(0);
    pub const DONTWAIT: MsgFlags = MsgFlags(1);

    pub fn contains(self, other: MsgFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for MsgFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        MsgFlags(self.0 | rhs.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SocketOption {
    /// Topic prefix a `Sub` socket delivers.
    Subscribe(Vec<u8>),
    Unsubscribe(Vec<u8>),
}

///
/// A received message still owned by the transport. Give it back with [`Transport::release`] exactly once,
/// [`message::ForeignMsg`] does that on drop.
///
#[derive(Debug)]
pub struct RawMsg {
    pub ptr: NonNull<u8>,
    pub len: usize,
}

pub trait Transport {
    fn open(&self, domain: Domain, protocol: Protocol) -> NativeResult<SocketId>;

    fn close(&self, socket: SocketId) -> NativeResult<()>;

    fn bind(&self, socket: SocketId, addr: &str) -> NativeResult<EndpointId>;

    fn connect(&self, socket: SocketId, addr: &str) -> NativeResult<EndpointId>;

    fn set_option(&self, socket: SocketId, option: &SocketOption) -> NativeResult<()>;

    /// Descriptor that signals readiness for `direction`. Fails with `ENOPROTOOPT` when the socket type has none.
    fn readiness_fd(&self, socket: SocketId, direction: Direction) -> NativeResult<RawFd>;

    /// Zero timeout readiness poll.
    fn poll_ready(&self, socket: SocketId, direction: Direction) -> NativeResult<bool>;

    fn send(&self, socket: SocketId, data: &[u8], flags: MsgFlags) -> NativeResult<usize>;

    fn recv(&self, socket: SocketId, flags: MsgFlags) -> NativeResult<RawMsg>;

    /// # Safety
    /// `msg` must come from a successful [`Transport::recv`] of this transport and must not be released before.
    unsafe fn release(&self, msg: RawMsg);

    fn last_error(&self) -> i32;

    fn error_string(&self, code: i32) -> String;
}
