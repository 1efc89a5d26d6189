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

//! Awaitable send and receive for nanomsg-style message sockets driven by a single-threaded event loop.
//!
//! A [`Socket`] owns a native non-blocking socket handle reached through the [`transport::Transport`] trait,
//! registers its readiness descriptors with a [`event_loop::LoopHandle`] and exposes `recv`/`send` as futures.
//! The crate ships a poll(2) based [`EventLoop`] that is both the readiness source and the executor for these
//! futures, an in-process transport and, behind the `nanomsg` feature, a binding to `libnanomsg`.

pub mod config;
pub mod error;
pub mod event_loop;
pub(crate) mod futures;
pub mod socket;
pub mod transport;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{RetryPolicy, SocketConfig};
pub use error::{ErrorClass, SocketError, TransportError};
pub use event_loop::{EventLoop, LocalHandle, LoopHandle};
pub use socket::{Socket, SocketBuilder};
pub use transport::{Direction, Domain, MsgFlags, Protocol};

pub mod prelude {
    pub use crate::config::{RetryPolicy, SocketConfig};
    pub use crate::error::{SocketError, TransportError};
    pub use crate::event_loop::{EventLoop, LocalHandle, LoopHandle};
    pub use crate::socket::{Socket, SocketBuilder};
    pub use crate::transport::inproc::InprocTransport;
    #[cfg(feature = "nanomsg")]
    pub use crate::transport::nanomsg::NanomsgTransport;
    pub use crate::transport::{Direction, Domain, MsgFlags, Protocol, SocketOption, Transport};
}
