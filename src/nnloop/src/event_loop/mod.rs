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

//! The event loop seam used by sockets, and a poll(2) based single-threaded implementation of it.

mod local;
mod selector;
mod sleep;
mod timer;

pub use local::{EventLoop, LocalHandle};
pub use selector::Unparker;
pub use sleep::Sleep;

use ::core::ops::{BitAnd, BitOr, Not};
use ::core::time::Duration;
use foundation::prelude::CommonErrors;
use std::os::fd::RawFd;
use std::rc::Rc;

/// Invoked each time a registered descriptor is ready, until it is unregistered.
pub type IoCallback = Rc<dyn Fn()>;

/// Invoked once when its delay elapsed.
pub type TimerCallback = Box<dyn FnOnce()>;

///
/// What a socket needs from an event loop.
///
/// A registration stays active until it is unregistered, so a callback that does not unregister its descriptor is
/// called again on every loop turn while the descriptor stays ready. Registering the same descriptor and direction
/// again replaces the callback.
///
pub trait LoopHandle: Clone + 'static {
    fn register_readable(&self, fd: RawFd, callback: IoCallback) -> Result<(), CommonErrors>;

    fn register_writable(&self, fd: RawFd, callback: IoCallback) -> Result<(), CommonErrors>;

    /// Returns whether a registration was removed.
    fn unregister_readable(&self, fd: RawFd) -> bool;

    /// Returns whether a registration was removed.
    fn unregister_writable(&self, fd: RawFd) -> bool;

    fn schedule_after(&self, delay: Duration, callback: TimerCallback);
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct IoEventInterest(pub u8);

impl IoEventInterest {
    pub const READABLE: IoEventInterest = IoEventInterest(0b01);
    pub const WRITABLE: IoEventInterest = IoEventInterest(0b10);

    pub fn is_readable(&self) -> bool {
        self.0 & Self::READABLE.0 != 0
    }

    pub fn is_writable(&self) -> bool {
        self.0 & Self::WRITABLE.0 != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl BitOr for IoEventInterest {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        IoEventInterest(self.0 | rhs.0)
    }
}

impl BitAnd for IoEventInterest {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        IoEventInterest(self.0 & rhs.0)
    }
}

impl Not for IoEventInterest {
    type Output = Self;

    fn not(self) -> Self::Output {
        IoEventInterest(!self.0 & (Self::READABLE.0 | Self::WRITABLE.0))
    }
}
