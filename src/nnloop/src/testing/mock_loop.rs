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

use crate::event_loop::{IoCallback, LoopHandle, TimerCallback};
use ::core::time::Duration;
use foundation::prelude::CommonErrors;
use std::cell::RefCell;
use std::collections::HashMap;
use std::os::fd::RawFd;
use std::rc::Rc;

///
/// A [`LoopHandle`] that records registrations and timers. Readiness and elapsed time are simulated by the test
/// with [`MockLoop::fire_readable`], [`MockLoop::fire_writable`] and [`MockLoop::run_timers`].
///
#[derive(Clone, Default)]
pub struct MockLoop {
    state: Rc<RefCell<MockState>>,
}

#[derive(Default)]
struct MockState {
    readable: HashMap<RawFd, IoCallback>,
    writable: HashMap<RawFd, IoCallback>,
    timers: Vec<(Duration, TimerCallback)>,
    scheduled: Vec<Duration>,
    readable_registrations: usize,
    writable_registrations: usize,
    refuse_with: Option<CommonErrors>,
}

impl MockLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every following registration fails with `err`.
    pub fn refuse_registrations(&self, err: CommonErrors) {
        self.state.borrow_mut().refuse_with = Some(err);
    }

    pub fn is_readable_registered(&self, fd: RawFd) -> bool {
        self.state.borrow().readable.contains_key(&fd)
    }

    pub fn is_writable_registered(&self, fd: RawFd) -> bool {
        self.state.borrow().writable.contains_key(&fd)
    }

    /// Number of successful `register_readable` calls so far.
    pub fn readable_registrations(&self) -> usize {
        self.state.borrow().readable_registrations
    }

    /// Number of successful `register_writable` calls so far.
    pub fn writable_registrations(&self) -> usize {
        self.state.borrow().writable_registrations
    }

    /// Invokes the readable callback of `fd`. Returns false when none is registered.
    pub fn fire_readable(&self, fd: RawFd) -> bool {
        let callback = self.state.borrow().readable.get(&fd).cloned();
        Self::invoke(callback)
    }

    /// Invokes the writable callback of `fd`. Returns false when none is registered.
    pub fn fire_writable(&self, fd: RawFd) -> bool {
        let callback = self.state.borrow().writable.get(&fd).cloned();
        Self::invoke(callback)
    }

    fn invoke(callback: Option<IoCallback>) -> bool {
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    ///
    /// Runs every timer pending now, shortest delay first, as if their delays elapsed. Timers scheduled while running
    /// stay pending. Returns how many ran.
    ///
    pub fn run_timers(&self) -> usize {
        let mut timers = ::core::mem::take(&mut self.state.borrow_mut().timers);
        timers.sort_by_key(|(delay, _)| *delay);

        let count = timers.len();
        for (_, callback) in timers {
            callback();
        }
        count
    }

    pub fn pending_timers(&self) -> usize {
        self.state.borrow().timers.len()
    }

    /// Delays of all timers scheduled so far, in scheduling order.
    pub fn scheduled_delays(&self) -> Vec<Duration> {
        self.state.borrow().scheduled.clone()
    }

    pub fn scheduled_count(&self) -> usize {
        self.state.borrow().scheduled.len()
    }
}

impl LoopHandle for MockLoop {
    fn register_readable(&self, fd: RawFd, callback: IoCallback) -> Result<(), CommonErrors> {
        let mut state = self.state.borrow_mut();
        if let Some(err) = state.refuse_with {
            return Err(err);
        }

        state.readable.insert(fd, callback);
        state.readable_registrations += 1;
        Ok(())
    }

    fn register_writable(&self, fd: RawFd, callback: IoCallback) -> Result<(), CommonErrors> {
        let mut state = self.state.borrow_mut();
        if let Some(err) = state.refuse_with {
            return Err(err);
        }

        state.writable.insert(fd, callback);
        state.writable_registrations += 1;
        Ok(())
    }

    fn unregister_readable(&self, fd: RawFd) -> bool {
        let removed = self.state.borrow_mut().readable.remove(&fd);
        removed.is_some()
    }

    fn unregister_writable(&self, fd: RawFd) -> bool {
        let removed = self.state.borrow_mut().writable.remove(&fd);
        removed.is_some()
    }

    fn schedule_after(&self, delay: Duration, callback: TimerCallback) {
        let mut state = self.state.borrow_mut();
        state.scheduled.push(delay);
        state.timers.push((delay, callback));
    }
}
