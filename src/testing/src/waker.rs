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

use ::core::sync::atomic::{AtomicUsize, Ordering};
use ::core::task::{RawWaker, RawWakerVTable, Waker};
use std::sync::Arc;
use std::task::Wake;

///
/// Helper waker that does not do anything
///
pub fn noop_waker() -> Waker {
    static NOOP_WAKER_VTABLE: RawWakerVTable = RawWakerVTable::new(noop_clone, noop, noop, noop);

    fn noop(_data: *const ()) {}

    fn noop_clone(_: *const ()) -> RawWaker {
        noop_raw_waker()
    }

    fn noop_raw_waker() -> RawWaker {
        RawWaker::new(::core::ptr::null(), &NOOP_WAKER_VTABLE)
    }

    // SAFETY: every vtable entry ignores the data pointer
    unsafe { Waker::from_raw(noop_raw_waker()) }
}

///
/// Helper waker counting how many times it was woken
///
#[derive(Clone, Default)]
pub struct CountingWaker {
    inner: Arc<WakeCounter>,
}

impl CountingWaker {
    pub fn new() -> CountingWaker {
        Self::default()
    }

    pub fn was_waked(&self) -> bool {
        self.wake_count() > 0
    }

    pub fn wake_count(&self) -> usize {
        self.inner.wakes.load(Ordering::Relaxed)
    }

    pub fn get_waker(&self) -> Waker {
        Waker::from(self.inner.clone())
    }
}

#[derive(Default)]
struct WakeCounter {
    wakes: AtomicUsize,
}

impl Wake for WakeCounter {
    fn wake(self: Arc<Self>) {
        self.wakes.fetch_add(1, Ordering::Relaxed);
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.wakes.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counting_waker_counts_each_wake() {
        let counting = CountingWaker::new();
        let waker = counting.get_waker();

        waker.wake_by_ref();
        waker.clone().wake();

        assert_eq!(counting.wake_count(), 2);
        assert!(counting.was_waked());
    }
}
