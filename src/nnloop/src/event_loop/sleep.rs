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

use super::{LoopHandle, TimerCallback};
use crate::futures::{FutureInternalReturn, FutureState};
use ::core::future::Future;
use ::core::pin::Pin;
use ::core::task::{Context, Poll, Waker};
use ::core::time::Duration;
use foundation::{not_recoverable_error, prelude::*};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

///
/// Waits until the duration has elapsed, counted from creation of the future.
/// Resolution is limited to the millisecond granularity of the loop.
///
pub struct Sleep<L: LoopHandle> {
    state: FutureState,
    expire_at: Instant,
    handle: L,
    waker: Rc<RefCell<Option<Waker>>>,
}

impl<L: LoopHandle> Unpin for Sleep<L> {}

impl<L: LoopHandle> Sleep<L> {
    pub(crate) fn new(duration: Duration, handle: L) -> Self {
        Self {
            state: FutureState::New,
            expire_at: Instant::now() + duration,
            handle,
            waker: Rc::new(RefCell::new(None)),
        }
    }

    fn timer_callback(&self) -> TimerCallback {
        let slot = Rc::clone(&self.waker);
        Box::new(move || {
            if let Some(waker) = slot.borrow_mut().take() {
                waker.wake();
            }
        })
    }
}

impl<L: LoopHandle> Future for Sleep<L> {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let now = Instant::now();

        let res: FutureInternalReturn<()> = match self.state {
            FutureState::New if now >= self.expire_at => FutureInternalReturn::ready(()),
            FutureState::New => {
                *self.waker.borrow_mut() = Some(cx.waker().clone());
                let callback = self.timer_callback();
                self.handle.schedule_after(self.expire_at - now, callback);
                FutureInternalReturn::polled()
            }
            FutureState::Polled if now >= self.expire_at => FutureInternalReturn::ready(()),
            FutureState::Polled => {
                *self.waker.borrow_mut() = Some(cx.waker().clone());
                FutureInternalReturn::polled()
            }
            FutureState::Finished => not_recoverable_error!("Cannot be here, future is already finished"),
        };

        self.state.assign_and_propagate(res)
    }
}
