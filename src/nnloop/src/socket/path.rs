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

//! State of the single outstanding operation of one direction.
//!
//! ```text
//! Idle --request--> Pending(Armed) --signal--> Pending(Signaled) --attempt ok / hard error--> Idle
//!                                                    |
//!                                                    +--transient--> Pending(RetryScheduled) --rearmed--> Pending(Armed)
//! ```
//!
//! A signal that arrives while a retry is scheduled (the direction was armed again by bind or connect) is taken like
//! one in `Armed`, the delayed re-arm is stale by then.
//!
//! The loop side only posts `signal` and `rearmed`. The native attempt itself runs in the task that awaits the
//! operation.

use crate::config::RetryPolicy;
use crate::error::SocketError;
use crate::transport::{Direction, MsgFlags};
use ::core::task::Waker;
use ::core::time::Duration;

#[derive(Debug, PartialEq)]
pub(crate) enum Phase {
    /// Waiting for the readiness descriptor.
    Armed,
    /// Ready to attempt the native call.
    Signaled,
    /// A delayed re-arm is pending after a transient failure.
    RetryScheduled,
    /// Re-arming failed, the error is handed to the waiting task.
    Failed(SocketError),
}

pub(crate) enum PathState {
    Idle,
    Pending { flags: MsgFlags, waker: Option<Waker>, phase: Phase },
}

/// What the awaiting task shall do next.
#[derive(Debug, PartialEq)]
pub(crate) enum Next {
    Attempt(MsgFlags),
    Wait,
    Fail(SocketError),
}

/// Outcome of a readiness signal.
#[derive(Debug)]
pub(crate) enum Signaled {
    Woken(Option<Waker>),
    /// No operation is pending.
    Idle,
    Ignored,
}

pub(crate) struct Path {
    direction: Direction,
    state: PathState,
    attempts: u32,
}

impl Path {
    pub(crate) fn new(direction: Direction) -> Self {
        Self {
            direction,
            state: PathState::Idle,
            attempts: 0,
        }
    }

    pub(crate) fn is_idle(&self) -> bool {
        matches!(self.state, PathState::Idle)
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.attempts
    }

    /// A new operation. Only one may be pending at a time.
    pub(crate) fn request(&mut self, flags: MsgFlags, waker: &Waker) -> Result<(), SocketError> {
        if !self.is_idle() {
            return Err(SocketError::Busy(self.direction));
        }

        self.state = PathState::Pending {
            flags,
            waker: Some(waker.clone()),
            phase: Phase::Armed,
        };
        Ok(())
    }

    /// No readiness descriptor exists for this direction, the native call is attempted at once.
    pub(crate) fn attempt_directly(&mut self) {
        if let PathState::Pending { phase, .. } = &mut self.state {
            *phase = Phase::Signaled;
        }
    }

    /// The readiness descriptor fired.
    pub(crate) fn signal(&mut self) -> Signaled {
        match &mut self.state {
            PathState::Idle => Signaled::Idle,
            PathState::Pending { waker, phase, .. } if matches!(*phase, Phase::Armed | Phase::RetryScheduled) => {
                *phase = Phase::Signaled;
                Signaled::Woken(waker.take())
            }
            PathState::Pending { .. } => Signaled::Ignored,
        }
    }

    /// Called on every poll of the awaiting task.
    pub(crate) fn poll_next(&mut self, cx_waker: &Waker) -> Next {
        match &mut self.state {
            PathState::Idle => return Next::Wait,
            PathState::Pending {
                flags,
                phase: Phase::Signaled,
                ..
            } => return Next::Attempt(*flags),
            PathState::Pending {
                waker,
                phase: Phase::Armed | Phase::RetryScheduled,
                ..
            } => {
                if !waker.as_ref().is_some_and(|w| w.will_wake(cx_waker)) {
                    *waker = Some(cx_waker.clone());
                }
                return Next::Wait;
            }
            PathState::Pending {
                phase: Phase::Failed(_), ..
            } => {}
        }

        self.attempts = 0;
        match ::core::mem::replace(&mut self.state, PathState::Idle) {
            PathState::Pending {
                phase: Phase::Failed(err), ..
            } => Next::Fail(err),
            _ => Next::Wait,
        }
    }

    /// The attempt found the transport temporarily unavailable. Returns the delay before re-arming.
    pub(crate) fn retry(&mut self, policy: &RetryPolicy, cx_waker: &Waker) -> Duration {
        let delay = policy.delay(self.attempts);
        self.attempts = self.attempts.saturating_add(1);

        if let PathState::Pending { waker, phase, .. } = &mut self.state {
            *phase = Phase::RetryScheduled;
            *waker = Some(cx_waker.clone());
        }
        delay
    }

    /// The delayed re-arm ran. `armed` is false when the direction has no descriptor and must be attempted directly.
    pub(crate) fn rearmed(&mut self, armed: bool) -> Option<Waker> {
        match &mut self.state {
            PathState::Pending { waker, phase, .. } if *phase == Phase::RetryScheduled => {
                if armed {
                    *phase = Phase::Armed;
                    None
                } else {
                    *phase = Phase::Signaled;
                    waker.take()
                }
            }
            _ => None,
        }
    }

    /// Re-arming failed, the pending operation fails with `err` on its next poll.
    pub(crate) fn fail(&mut self, err: SocketError) -> Option<Waker> {
        match &mut self.state {
            PathState::Pending { waker, phase, .. } => {
                *phase = Phase::Failed(err);
                waker.take()
            }
            PathState::Idle => None,
        }
    }

    /// The operation resolved or was cancelled.
    pub(crate) fn finish(&mut self) {
        self.state = PathState::Idle;
        self.attempts = 0;
    }
}
