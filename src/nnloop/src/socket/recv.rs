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

use super::SocketInner;
use crate::error::SocketError;
use crate::event_loop::LoopHandle;
use crate::futures::{FutureInternalReturn, FutureState};
use crate::transport::message::ForeignMsg;
use crate::transport::{Direction, MsgFlags, Transport};
use ::core::future::Future;
use ::core::pin::Pin;
use ::core::task::{Context, Poll};
use foundation::not_recoverable_error;
use std::rc::Rc;

///
/// Future returned by [`super::Socket::recv`]. Resolves to an owned copy of the next message.
///
/// Dropping it before completion cancels the receive.
///
pub struct RecvFuture<'a, T: Transport + 'static, L: LoopHandle> {
    inner: &'a Rc<SocketInner<T, L>>,
    flags: MsgFlags,
    state: FutureState,
}

impl<'a, T: Transport + 'static, L: LoopHandle> RecvFuture<'a, T, L> {
    pub(super) fn new(inner: &'a Rc<SocketInner<T, L>>, flags: MsgFlags) -> Self {
        Self {
            inner,
            flags,
            state: FutureState::New,
        }
    }

    fn start(&self, cx: &mut Context<'_>) -> FutureInternalReturn<Result<Vec<u8>, SocketError>> {
        let accepted = self
            .inner
            .request(Direction::Receive, self.flags, cx.waker())
            .and_then(|()| self.inner.arm(Direction::Receive));

        match accepted {
            Ok(()) => self.drive(cx),
            Err(err) => FutureInternalReturn::ready(Err(err)),
        }
    }

    fn drive(&self, cx: &mut Context<'_>) -> FutureInternalReturn<Result<Vec<u8>, SocketError>> {
        let inner = self.inner;
        inner.drive(Direction::Receive, cx.waker(), |flags| {
            inner.transport.recv(inner.id, flags).map(|raw| {
                // SAFETY: `raw` was just returned by a successful recv on this transport
                let msg = unsafe { ForeignMsg::new(&inner.transport, raw) };
                msg.to_vec()
            })
        })
    }
}

impl<T: Transport + 'static, L: LoopHandle> Future for RecvFuture<'_, T, L> {
    type Output = Result<Vec<u8>, SocketError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let res = match self.state {
            FutureState::New => self.start(cx),
            FutureState::Polled => self.drive(cx),
            FutureState::Finished => not_recoverable_error!("Cannot be here, future is already finished"),
        };

        self.state.assign_and_propagate(res)
    }
}

impl<T: Transport + 'static, L: LoopHandle> Drop for RecvFuture<'_, T, L> {
    fn drop(&mut self) {
        if self.state == FutureState::Polled {
            self.inner.cancel(Direction::Receive);
        }
    }
}
