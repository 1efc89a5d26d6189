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
use crate::error::{ErrorClass, SocketError};
use crate::event_loop::LoopHandle;
use crate::futures::{FutureInternalReturn, FutureState};
use crate::transport::{Direction, MsgFlags, Transport};
use ::core::future::Future;
use ::core::pin::Pin;
use ::core::task::{Context, Poll};
use foundation::{not_recoverable_error, prelude::*};
use std::rc::Rc;

///
/// Future returned by [`super::Socket::send`]. Resolves to the number of bytes the transport accepted.
///
/// Dropping it before completion cancels the send.
///
pub struct SendFuture<'a, T: Transport + 'static, L: LoopHandle> {
    inner: &'a Rc<SocketInner<T, L>>,
    data: &'a [u8],
    flags: MsgFlags,
    state: FutureState,
}

impl<'a, T: Transport + 'static, L: LoopHandle> SendFuture<'a, T, L> {
    pub(super) fn new(inner: &'a Rc<SocketInner<T, L>>, data: &'a [u8], flags: MsgFlags) -> Self {
        Self {
            inner,
            data,
            flags,
            state: FutureState::New,
        }
    }

    fn start(&self, cx: &mut Context<'_>) -> FutureInternalReturn<Result<usize, SocketError>> {
        if let Err(err) = self.inner.request(Direction::Send, self.flags, cx.waker()) {
            return FutureInternalReturn::ready(Err(err));
        }

        if self.inner.config.optimistic_send {
            if let Some(result) = self.send_now() {
                self.inner.path(Direction::Send).borrow_mut().finish();
                return FutureInternalReturn::ready(result);
            }
        }

        match self.inner.arm(Direction::Send) {
            Ok(()) => self.drive(cx),
            Err(err) => FutureInternalReturn::ready(Err(err)),
        }
    }

    ///
    /// Zero timeout writability poll followed by one send attempt. `None` when the send has to wait for readiness.
    ///
    fn send_now(&self) -> Option<Result<usize, SocketError>> {
        let inner = self.inner;

        match inner.transport.poll_ready(inner.id, Direction::Send) {
            Ok(true) => {}
            Ok(false) => return None,
            Err(rc) => {
                debug!("Socket {:?}: writability poll failed: {}", inner.id, inner.native_error(rc));
                return None;
            }
        }

        match inner.transport.send(inner.id, self.data, self.flags) {
            Ok(sent) => Some(Ok(sent)),
            Err(rc) => {
                let err = inner.native_error(rc);
                if err.class() == ErrorClass::TransientUnavailable {
                    debug!("Socket {:?}: immediate send unavailable, waiting for writability", inner.id);
                    None
                } else {
                    Some(Err(err.into()))
                }
            }
        }
    }

    fn drive(&self, cx: &mut Context<'_>) -> FutureInternalReturn<Result<usize, SocketError>> {
        let inner = self.inner;
        let data = self.data;
        inner.drive(Direction::Send, cx.waker(), |flags| inner.transport.send(inner.id, data, flags))
    }
}

impl<T: Transport + 'static, L: LoopHandle> Future for SendFuture<'_, T, L> {
    type Output = Result<usize, SocketError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let res = match self.state {
            FutureState::New => self.start(cx),
            FutureState::Polled => self.drive(cx),
            FutureState::Finished => not_recoverable_error!("Cannot be here, future is already finished"),
        };

        self.state.assign_and_propagate(res)
    }
}

impl<T: Transport + 'static, L: LoopHandle> Drop for SendFuture<'_, T, L> {
    fn drop(&mut self) {
        if self.state == FutureState::Polled {
            self.inner.cancel(Direction::Send);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{RetryPolicy, SocketConfig};
    use crate::error::SocketError;
    use crate::socket::tests::scripted_socket;
    use crate::testing::{ScriptedTransportBuilder, SEND_FD};
    use crate::transport::{errno, Direction, MsgFlags};
    use ::core::time::Duration;
    use testing::poller::TestingFuturePoller;
    use testing::waker::CountingWaker;
    use testing::{assert_poll_pending, assert_poll_ready};

    fn slow_path() -> SocketConfig {
        SocketConfig {
            retry: RetryPolicy::Fixed { delay_ms: 50 },
            optimistic_send: false,
        }
    }

    #[test]
    fn ready_socket_sends_without_registration() {
        let (socket, transport, handle) = scripted_socket(
            ScriptedTransportBuilder::new()
                .poll_ready_results(vec![Ok(true)])
                .send_results(vec![Ok(5)]),
            SocketConfig::default(),
        );
        let mut poller = TestingFuturePoller::new(socket.send(b"hello"));

        assert_poll_ready(poller.poll(), Ok(5));
        assert_eq!(handle.writable_registrations(), 0);
        assert_eq!(handle.scheduled_count(), 0);
        assert_eq!(transport.fd_queries(Direction::Send), 0);
        assert_eq!(transport.sent(), vec![(b"hello".to_vec(), MsgFlags::DONTWAIT)]);
    }

    #[test]
    fn not_writable_waits_for_readiness() {
        let (socket, transport, handle) =
            scripted_socket(ScriptedTransportBuilder::new().send_results(vec![Ok(3)]), SocketConfig::default());
        let counting = CountingWaker::new();
        let mut poller = TestingFuturePoller::new(socket.send(b"abc"));

        assert_poll_pending(poller.poll_with_waker(&counting.get_waker()));
        assert_eq!(transport.poll_ready_calls(), 1);
        assert_eq!(transport.send_calls(), 0);
        assert!(handle.is_writable_registered(SEND_FD));

        assert!(handle.fire_writable(SEND_FD));
        assert!(counting.was_waked());
        assert!(!handle.is_writable_registered(SEND_FD));

        assert_poll_ready(poller.poll(), Ok(3));
    }

    #[test]
    fn unavailable_immediate_send_falls_back_to_readiness() {
        let (socket, transport, handle) = scripted_socket(
            ScriptedTransportBuilder::new()
                .poll_ready_results(vec![Ok(true)])
                .send_results(vec![Err(errno::EAGAIN), Ok(3)]),
            SocketConfig::default(),
        );
        let mut poller = TestingFuturePoller::new(socket.send(b"abc"));

        assert_poll_pending(poller.poll());
        assert!(handle.is_writable_registered(SEND_FD));
        assert_eq!(handle.scheduled_count(), 0);

        handle.fire_writable(SEND_FD);
        assert_poll_ready(poller.poll(), Ok(3));
        assert_eq!(transport.send_calls(), 2);
    }

    #[test]
    fn immediate_hard_error_is_returned() {
        let (socket, _transport, handle) = scripted_socket(
            ScriptedTransportBuilder::new()
                .poll_ready_results(vec![Ok(true)])
                .send_results(vec![Err(errno::EFSM)]),
            SocketConfig::default(),
        );
        let mut poller = TestingFuturePoller::new(socket.send(b"abc"));

        match poller.poll() {
            ::core::task::Poll::Ready(Err(err)) => assert_eq!(err.code(), Some(errno::EFSM)),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(handle.writable_registrations(), 0);
    }

    #[test]
    fn failed_writability_poll_takes_slow_path() {
        let (socket, _transport, handle) = scripted_socket(
            ScriptedTransportBuilder::new()
                .poll_ready_results(vec![Err(errno::EBADF)])
                .send_results(vec![Ok(1)]),
            SocketConfig::default(),
        );
        let mut poller = TestingFuturePoller::new(socket.send(b"x"));

        assert_poll_pending(poller.poll());
        handle.fire_writable(SEND_FD);
        assert_poll_ready(poller.poll(), Ok(1));
    }

    #[test]
    fn disabled_fast_path_never_polls() {
        let (socket, transport, handle) =
            scripted_socket(ScriptedTransportBuilder::new().send_results(vec![Ok(1)]), slow_path());
        let mut poller = TestingFuturePoller::new(socket.send(b"x"));

        assert_poll_pending(poller.poll());
        handle.fire_writable(SEND_FD);
        assert_poll_ready(poller.poll(), Ok(1));
        assert_eq!(transport.poll_ready_calls(), 0);
    }

    #[test]
    fn missing_send_descriptor_retries_on_timer_only() {
        let (socket, transport, handle) = scripted_socket(
            ScriptedTransportBuilder::new()
                .unsupported(Direction::Send)
                .send_results(vec![Err(errno::EAGAIN), Err(errno::EAGAIN), Ok(2)]),
            slow_path(),
        );
        let counting = CountingWaker::new();
        let mut poller = TestingFuturePoller::new(socket.send(b"hi"));

        assert_poll_pending(poller.poll_with_waker(&counting.get_waker()));
        handle.run_timers();
        assert_poll_pending(poller.poll_with_waker(&counting.get_waker()));
        handle.run_timers();

        assert_poll_ready(poller.poll(), Ok(2));
        assert_eq!(counting.wake_count(), 2);
        assert_eq!(handle.writable_registrations(), 0);
        assert_eq!(handle.scheduled_delays(), vec![Duration::from_millis(50); 2]);
        assert_eq!(transport.send_calls(), 3);
    }

    #[test]
    fn hard_error_is_not_retried() {
        let (socket, _transport, handle) =
            scripted_socket(ScriptedTransportBuilder::new().send_results(vec![Err(errno::EBADF)]), slow_path());
        let mut poller = TestingFuturePoller::new(socket.send(b"x"));

        assert_poll_pending(poller.poll());
        handle.fire_writable(SEND_FD);
        assert_poll_ready(
            poller.poll().map(|res| res.map_err(|err| err.code())),
            Err(Some(errno::EBADF)),
        );

        assert!(!handle.is_writable_registered(SEND_FD));
        assert_eq!(handle.scheduled_count(), 0);
    }

    #[test]
    fn second_send_while_pending_is_busy() {
        let (socket, _transport, _handle) = scripted_socket(ScriptedTransportBuilder::new(), slow_path());
        let mut first = TestingFuturePoller::new(socket.send(b"1"));
        assert_poll_pending(first.poll());

        let mut second = TestingFuturePoller::new(socket.send(b"2"));

        assert_poll_ready(second.poll(), Err(SocketError::Busy(Direction::Send)));
    }

    #[test]
    fn send_and_recv_are_independent() {
        let (socket, _transport, handle) = scripted_socket(ScriptedTransportBuilder::new(), slow_path());
        let mut send = TestingFuturePoller::new(socket.send(b"1"));
        let mut recv = TestingFuturePoller::new(socket.recv());

        assert_poll_pending(send.poll());
        assert_poll_pending(recv.poll());

        assert_eq!(handle.writable_registrations(), 1);
        assert_eq!(handle.readable_registrations(), 1);
    }

    #[test]
    fn dropping_pending_send_unregisters() {
        let (socket, _transport, handle) = scripted_socket(ScriptedTransportBuilder::new(), slow_path());
        let mut poller = TestingFuturePoller::new(socket.send(b"x"));
        assert_poll_pending(poller.poll());

        drop(poller);

        assert!(!handle.is_writable_registered(SEND_FD));
        let mut next = TestingFuturePoller::new(socket.send(b"y"));
        assert_poll_pending(next.poll());
    }
}
