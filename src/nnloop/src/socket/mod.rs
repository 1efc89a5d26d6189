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

//! The socket adapter: a native socket handle plus one receive and one send path sharing a readiness registrar.

mod path;
mod recv;
mod registrar;
mod send;

pub use recv::RecvFuture;
pub use send::SendFuture;

use crate::config::{RetryPolicy, SocketConfig};
use crate::error::{ErrorClass, SocketError, TransportError};
use crate::event_loop::LoopHandle;
use crate::futures::FutureInternalReturn;
use crate::transport::{Direction, Domain, EndpointId, MsgFlags, NativeRc, NativeResult, Protocol, SocketId, SocketOption, Transport};
use ::core::task::Waker;
use foundation::prelude::*;
use path::{Next, Path};
use registrar::{Activation, Registrar};
use std::cell::RefCell;
use std::rc::Rc;

pub(crate) struct SocketInner<T: Transport + 'static, L: LoopHandle> {
    transport: T,
    id: SocketId,
    domain: Domain,
    protocol: Protocol,
    handle: L,
    config: SocketConfig,
    registrar: RefCell<Registrar>,
    recv_path: RefCell<Path>,
    send_path: RefCell<Path>,
}

///
/// A message socket whose `recv` and `send` are futures resolved by the loop behind `L`.
///
/// At most one receive and one send may be pending at a time. Both must be awaited on the thread owning the loop.
/// Dropping the socket removes its registrations and closes the native handle.
///
pub struct Socket<T: Transport + 'static, L: LoopHandle> {
    inner: Rc<SocketInner<T, L>>,
}

pub struct SocketBuilder<T: Transport + 'static, L: LoopHandle> {
    transport: T,
    handle: L,
    domain: Domain,
    protocol: Protocol,
    config: SocketConfig,
}

impl<T: Transport + 'static, L: LoopHandle> SocketBuilder<T, L> {
    pub fn new(transport: T, handle: L, protocol: Protocol) -> Self {
        Self {
            transport,
            handle,
            domain: Domain::Sp,
            protocol,
            config: SocketConfig::default(),
        }
    }

    pub fn domain(mut self, domain: Domain) -> Self {
        self.domain = domain;
        self
    }

    pub fn config(mut self, config: SocketConfig) -> Self {
        self.config = config;
        self
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    pub fn optimistic_send(mut self, enabled: bool) -> Self {
        self.config.optimistic_send = enabled;
        self
    }

    /// Opens the native socket.
    pub fn build(self) -> Result<Socket<T, L>, SocketError> {
        let id = self
            .transport
            .open(self.domain, self.protocol)
            .map_err(|rc| TransportError::from_native(&self.transport, rc))?;

        debug!("Opened socket {:?} ({:?}, {:?})", id, self.domain, self.protocol);

        Ok(Socket {
            inner: Rc::new(SocketInner {
                transport: self.transport,
                id,
                domain: self.domain,
                protocol: self.protocol,
                handle: self.handle,
                config: self.config,
                registrar: RefCell::new(Registrar::default()),
                recv_path: RefCell::new(Path::new(Direction::Receive)),
                send_path: RefCell::new(Path::new(Direction::Send)),
            }),
        })
    }
}

impl<T: Transport + 'static, L: LoopHandle> Socket<T, L> {
    /// Opens a socket with the default configuration.
    pub fn new(transport: T, handle: L, domain: Domain, protocol: Protocol) -> Result<Self, SocketError> {
        SocketBuilder::new(transport, handle, protocol).domain(domain).build()
    }

    pub fn builder(transport: T, handle: L, protocol: Protocol) -> SocketBuilder<T, L> {
        SocketBuilder::new(transport, handle, protocol)
    }

    /// Binds to `addr` and starts watching the receive descriptor.
    pub fn bind(&self, addr: &str) -> Result<EndpointId, SocketError> {
        let endpoint = self.inner.transport.bind(self.inner.id, addr).map_err(|rc| self.inner.native_error(rc))?;
        info!("Socket {:?} bound to {}", self.inner.id, addr);

        self.inner.watch_receive()?;
        Ok(endpoint)
    }

    /// Connects to `addr` and starts watching the receive descriptor.
    pub fn connect(&self, addr: &str) -> Result<EndpointId, SocketError> {
        let endpoint = self
            .inner
            .transport
            .connect(self.inner.id, addr)
            .map_err(|rc| self.inner.native_error(rc))?;
        info!("Socket {:?} connected to {}", self.inner.id, addr);

        self.inner.watch_receive()?;
        Ok(endpoint)
    }

    pub fn set_option(&self, option: &SocketOption) -> Result<(), SocketError> {
        self.inner
            .transport
            .set_option(self.inner.id, option)
            .map_err(|rc| self.inner.native_error(rc).into())
    }

    /// Subscribes to messages starting with `topic`. An empty topic matches every message.
    pub fn subscribe(&self, topic: &[u8]) -> Result<(), SocketError> {
        self.set_option(&SocketOption::Subscribe(topic.to_vec()))
    }

    pub fn unsubscribe(&self, topic: &[u8]) -> Result<(), SocketError> {
        self.set_option(&SocketOption::Unsubscribe(topic.to_vec()))
    }

    /// Receives the next message.
    pub fn recv(&self) -> RecvFuture<'_, T, L> {
        self.recv_with_flags(MsgFlags::NONE)
    }

    /// Receives the next message. The non-blocking flag is always added to `flags`.
    pub fn recv_with_flags(&self, flags: MsgFlags) -> RecvFuture<'_, T, L> {
        RecvFuture::new(&self.inner, flags | MsgFlags::DONTWAIT)
    }

    /// Sends `data` as one message. Resolves to the number of bytes accepted by the transport.
    pub fn send<'a>(&'a self, data: &'a [u8]) -> SendFuture<'a, T, L> {
        self.send_with_flags(data, MsgFlags::NONE)
    }

    /// Sends `data` as one message. The non-blocking flag is always added to `flags`.
    pub fn send_with_flags<'a>(&'a self, data: &'a [u8], flags: MsgFlags) -> SendFuture<'a, T, L> {
        SendFuture::new(&self.inner, data, flags | MsgFlags::DONTWAIT)
    }

    pub fn id(&self) -> SocketId {
        self.inner.id
    }

    pub fn domain(&self) -> Domain {
        self.inner.domain
    }

    pub fn protocol(&self) -> Protocol {
        self.inner.protocol
    }

    pub fn config(&self) -> &SocketConfig {
        &self.inner.config
    }

    pub fn transport(&self) -> &T {
        &self.inner.transport
    }
}

impl<T: Transport + 'static, L: LoopHandle> SocketInner<T, L> {
    fn path(&self, direction: Direction) -> &RefCell<Path> {
        match direction {
            Direction::Receive => &self.recv_path,
            Direction::Send => &self.send_path,
        }
    }

    fn native_error(&self, rc: NativeRc) -> TransportError {
        TransportError::from_native(&self.transport, rc)
    }

    fn watch_receive(self: &Rc<Self>) -> Result<(), SocketError> {
        match self.enable(Direction::Receive)? {
            Activation::Unsupported => debug!("Socket {:?} cannot receive, reader not enabled", self.id),
            Activation::Armed | Activation::AlreadyArmed => {}
        }
        Ok(())
    }

    /// Accepts a new operation in `direction`.
    fn request(&self, direction: Direction, flags: MsgFlags, waker: &Waker) -> Result<(), SocketError> {
        self.path(direction).borrow_mut().request(flags, waker)
    }

    /// Waits for readiness of the operation accepted by `request`, or schedules a direct attempt.
    fn arm(self: &Rc<Self>, direction: Direction) -> Result<(), SocketError> {
        match self.enable(direction) {
            Ok(Activation::Armed | Activation::AlreadyArmed) => Ok(()),
            Ok(Activation::Unsupported) => {
                self.path(direction).borrow_mut().attempt_directly();
                Ok(())
            }
            Err(err) => {
                self.path(direction).borrow_mut().finish();
                Err(err)
            }
        }
    }

    ///
    /// Advances the pending operation in `direction`. `attempt` performs the native non-blocking call with the
    /// operation flags and runs only once readiness was signaled.
    ///
    fn drive<R>(
        self: &Rc<Self>,
        direction: Direction,
        waker: &Waker,
        attempt: impl FnOnce(MsgFlags) -> NativeResult<R>,
    ) -> FutureInternalReturn<Result<R, SocketError>> {
        let next = self.path(direction).borrow_mut().poll_next(waker);

        let flags = match next {
            Next::Wait => return FutureInternalReturn::polled(),
            Next::Fail(err) => return FutureInternalReturn::ready(Err(err)),
            Next::Attempt(flags) => flags,
        };

        match attempt(flags) {
            Ok(value) => {
                self.path(direction).borrow_mut().finish();
                FutureInternalReturn::ready(Ok(value))
            }
            Err(rc) => {
                let err = self.native_error(rc);
                if err.class() == ErrorClass::TransientUnavailable {
                    let (delay, attempts) = {
                        let mut path = self.path(direction).borrow_mut();
                        (path.retry(&self.config.retry, waker), path.attempts())
                    };
                    debug!(
                        "Socket {:?}: {} unavailable ({}), retry {} in {:?}",
                        self.id, direction, err, attempts, delay
                    );
                    self.schedule_rearm(direction, delay);
                    FutureInternalReturn::polled()
                } else {
                    self.path(direction).borrow_mut().finish();
                    FutureInternalReturn::ready(Err(err.into()))
                }
            }
        }
    }

    /// The future of the pending operation in `direction` was dropped.
    fn cancel(&self, direction: Direction) {
        if self.path(direction).borrow().is_idle() {
            return;
        }

        self.path(direction).borrow_mut().finish();
        self.disable(direction);
        trace!("Socket {:?}: pending {} cancelled", self.id, direction);
    }
}

impl<T: Transport + 'static, L: LoopHandle> Drop for SocketInner<T, L> {
    fn drop(&mut self) {
        self.disable(Direction::Receive);
        self.disable(Direction::Send);

        match self.transport.close(self.id) {
            Ok(()) => debug!("Closed socket {:?}", self.id),
            Err(rc) => warn!("Failed to close socket {:?}: {}", self.id, self.native_error(rc)),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::testing::{MockLoop, ScriptedTransport, ScriptedTransportBuilder, RECV_FD};
    use crate::transport::errno;
    use ::core::time::Duration;
    use foundation::prelude::CommonErrors;

    pub(crate) fn scripted_socket(
        builder: ScriptedTransportBuilder,
        config: SocketConfig,
    ) -> (Socket<ScriptedTransport, MockLoop>, ScriptedTransport, MockLoop) {
        let transport = builder.build();
        let handle = MockLoop::new();
        let socket = Socket::builder(transport.clone(), handle.clone(), Protocol::Pair)
            .config(config)
            .build()
            .unwrap();

        (socket, transport, handle)
    }

    #[test]
    fn open_failure_is_reported_with_code() {
        let transport = ScriptedTransportBuilder::new().open_error(errno::EMFILE).build();

        let err = Socket::new(transport, MockLoop::new(), Domain::Sp, Protocol::Pair).err().unwrap();

        assert_eq!(err.code(), Some(errno::EMFILE));
    }

    #[test]
    fn builder_applies_configuration() {
        let policy = RetryPolicy::Fixed { delay_ms: 5 };
        let socket = Socket::builder(ScriptedTransportBuilder::new().build(), MockLoop::new(), Protocol::Push)
            .domain(Domain::SpRaw)
            .retry_policy(policy.clone())
            .optimistic_send(false)
            .build()
            .unwrap();

        assert_eq!(socket.domain(), Domain::SpRaw);
        assert_eq!(socket.protocol(), Protocol::Push);
        assert_eq!(socket.config().retry, policy);
        assert!(!socket.config().optimistic_send);
        assert_eq!(socket.id(), SocketId(7));
    }

    #[test]
    fn bind_and_connect_enable_reader_once() {
        let (socket, transport, handle) = scripted_socket(ScriptedTransportBuilder::new(), SocketConfig::default());

        assert_eq!(socket.bind("inproc://a"), Ok(EndpointId(1)));
        assert_eq!(socket.connect("inproc://b"), Ok(EndpointId(1)));

        assert!(handle.is_readable_registered(RECV_FD));
        assert_eq!(handle.readable_registrations(), 1);
        assert_eq!(transport.fd_queries(Direction::Receive), 1);
    }

    #[test]
    fn bind_tolerates_missing_receive_descriptor() {
        let (socket, transport, handle) =
            scripted_socket(ScriptedTransportBuilder::new().unsupported(Direction::Receive), SocketConfig::default());

        assert!(socket.bind("inproc://a").is_ok());
        assert_eq!(handle.readable_registrations(), 0);
        assert_eq!(transport.fd_queries(Direction::Receive), 1);
    }

    #[test]
    fn bind_failure_registers_nothing() {
        let (socket, _transport, handle) =
            scripted_socket(ScriptedTransportBuilder::new().endpoint_error(errno::EADDRINUSE), SocketConfig::default());

        let err = socket.bind("inproc://a").unwrap_err();

        assert_eq!(err.code(), Some(errno::EADDRINUSE));
        assert_eq!(handle.readable_registrations(), 0);
    }

    #[test]
    fn refused_registration_is_a_loop_error() {
        let (socket, _transport, handle) = scripted_socket(ScriptedTransportBuilder::new(), SocketConfig::default());
        handle.refuse_registrations(CommonErrors::NoSpaceLeft);

        assert_eq!(socket.connect("inproc://a"), Err(SocketError::Loop(CommonErrors::NoSpaceLeft)));
    }

    #[test]
    fn subscribe_passes_topics_to_transport() {
        let (socket, transport, _handle) = scripted_socket(ScriptedTransportBuilder::new(), SocketConfig::default());

        socket.subscribe(b"topic").unwrap();
        socket.unsubscribe(b"topic").unwrap();

        assert_eq!(
            transport.options(),
            vec![SocketOption::Subscribe(b"topic".to_vec()), SocketOption::Unsubscribe(b"topic".to_vec())]
        );
    }

    #[test]
    fn drop_unregisters_and_closes() {
        let (socket, transport, handle) = scripted_socket(ScriptedTransportBuilder::new(), SocketConfig::default());
        socket.bind("inproc://a").unwrap();

        drop(socket);

        assert!(!handle.is_readable_registered(RECV_FD));
        assert_eq!(transport.closed(), 1);
    }

    #[test]
    fn timers_outliving_the_socket_do_nothing() {
        let config = SocketConfig {
            retry: RetryPolicy::Fixed { delay_ms: 20 },
            ..SocketConfig::default()
        };
        let (socket, _transport, handle) = scripted_socket(ScriptedTransportBuilder::new(), config);
        socket.bind("inproc://a").unwrap();
        assert!(handle.fire_readable(RECV_FD));
        assert_eq!(handle.scheduled_delays(), vec![Duration::from_millis(20)]);

        drop(socket);

        assert_eq!(handle.run_timers(), 1);
        assert!(!handle.is_readable_registered(RECV_FD));
        assert_eq!(handle.readable_registrations(), 1);
    }
}
