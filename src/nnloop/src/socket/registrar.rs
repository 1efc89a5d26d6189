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

use super::path::Signaled;
use super::SocketInner;
use crate::error::{ErrorClass, SocketError, TransportError};
use crate::event_loop::{IoCallback, LoopHandle};
use crate::transport::{Direction, Transport};
use ::core::time::Duration;
use foundation::prelude::*;
use std::os::fd::RawFd;
use std::rc::Rc;

#[derive(Default)]
struct Slot {
    fd: Option<RawFd>,
    /// The transport reported that this direction has no descriptor.
    unsupported: bool,
    armed: bool,
    /// Bumped on every arm and disarm. A delayed re-arm only runs if nothing changed since it was scheduled.
    generation: u64,
}

///
/// Readiness registrations of one socket, one slot per direction.
///
#[derive(Default)]
pub(crate) struct Registrar {
    receive: Slot,
    send: Slot,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Activation {
    Armed,
    AlreadyArmed,
    /// The socket type has no descriptor for this direction.
    Unsupported,
}

impl Registrar {
    fn slot(&self, direction: Direction) -> &Slot {
        match direction {
            Direction::Receive => &self.receive,
            Direction::Send => &self.send,
        }
    }

    fn slot_mut(&mut self, direction: Direction) -> &mut Slot {
        match direction {
            Direction::Receive => &mut self.receive,
            Direction::Send => &mut self.send,
        }
    }

    pub(crate) fn is_armed(&self, direction: Direction) -> bool {
        self.slot(direction).armed
    }

    pub(crate) fn generation(&self, direction: Direction) -> u64 {
        self.slot(direction).generation
    }
}

impl<T: Transport + 'static, L: LoopHandle> SocketInner<T, L> {
    ///
    /// Registers the readiness descriptor of `direction` with the loop. The descriptor is queried once per socket
    /// and direction and cached afterwards.
    ///
    pub(crate) fn enable(self: &Rc<Self>, direction: Direction) -> Result<Activation, SocketError> {
        let cached = {
            let registrar = self.registrar.borrow();
            if registrar.is_armed(direction) {
                return Ok(Activation::AlreadyArmed);
            }
            let slot = registrar.slot(direction);
            if slot.unsupported {
                return Ok(Activation::Unsupported);
            }
            slot.fd
        };

        let fd = match cached {
            Some(fd) => fd,
            None => match self.transport.readiness_fd(self.id, direction) {
                Ok(fd) => fd,
                Err(rc) => {
                    let err = TransportError::from_native(&self.transport, rc);
                    if err.class() == ErrorClass::UnsupportedOption {
                        self.registrar.borrow_mut().slot_mut(direction).unsupported = true;
                        debug!("Socket {:?} has no {} readiness descriptor, operations are attempted directly", self.id, direction);
                        return Ok(Activation::Unsupported);
                    }
                    return Err(err.into());
                }
            },
        };

        let weak = Rc::downgrade(self);
        let callback: IoCallback = Rc::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.on_ready(direction);
            }
        });

        match direction {
            Direction::Receive => self.handle.register_readable(fd, callback)?,
            // nanomsg's send descriptor reports through POLLIN, so this fires on every turn while a send is pending
            Direction::Send => self.handle.register_writable(fd, callback)?,
        }

        let mut registrar = self.registrar.borrow_mut();
        let slot = registrar.slot_mut(direction);
        slot.fd = Some(fd);
        slot.armed = true;
        slot.generation += 1;

        trace!("Socket {:?}: {} readiness armed on fd {}", self.id, direction, fd);
        Ok(Activation::Armed)
    }

    /// Removes the registration of `direction`, if any. Pending delayed re-arms become stale.
    pub(crate) fn disable(&self, direction: Direction) {
        let armed_fd = {
            let mut registrar = self.registrar.borrow_mut();
            let slot = registrar.slot_mut(direction);
            slot.generation += 1;

            if slot.armed {
                slot.armed = false;
                slot.fd
            } else {
                None
            }
        };

        if let Some(fd) = armed_fd {
            match direction {
                Direction::Receive => self.handle.unregister_readable(fd),
                Direction::Send => self.handle.unregister_writable(fd),
            };
            trace!("Socket {:?}: {} readiness disarmed on fd {}", self.id, direction, fd);
        }
    }

    pub(crate) fn schedule_rearm(self: &Rc<Self>, direction: Direction, delay: Duration) {
        let generation = self.registrar.borrow().generation(direction);
        let weak = Rc::downgrade(self);

        self.handle.schedule_after(
            delay,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.rearm(direction, generation);
                }
            }),
        );
    }

    fn rearm(self: &Rc<Self>, direction: Direction, generation: u64) {
        if self.registrar.borrow().generation(direction) != generation {
            trace!("Socket {:?}: stale {} re-arm ignored", self.id, direction);
            return;
        }

        let outcome = self.enable(direction);
        let waker = {
            let mut path = self.path(direction).borrow_mut();
            match outcome {
                Ok(Activation::Armed | Activation::AlreadyArmed) => path.rearmed(true),
                Ok(Activation::Unsupported) => path.rearmed(false),
                Err(err) => {
                    if path.is_idle() {
                        warn!("Socket {:?}: re-arming {} readiness failed: {}", self.id, direction, err);
                    }
                    path.fail(err)
                }
            }
        };

        if let Some(waker) = waker {
            waker.wake();
        }
    }

    ///
    /// Readiness callback. The registration is removed first so the descriptor does not keep firing while the
    /// awaiting task has not run yet.
    ///
    fn on_ready(self: &Rc<Self>, direction: Direction) {
        self.disable(direction);

        let signaled = self.path(direction).borrow_mut().signal();
        match signaled {
            Signaled::Woken(Some(waker)) => waker.wake(),
            Signaled::Idle if direction == Direction::Receive => {
                let delay = self.config.retry.delay(0);
                debug!("Socket {:?}: receive not awaited, delaying reader by {:?}", self.id, delay);
                self.schedule_rearm(direction, delay);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SocketConfig;
    use crate::socket::tests::scripted_socket;
    use crate::testing::{ScriptedTransportBuilder, RECV_FD, SEND_FD};

    #[test]
    fn enable_is_idempotent() {
        let (socket, transport, handle) = scripted_socket(ScriptedTransportBuilder::new(), SocketConfig::default());
        let inner = &socket.inner;

        assert_eq!(inner.enable(Direction::Send), Ok(Activation::Armed));
        assert_eq!(inner.enable(Direction::Send), Ok(Activation::AlreadyArmed));

        assert!(inner.registrar.borrow().is_armed(Direction::Send));
        assert!(!inner.registrar.borrow().is_armed(Direction::Receive));
        assert!(handle.is_writable_registered(SEND_FD));
        assert_eq!(handle.writable_registrations(), 1);
        assert_eq!(transport.fd_queries(Direction::Send), 1);
    }

    #[test]
    fn disable_unregisters_and_bumps_generation() {
        let (socket, transport, handle) = scripted_socket(ScriptedTransportBuilder::new(), SocketConfig::default());
        let inner = &socket.inner;
        inner.enable(Direction::Receive).unwrap();
        let armed_generation = inner.registrar.borrow().generation(Direction::Receive);

        inner.disable(Direction::Receive);
        inner.disable(Direction::Receive);

        assert!(!handle.is_readable_registered(RECV_FD));
        assert_eq!(inner.registrar.borrow().generation(Direction::Receive), armed_generation + 2);

        assert_eq!(inner.enable(Direction::Receive), Ok(Activation::Armed));
        assert_eq!(transport.fd_queries(Direction::Receive), 1);
    }

    #[test]
    fn missing_descriptor_is_remembered() {
        let (socket, transport, handle) =
            scripted_socket(ScriptedTransportBuilder::new().unsupported(Direction::Send), SocketConfig::default());
        let inner = &socket.inner;

        assert_eq!(inner.enable(Direction::Send), Ok(Activation::Unsupported));
        assert_eq!(inner.enable(Direction::Send), Ok(Activation::Unsupported));

        assert_eq!(transport.fd_queries(Direction::Send), 1);
        assert_eq!(handle.writable_registrations(), 0);
    }
}
