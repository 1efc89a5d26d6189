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

use super::IoEventInterest;
use ::core::time::Duration;
use foundation::{not_recoverable_error, prelude::*};
use libc::{close, fcntl, pipe, poll, pollfd, read, write, EAGAIN, EINTR, FD_CLOEXEC, F_SETFD, F_SETFL, O_CLOEXEC, O_NONBLOCK, POLLERR, POLLHUP, POLLIN, POLLNVAL, POLLOUT, POLLPRI};
use std::collections::HashMap;
use std::ffi;
use std::os::fd::RawFd;
use std::sync::Arc;

///
/// Waits for readiness of registered file descriptors with poll(2).
/// Index 0 of the poll set is always the read end of the internal wake pipe.
///
pub(crate) struct Selector {
    fds: Fds,
    fd_capacity: usize,
    waker: Arc<InternalWaker>,
}

impl Selector {
    /// Create a selector able to watch `fd_capacity` file descriptors.
    pub(crate) fn new(fd_capacity: usize) -> Result<Self, CommonErrors> {
        let waker = InternalWaker::new().ok_or(CommonErrors::GenericError)?;
        let mut fds = Fds::new(1 + fd_capacity);
        fds.add(waker.read_fd, IoEventInterest::READABLE)?;

        Ok(Selector {
            fds,
            fd_capacity,
            waker: Arc::new(waker),
        })
    }

    /// Sets the interest for `fd`, adding or removing the fd from the poll set as needed.
    ///
    /// Returns `Err(CommonErrors::NoSpaceLeft)` if capacity was reached.
    /// Returns `Err(CommonErrors::WrongArgs)` if the fd is negative.
    pub(crate) fn set_interest(&mut self, fd: RawFd, interest: IoEventInterest) -> Result<(), CommonErrors> {
        if fd.is_negative() {
            return Err(CommonErrors::WrongArgs);
        }

        if fd == self.waker.read_fd {
            return Err(CommonErrors::WrongArgs);
        }

        if interest.is_empty() {
            self.fds.remove(fd);
            return Ok(());
        }

        if self.fds.contains(fd) {
            self.fds.update(fd, interest);
            Ok(())
        } else {
            self.fds.add(fd, interest)
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.fd_capacity
    }

    pub(crate) fn len(&self) -> usize {
        self.fds.len() - 1
    }

    pub(crate) fn unparker(&self) -> Unparker {
        Unparker(Arc::clone(&self.waker))
    }

    /// Block until a registered fd is ready, the selector is unparked or `timeout` elapsed (`None` waits forever).
    ///
    /// Ready fds are pushed to `events`. An fd that reported an error or hang up is reported as both readable and
    /// writable once and then skipped until its interest is set again.
    pub(crate) fn select(&mut self, events: &mut Vec<(RawFd, IoEventInterest)>, timeout: Option<Duration>) {
        let timeout = timeout.map(poll_timeout_ms).unwrap_or(-1);

        let poll_result = loop {
            let rc = unsafe { poll(self.fds.pollfds.as_mut_ptr(), self.fds.pollfds.len() as libc::nfds_t, timeout) };

            if rc == -1 {
                let err = std::io::Error::last_os_error().raw_os_error().unwrap_or(0);
                match err {
                    EINTR => continue,
                    _ => not_recoverable_error!(with err, "Poll failed with error: This is a bug in implementation!"),
                }
            }

            break rc as usize;
        };

        if poll_result == 0 {
            return;
        }

        let mut events_processed = 0;

        if self.fds.pollfds[0].revents != 0 {
            InternalWaker::clear_read_fd(self.waker.read_fd);
            self.fds.pollfds[0].revents = 0;
            events_processed += 1;
        }

        for pollfd in self.fds.pollfds.iter_mut().skip(1) {
            if events_processed == poll_result {
                break;
            }

            if pollfd.revents == 0 {
                continue;
            }

            if pollfd.revents & (POLLHUP | POLLERR | POLLNVAL) != 0 {
                // Report everything the fd waits for, then mute it. Negative fds are ignored by poll until the
                // interest is set again.
                events.push((pollfd.fd, interest_from_poll_events(pollfd.events)));
                pollfd.fd = !pollfd.fd;
            } else {
                events.push((pollfd.fd, interest_from_poll_events(pollfd.revents)));
            }

            events_processed += 1;
        }
    }
}

fn poll_timeout_ms(timeout: Duration) -> i32 {
    // Round up so the loop does not wake before a timer is due.
    let ms = timeout.as_nanos().div_ceil(1_000_000);
    ms.min(i32::MAX as u128) as i32
}

fn poll_events_from_interest(interest: &IoEventInterest) -> i16 {
    let mut events = 0;

    if interest.is_readable() {
        events |= POLLIN | POLLPRI;
    }
    if interest.is_writable() {
        events |= POLLOUT;
    }

    events
}

fn interest_from_poll_events(events: i16) -> IoEventInterest {
    let mut interest = IoEventInterest(0);

    if events & (POLLIN | POLLPRI) != 0 {
        interest = interest | IoEventInterest::READABLE;
    }

    if events & POLLOUT != 0 {
        interest = interest | IoEventInterest::WRITABLE;
    }

    interest
}

struct Fds {
    fd_to_index: HashMap<RawFd, usize>,
    pollfds: Vec<pollfd>,
    capacity: usize,
}

impl Fds {
    fn new(capacity: usize) -> Self {
        Self {
            fd_to_index: HashMap::with_capacity(capacity),
            pollfds: Vec::with_capacity(capacity),
            capacity,
        }
    }

    fn add(&mut self, fd: RawFd, interest: IoEventInterest) -> Result<(), CommonErrors> {
        if self.pollfds.len() == self.capacity {
            return Err(CommonErrors::NoSpaceLeft);
        }

        self.fd_to_index.insert(fd, self.pollfds.len());
        self.pollfds.push(pollfd {
            fd,
            events: poll_events_from_interest(&interest),
            revents: 0,
        });

        Ok(())
    }

    fn update(&mut self, fd: RawFd, interest: IoEventInterest) {
        if let Some(&index) = self.fd_to_index.get(&fd) {
            let pollfd = &mut self.pollfds[index];
            // Setting the interest again re-enables an fd that was muted after an error.
            pollfd.fd = fd;
            pollfd.events = poll_events_from_interest(&interest);
        }
    }

    fn remove(&mut self, fd: RawFd) {
        if let Some(index) = self.fd_to_index.remove(&fd) {
            self.pollfds.swap_remove(index);

            // If index wasn't last, the former last entry now lives at index.
            if index < self.pollfds.len() {
                let moved = self.pollfds[index].fd;
                // A negated fd was muted by select, negate it back to get the original fd.
                let moved = if moved.is_negative() { !moved } else { moved };
                self.fd_to_index.insert(moved, index);
            }
        }
    }

    fn contains(&self, fd: RawFd) -> bool {
        self.fd_to_index.contains_key(&fd)
    }

    fn len(&self) -> usize {
        self.pollfds.len()
    }
}

///
/// Unblocks a `select` in progress, or makes the next one return at once. Can be used from any thread.
///
#[derive(Clone)]
pub struct Unparker(Arc<InternalWaker>);

impl Unparker {
    pub fn unpark(&self) {
        self.0.wake();
    }
}

struct InternalWaker {
    read_fd: RawFd,
    write_fd: RawFd,
}

impl InternalWaker {
    /// Creates a pipe and sets O_NONBLOCK and O_CLOEXEC on both ends, as pipe2 is not available everywhere.
    fn pipe_with_flags(fds: &mut [RawFd; 2], flags: i32) -> i32 {
        if unsafe { pipe(fds.as_mut_ptr()) } == -1 {
            return -1;
        }

        for fd in fds.iter() {
            let failed = unsafe { (flags & O_NONBLOCK != 0 && fcntl(*fd, F_SETFL, O_NONBLOCK) == -1) || (flags & O_CLOEXEC != 0 && fcntl(*fd, F_SETFD, FD_CLOEXEC) == -1) };

            if failed {
                unsafe {
                    close(fds[0]);
                    close(fds[1]);
                }
                return -1;
            }
        }
        0
    }

    fn new() -> Option<Self> {
        let mut fds: [RawFd; 2] = [-1, -1];

        match Self::pipe_with_flags(&mut fds, O_NONBLOCK | O_CLOEXEC) {
            -1 => None,
            _ => Some(InternalWaker {
                read_fd: fds[0],
                write_fd: fds[1],
            }),
        }
    }

    fn wake(&self) {
        let flag = 1_u8;
        loop {
            let res = unsafe { write(self.write_fd, &flag as *const u8 as *const ffi::c_void, 1) };

            match res {
                0 => {
                    not_recoverable_error!("There shall be no write with 0 bytes written, some error happened");
                }
                -1 => {
                    let err = std::io::Error::last_os_error().raw_os_error().unwrap_or(0);
                    match err {
                        // A full pipe is readable, so poll wakes up anyway.
                        EAGAIN => break,
                        EINTR => (),
                        _ => not_recoverable_error!(with err, "InternalWaker write failed"),
                    }
                }
                _ => break,
            }
        }
    }

    fn clear_read_fd(fd: RawFd) {
        let mut buff: [u8; 32] = Default::default();
        loop {
            let res = unsafe { read(fd, buff.as_mut_ptr().cast::<ffi::c_void>(), buff.len()) };
            if res == -1 {
                match std::io::Error::last_os_error().raw_os_error().unwrap_or(0) {
                    EAGAIN => break,
                    EINTR => (),
                    e => {
                        warn!("InternalWaker read failed with error {}", e);
                        break;
                    }
                }
            } else if res == 0 {
                break;
            }
        }
    }
}

impl Drop for InternalWaker {
    fn drop(&mut self) {
        if unsafe { close(self.read_fd) } == -1 {
            warn!("InternalWaker failed to close read");
        }

        if unsafe { close(self.write_fd) } == -1 {
            warn!("InternalWaker failed to close write");
        }
    }
}
