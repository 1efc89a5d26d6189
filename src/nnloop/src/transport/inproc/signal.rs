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

use foundation::prelude::*;
use std::io::{ErrorKind, Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::net::UnixStream;

///
/// A level signal backed by a socket pair. The read end is readable while the signal is raised.
/// The write end is never filled, so it polls as writable at all times.
///
pub(crate) struct Signal {
    reader: UnixStream,
    writer: UnixStream,
    raised: bool,
}

impl Signal {
    pub(crate) fn new() -> std::io::Result<Self> {
        let (reader, writer) = UnixStream::pair()?;
        reader.set_nonblocking(true)?;
        writer.set_nonblocking(true)?;

        Ok(Self {
            reader,
            writer,
            raised: false,
        })
    }

    pub(crate) fn raise(&mut self) {
        if self.is_raised() {
            return;
        }

        match (&self.writer).write(&[1_u8]) {
            Ok(_) => self.raised = true,
            // Buffer full means the reader is readable anyway.
            Err(e) if e.kind() == ErrorKind::WouldBlock => self.raised = true,
            Err(e) => warn!("Failed to raise inproc signal: {}", e),
        }
    }

    pub(crate) fn clear(&mut self) {
        if !self.raised {
            return;
        }

        let mut buff = [0_u8; 32];
        loop {
            match (&self.reader).read(&mut buff) {
                Ok(0) => break,
                Ok(_) => continue,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!("Failed to clear inproc signal: {}", e);
                    break;
                }
            }
        }
        self.raised = false;
    }

    pub(crate) fn readable_fd(&self) -> RawFd {
        self.reader.as_raw_fd()
    }

    pub(crate) fn writable_fd(&self) -> RawFd {
        self.writer.as_raw_fd()
    }

    pub(crate) fn is_raised(&self) -> bool {
        self.raised
    }
}
