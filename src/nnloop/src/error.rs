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

use ::core::fmt;

use foundation::prelude::CommonErrors;

use crate::transport::{errno, Direction, NativeRc, Transport};

///
/// How a transport error code is handled by the socket.
///
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// Nothing ready or the peer cannot accept now. Retried after a delay, never returned to the caller.
    TransientUnavailable,
    /// The socket type lacks the requested readiness descriptor. Tolerated.
    UnsupportedOption,
    /// Every other code. Returned to the waiting caller once.
    Transport,
}

impl ErrorClass {
    pub fn of(code: i32) -> ErrorClass {
        match code {
            errno::EAGAIN => ErrorClass::TransientUnavailable,
            errno::ENOPROTOOPT => ErrorClass::UnsupportedOption,
            _ => ErrorClass::Transport,
        }
    }
}

///
/// A failure reported by the native transport, with the transport's description of the code.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportError {
    code: i32,
    message: String,
}

impl TransportError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    ///
    /// Builds the error for a failed native call from the transport's current error state.
    /// Must be called right after the call that returned `rc`, before any other transport call.
    ///
    pub fn from_native<T: Transport + ?Sized>(transport: &T, rc: NativeRc) -> Self {
        debug_assert!(rc.0 < 0, "Only negative return codes carry an error");

        let code = transport.last_error();
        Self::new(code, transport.error_string(code))
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn class(&self) -> ErrorClass {
        ErrorClass::of(self.code)
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for TransportError {}

#[derive(Clone, Debug, PartialEq)]
pub enum SocketError {
    /// An operation in this direction is already pending.
    Busy(Direction),
    Transport(TransportError),
    /// The event loop refused the registration.
    Loop(CommonErrors),
}

impl SocketError {
    /// Transport error code, if the failure came from the transport.
    pub fn code(&self) -> Option<i32> {
        match self {
            SocketError::Transport(e) => Some(e.code()),
            _ => None,
        }
    }
}

impl fmt::Display for SocketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocketError::Busy(direction) => write!(f, "a {} operation is already pending", direction),
            SocketError::Transport(e) => write!(f, "transport error: {}", e),
            SocketError::Loop(e) => write!(f, "event loop error: {}", e),
        }
    }
}

impl std::error::Error for SocketError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SocketError::Transport(e) => Some(e),
            SocketError::Loop(e) => Some(e),
            SocketError::Busy(_) => None,
        }
    }
}

impl From<TransportError> for SocketError {
    fn from(e: TransportError) -> Self {
        SocketError::Transport(e)
    }
}

impl From<CommonErrors> for SocketError {
    fn from(e: CommonErrors) -> Self {
        SocketError::Loop(e)
    }
}
