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

use super::{RawMsg, Transport};

///
/// Scoped owner of a message buffer allocated by the transport. The buffer is released exactly once, when the
/// guard goes out of scope.
///
pub struct ForeignMsg<'t, T: Transport + ?Sized> {
    transport: &'t T,
    raw: Option<RawMsg>,
}

impl<'t, T: Transport + ?Sized> ForeignMsg<'t, T> {
    ///
    /// # Safety
    /// `raw` must come from a successful `recv` on `transport` and must not be owned by anything else.
    ///
    pub unsafe fn new(transport: &'t T, raw: RawMsg) -> Self {
        Self { transport, raw: Some(raw) }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match &self.raw {
            // SAFETY: the transport keeps `len` bytes at `ptr` alive until the message is released in drop
            Some(raw) => unsafe { ::core::slice::from_raw_parts(raw.ptr.as_ptr(), raw.len) },
            None => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.raw.as_ref().map_or(0, |raw| raw.len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies the message out of transport memory.
    pub fn to_vec(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl<T: Transport + ?Sized> Drop for ForeignMsg<'_, T> {
    fn drop(&mut self) {
        if let Some(raw) = self.raw.take() {
            // SAFETY: guaranteed by the contract of `new`, and `take` makes this the only release
            unsafe { self.transport.release(raw) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransportBuilder;
    use crate::transport::{MsgFlags, SocketId};

    #[test]
    fn copies_bytes_and_releases_once() {
        let transport = ScriptedTransportBuilder::new().recv_results(vec![Ok(b"payload".to_vec())]).build();

        let raw = transport.recv(SocketId(1), MsgFlags::DONTWAIT).unwrap();
        let copied = {
            let msg = unsafe { ForeignMsg::new(&transport, raw) };
            assert_eq!(msg.len(), 7);
            msg.to_vec()
        };

        assert_eq!(copied, b"payload");
        assert_eq!(transport.released(), 1);
    }

    #[test]
    fn releases_on_early_exit() {
        let transport = ScriptedTransportBuilder::new().recv_results(vec![Ok(Vec::new())]).build();

        let raw = transport.recv(SocketId(1), MsgFlags::DONTWAIT).unwrap();
        let result: Result<Vec<u8>, ()> = (|| {
            let msg = unsafe { ForeignMsg::new(&transport, raw) };
            if msg.is_empty() {
                return Err(());
            }
            Ok(msg.to_vec())
        })();

        assert!(result.is_err());
        assert_eq!(transport.released(), 1);
    }
}
