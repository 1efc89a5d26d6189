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

//! Error codes reported by transports. Native codes match the C library ones, nanomsg specific codes are offset
//! from [`NN_HAUSNUMERO`].

pub const NN_HAUSNUMERO: i32 = 156384712;

pub const EAGAIN: i32 = libc::EAGAIN;
pub const EBADF: i32 = libc::EBADF;
pub const EINVAL: i32 = libc::EINVAL;
pub const EMFILE: i32 = libc::EMFILE;
pub const ENOTSUP: i32 = libc::ENOTSUP;
pub const ENOPROTOOPT: i32 = libc::ENOPROTOOPT;
pub const EPROTONOSUPPORT: i32 = libc::EPROTONOSUPPORT;
pub const EADDRINUSE: i32 = libc::EADDRINUSE;
pub const ETERM: i32 = NN_HAUSNUMERO + 53;
pub const EFSM: i32 = NN_HAUSNUMERO + 54;

/// Text for `code`, without the `(os error N)` suffix the standard library appends.
pub fn describe(code: i32) -> String {
    match code {
        ETERM => "Nanomsg library was terminated".to_string(),
        EFSM => "Operation cannot be performed in this state".to_string(),
        _ => {
            let text = std::io::Error::from_raw_os_error(code).to_string();
            match text.find(" (os error") {
                Some(end) => text[..end].to_string(),
                None => text,
            }
        }
    }
}
