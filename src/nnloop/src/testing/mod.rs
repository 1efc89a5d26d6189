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

//! Test doubles for the two collaborators of a socket: a loop driven by hand and a transport returning scripted
//! results.

mod mock_loop;
mod scripted;

pub use mock_loop::MockLoop;
pub use scripted::{ScriptedTransport, ScriptedTransportBuilder, RECV_FD, SEND_FD};
