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

pub use crate::poller::TestingFuturePoller;
pub use crate::script::{Script, ScriptBuilder};
pub use crate::waker::{noop_waker, CountingWaker};
pub use crate::{assert_poll_pending, assert_poll_ready};
