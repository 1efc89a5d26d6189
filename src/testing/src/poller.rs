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

use crate::waker::noop_waker;

use ::core::future::Future;
use ::core::pin::Pin;
use ::core::task::{Context, Poll, Waker};

///
/// Helper struct for polling a future by hand in tests.
/// Accepts futures that borrow from the test body and are not `Send`.
///
pub struct TestingFuturePoller<'a, OutType> {
    future: Pin<Box<dyn Future<Output = OutType> + 'a>>,
}

impl<'a, OutType> TestingFuturePoller<'a, OutType> {
    pub fn new(future: impl Future<Output = OutType> + 'a) -> TestingFuturePoller<'a, OutType> {
        Self { future: Box::pin(future) }
    }

    ///
    /// Poll the internal future once with a specified waker
    ///
    pub fn poll_with_waker(&mut self, waker: &Waker) -> Poll<OutType> {
        let mut cx = Context::from_waker(waker);
        self.future.as_mut().poll(&mut cx)
    }

    ///
    /// Poll the internal future repeatedly for n times with a specified waker
    ///
    pub fn poll_n_with_waker(&mut self, n: usize, waker: &Waker) -> Poll<OutType> {
        let mut cx = Context::from_waker(waker);
        let mut result: Poll<OutType> = Poll::Pending;

        for _ in 0..n {
            result = self.future.as_mut().poll(&mut cx);
            if result.is_ready() {
                break;
            }
        }
        result
    }

    ///
    /// Poll the internal future once with a noop waker
    ///
    pub fn poll(&mut self) -> Poll<OutType> {
        self.poll_with_waker(&noop_waker())
    }

    pub fn poll_n(&mut self, n: usize) -> Poll<OutType> {
        self.poll_n_with_waker(n, &noop_waker())
    }
}
