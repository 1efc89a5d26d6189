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

///
/// Helper state used to implement the futures of this crate.
///
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub(crate) enum FutureState {
    #[default]
    New, // called first time
    Polled,   // polled 1..N times
    Finished, // done
}

impl FutureState {
    ///
    /// Assigns a state from `internal` and translates it into a [`::core::task::Poll`]
    ///
    pub(crate) fn assign_and_propagate<T>(&mut self, internal: FutureInternalReturn<T>) -> ::core::task::Poll<T> {
        *self = internal.0;
        internal.into()
    }
}

///
/// Connects the type-less [`FutureState`] with the value returned once the future is ready.
///
pub(crate) struct FutureInternalReturn<T>(FutureState, Option<T>);

impl<T> FutureInternalReturn<T> {
    ///
    /// Use when poll returns `Pending`
    ///
    pub(crate) fn polled() -> Self {
        Self(FutureState::Polled, None)
    }

    ///
    /// Use when the future is `Ready` with value
    ///
    pub(crate) fn ready(value: T) -> Self {
        Self(FutureState::Finished, Some(value))
    }
}

#[allow(clippy::from_over_into)] // Only one direction conversion
impl<T> Into<::core::task::Poll<T>> for FutureInternalReturn<T> {
    fn into(self) -> ::core::task::Poll<T> {
        match self.1 {
            Some(v) => ::core::task::Poll::Ready(v),
            None => ::core::task::Poll::Pending,
        }
    }
}
