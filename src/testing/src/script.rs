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

use std::collections::VecDeque;

///
/// A scripted sequence of results handed out one per call, with call-count verification on drop.
/// Values queued with `will_once` are returned FIFO, after that the `will_repeatedly` value is returned.
///
pub struct Script<OutType> {
    call_count: usize,
    expected_count: Option<usize>,
    min_count: usize,
    returns: VecDeque<OutType>,
    repeated: Option<OutType>,
    should_ignore_check_at_drop: bool,
}

pub struct ScriptBuilder<OutType>(Script<OutType>);

impl<OutType> Default for ScriptBuilder<OutType> {
    fn default() -> Self {
        Self::new()
    }
}

impl<OutType> ScriptBuilder<OutType> {
    pub fn new() -> ScriptBuilder<OutType> {
        Self(Script {
            call_count: 0,
            expected_count: None,
            min_count: 0,
            returns: VecDeque::new(),
            repeated: None,
            should_ignore_check_at_drop: false,
        })
    }

    ///
    /// Set how many times exactly `next()` must be invoked
    ///
    pub fn times(mut self, count: usize) -> Self {
        self.0.expected_count = Some(count);
        self
    }

    pub fn will_once(mut self, ret_val: OutType) -> Self {
        if self.0.repeated.is_some() {
            self.0.should_ignore_check_at_drop = true;
            panic!("will_once() called after will_repeatedly()!")
        }

        self.0.returns.push_back(ret_val);
        self.0.min_count += 1;
        self
    }

    ///
    /// Repeat `count` copies of `ret_val`, as if `will_once` was called `count` times
    ///
    pub fn will_n_times(mut self, count: usize, ret_val: OutType) -> Self
    where
        OutType: Clone,
    {
        for _ in 0..count {
            self = self.will_once(ret_val.clone());
        }
        self
    }

    pub fn will_repeatedly(mut self, ret_val: OutType) -> Self {
        if self.0.repeated.is_some() {
            self.0.should_ignore_check_at_drop = true;
            panic!("will_repeatedly() is called more than once!")
        }

        self.0.repeated = Some(ret_val);
        self
    }

    ///
    /// The script is not checked for its call count when dropped
    ///
    pub fn unchecked(mut self) -> Self {
        self.0.should_ignore_check_at_drop = true;
        self
    }

    pub fn build(self) -> Script<OutType> {
        self.0
    }
}

impl<OutType: Clone> Script<OutType> {
    pub fn next(&mut self) -> OutType {
        self.call_count += 1;

        if let Some(value) = self.returns.pop_front() {
            return value;
        }

        match &self.repeated {
            Some(value) => value.clone(),
            None => {
                self.should_ignore_check_at_drop = true;
                panic!("Script exhausted after {} calls", self.call_count - 1);
            }
        }
    }
}

impl<OutType> Script<OutType> {
    pub fn call_count(&self) -> usize {
        self.call_count
    }

    pub fn remaining(&self) -> usize {
        self.returns.len()
    }
}

impl<OutType> Drop for Script<OutType> {
    fn drop(&mut self) {
        if self.should_ignore_check_at_drop || std::thread::panicking() {
            return;
        }

        match self.expected_count {
            Some(expected) => assert_eq!(
                self.call_count, expected,
                "Script is called {} times, but should be {} times!",
                self.call_count, expected
            ),
            None => assert!(
                self.min_count <= self.call_count,
                "Script is called {} times, but should be at least {} times!",
                self.call_count,
                self.min_count
            ),
        }
    }
}
