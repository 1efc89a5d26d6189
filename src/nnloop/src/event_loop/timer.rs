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

use super::TimerCallback;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::Instant;

struct TimerEntry {
    expire_at: Instant,
    // Keeps timers with the same deadline in registration order.
    seq: u64,
    callback: TimerCallback,
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.expire_at == other.expire_at && self.seq == other.seq
    }
}

impl Eq for TimerEntry {}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.expire_at, self.seq).cmp(&(other.expire_at, other.seq))
    }
}

///
/// One-shot timers ordered by deadline.
///
#[derive(Default)]
pub(crate) struct TimerQueue {
    heap: BinaryHeap<Reverse<TimerEntry>>,
    next_seq: u64,
}

impl TimerQueue {
    pub(crate) fn register_timeout(&mut self, expire_at: Instant, callback: TimerCallback) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(TimerEntry { expire_at, seq, callback }));
    }

    /// Earliest deadline, if any timer is pending.
    pub(crate) fn next_process_time(&self) -> Option<Instant> {
        self.heap.peek().map(|Reverse(entry)| entry.expire_at)
    }

    /// Removes and returns the callbacks of all timers due at `now`, earliest first.
    pub(crate) fn take_expired(&mut self, now: Instant) -> Vec<TimerCallback> {
        let mut expired = Vec::new();

        while self.heap.peek().is_some_and(|Reverse(entry)| entry.expire_at <= now) {
            if let Some(Reverse(entry)) = self.heap.pop() {
                expired.push(entry.callback);
            }
        }

        expired
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    pub(crate) fn clear(&mut self) {
        self.heap.clear();
    }
}
