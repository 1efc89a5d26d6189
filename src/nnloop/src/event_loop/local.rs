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

use super::selector::{Selector, Unparker};
use super::sleep::Sleep;
use super::timer::TimerQueue;
use super::{IoCallback, IoEventInterest, LoopHandle, TimerCallback};
use ::core::future::Future;
use ::core::pin::{pin, Pin};
use ::core::sync::atomic::{AtomicBool, Ordering};
use ::core::task::{Context, Poll, Waker};
use ::core::time::Duration;
use foundation::{not_recoverable_error, prelude::*};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::os::fd::RawFd;
use std::rc::Rc;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::Wake;
use std::time::Instant;

pub const DEFAULT_FD_CAPACITY: usize = 256;

// Task id of the future driven by `block_on`.
const MAIN_TASK: usize = 0;

type LocalTask = Pin<Box<dyn Future<Output = ()>>>;

#[derive(Default)]
struct FdCallbacks {
    readable: Option<IoCallback>,
    writable: Option<IoCallback>,
}

impl FdCallbacks {
    fn interest(&self) -> IoEventInterest {
        let mut interest = IoEventInterest::default();
        if self.readable.is_some() {
            interest = interest | IoEventInterest::READABLE;
        }
        if self.writable.is_some() {
            interest = interest | IoEventInterest::WRITABLE;
        }
        interest
    }
}

///
/// Ids of woken tasks. Wakers may be used from other threads, so this is the only part of the loop behind a lock.
///
struct ReadyQueue {
    ids: Mutex<Vec<usize>>,
    unparker: Unparker,
}

impl ReadyQueue {
    fn push(&self, id: usize) {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner).push(id);
        self.unparker.unpark();
    }

    fn take(&self) -> Vec<usize> {
        ::core::mem::take(&mut *self.ids.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn is_empty(&self) -> bool {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner).is_empty()
    }
}

struct TaskWaker {
    id: usize,
    scheduled: AtomicBool,
    queue: Arc<ReadyQueue>,
}

impl Wake for TaskWaker {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        if !self.scheduled.swap(true, Ordering::AcqRel) {
            self.queue.push(self.id);
        }
    }
}

struct Shared {
    selector: RefCell<Selector>,
    registrations: RefCell<HashMap<RawFd, FdCallbacks>>,
    timers: RefCell<TimerQueue>,
    tasks: RefCell<HashMap<usize, (LocalTask, Arc<TaskWaker>)>>,
    next_task: Cell<usize>,
    ready: Arc<ReadyQueue>,
}

///
/// Single-threaded event loop: a poll(2) reactor for descriptor readiness, a timer queue and an executor for local
/// (`!Send`) futures.
///
/// Callbacks and tasks run on the thread calling [`EventLoop::block_on`] with no loop state borrowed, so they may
/// register, unregister, schedule and spawn freely.
///
pub struct EventLoop {
    shared: Rc<Shared>,
}

///
/// Cloneable access to an [`EventLoop`], implementing [`LoopHandle`].
///
#[derive(Clone)]
pub struct LocalHandle {
    shared: Rc<Shared>,
}

impl EventLoop {
    pub fn new() -> Result<Self, CommonErrors> {
        Self::with_capacity(DEFAULT_FD_CAPACITY)
    }

    /// Loop able to watch `fd_capacity` descriptors at once.
    pub fn with_capacity(fd_capacity: usize) -> Result<Self, CommonErrors> {
        let selector = Selector::new(fd_capacity)?;
        let ready = Arc::new(ReadyQueue {
            ids: Mutex::new(Vec::new()),
            unparker: selector.unparker(),
        });

        debug!("Event loop created with capacity for {} descriptors", selector.capacity());

        Ok(Self {
            shared: Rc::new(Shared {
                selector: RefCell::new(selector),
                registrations: RefCell::new(HashMap::new()),
                timers: RefCell::new(TimerQueue::default()),
                tasks: RefCell::new(HashMap::new()),
                next_task: Cell::new(MAIN_TASK + 1),
                ready,
            }),
        })
    }

    pub fn handle(&self) -> LocalHandle {
        LocalHandle {
            shared: Rc::clone(&self.shared),
        }
    }

    ///
    /// Runs the loop until `future` completes and returns its output. Spawned tasks make progress meanwhile, the ones
    /// still pending when `future` completes stay queued for the next `block_on`.
    ///
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        let mut future = pin!(future);
        let main_waker = Arc::new(TaskWaker {
            id: MAIN_TASK,
            scheduled: AtomicBool::new(false),
            queue: Arc::clone(&self.shared.ready),
        });
        let waker = Waker::from(Arc::clone(&main_waker));
        waker.wake_by_ref();

        loop {
            let mut output = None;

            // The whole batch is polled even when the main future completes, the ids are gone from the queue.
            for id in self.shared.ready.take() {
                if id == MAIN_TASK {
                    main_waker.scheduled.store(false, Ordering::Release);
                    let mut cx = Context::from_waker(&waker);
                    if let Poll::Ready(value) = future.as_mut().poll(&mut cx) {
                        output = Some(value);
                    }
                } else {
                    self.shared.poll_task(id);
                }
            }

            if let Some(value) = output {
                return value;
            }

            self.turn();
        }
    }

    /// Number of spawned tasks that did not complete yet.
    pub fn pending_tasks(&self) -> usize {
        self.shared.tasks.borrow().len()
    }

    /// One pass of the reactor: waits for readiness or the next timer, then dispatches callbacks.
    fn turn(&self) {
        let timeout = if self.shared.ready.is_empty() {
            self.shared
                .timers
                .borrow()
                .next_process_time()
                .map(|at| at.saturating_duration_since(Instant::now()))
        } else {
            Some(Duration::ZERO)
        };

        let mut events = Vec::new();
        self.shared.selector.borrow_mut().select(&mut events, timeout);

        for (fd, ready) in events {
            if ready.is_readable() {
                if let Some(callback) = self.shared.callback(fd, IoEventInterest::READABLE) {
                    callback();
                }
            }

            // Looked up again, the readable callback may have changed the registrations.
            if ready.is_writable() {
                if let Some(callback) = self.shared.callback(fd, IoEventInterest::WRITABLE) {
                    callback();
                }
            }
        }

        let expired = self.shared.timers.borrow_mut().take_expired(Instant::now());
        for callback in expired {
            callback();
        }
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        // Tasks, timers and callbacks may hold handles to the loop, drop them to break the cycles.
        let tasks = ::core::mem::take(&mut *self.shared.tasks.borrow_mut());
        let registrations = ::core::mem::take(&mut *self.shared.registrations.borrow_mut());
        self.shared.timers.borrow_mut().clear();

        if !tasks.is_empty() {
            debug!("Event loop dropped with {} pending tasks", tasks.len());
        }

        drop(tasks);
        drop(registrations);
    }
}

impl Shared {
    fn callback(&self, fd: RawFd, interest: IoEventInterest) -> Option<IoCallback> {
        let registrations = self.registrations.borrow();
        let entry = registrations.get(&fd)?;

        if interest.is_readable() {
            entry.readable.clone()
        } else {
            entry.writable.clone()
        }
    }

    fn poll_task(&self, id: usize) {
        // Removed while polled, so the task may spawn without a borrow conflict.
        let Some((mut task, waker)) = self.tasks.borrow_mut().remove(&id) else {
            return;
        };

        waker.scheduled.store(false, Ordering::Release);
        let task_waker = Waker::from(Arc::clone(&waker));
        let mut cx = Context::from_waker(&task_waker);

        if task.as_mut().poll(&mut cx).is_pending() {
            self.tasks.borrow_mut().insert(id, (task, waker));
        }
    }

    fn set_callback(&self, fd: RawFd, interest: IoEventInterest, callback: Option<IoCallback>) -> Result<bool, CommonErrors> {
        let mut registrations = self.registrations.borrow_mut();
        let entry = registrations.entry(fd).or_default();

        let previous = if interest.is_readable() {
            ::core::mem::replace(&mut entry.readable, callback)
        } else {
            ::core::mem::replace(&mut entry.writable, callback)
        };

        let combined = entry.interest();
        if combined.is_empty() {
            registrations.remove(&fd);
        }

        if let Err(e) = self.selector.borrow_mut().set_interest(fd, combined) {
            // Restore the previous state, the selector did not take the change.
            let entry = registrations.entry(fd).or_default();
            if interest.is_readable() {
                entry.readable = previous;
            } else {
                entry.writable = previous;
            }
            if entry.interest().is_empty() {
                registrations.remove(&fd);
            }
            return Err(e);
        }

        // The replaced callback may own loop handles, drop it with no borrow held.
        drop(registrations);
        Ok(previous.is_some())
    }
}

impl LocalHandle {
    ///
    /// Queues `future` on the loop. It runs while the loop is driven by [`EventLoop::block_on`].
    ///
    pub fn spawn<F: Future<Output = ()> + 'static>(&self, future: F) {
        let id = self.shared.next_task.get();
        self.shared.next_task.set(id + 1);

        let waker = Arc::new(TaskWaker {
            id,
            scheduled: AtomicBool::new(false),
            queue: Arc::clone(&self.shared.ready),
        });

        self.shared.tasks.borrow_mut().insert(id, (Box::pin(future), Arc::clone(&waker)));
        waker.wake_by_ref();
    }

    /// Future completing after `duration`.
    pub fn sleep(&self, duration: Duration) -> Sleep<LocalHandle> {
        Sleep::new(duration, self.clone())
    }

    /// Number of descriptors currently watched.
    pub fn registered_fds(&self) -> usize {
        self.shared.selector.borrow().len()
    }

    pub fn pending_timers(&self) -> usize {
        self.shared.timers.borrow().len()
    }
}

impl LoopHandle for LocalHandle {
    fn register_readable(&self, fd: RawFd, callback: IoCallback) -> Result<(), CommonErrors> {
        self.shared.set_callback(fd, IoEventInterest::READABLE, Some(callback)).map(|_| ())
    }

    fn register_writable(&self, fd: RawFd, callback: IoCallback) -> Result<(), CommonErrors> {
        self.shared.set_callback(fd, IoEventInterest::WRITABLE, Some(callback)).map(|_| ())
    }

    fn unregister_readable(&self, fd: RawFd) -> bool {
        self.shared.set_callback(fd, IoEventInterest::READABLE, None).unwrap_or_else(|e| {
            warn!("Failed to unregister readable fd {}: {}", fd, e);
            false
        })
    }

    fn unregister_writable(&self, fd: RawFd) -> bool {
        self.shared.set_callback(fd, IoEventInterest::WRITABLE, None).unwrap_or_else(|e| {
            warn!("Failed to unregister writable fd {}: {}", fd, e);
            false
        })
    }

    fn schedule_after(&self, delay: Duration, callback: TimerCallback) {
        self.shared.timers.borrow_mut().register_timeout(Instant::now() + delay, callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::os::fd::AsRawFd;
    use std::os::unix::net::UnixStream;

    fn socket_pair() -> (UnixStream, UnixStream) {
        let (a, b) = UnixStream::pair().unwrap();
        a.set_nonblocking(true).unwrap();
        b.set_nonblocking(true).unwrap();
        (a, b)
    }

    #[test]
    fn block_on_returns_ready_output() {
        let event_loop = EventLoop::new().unwrap();

        assert_eq!(event_loop.block_on(async { 40 + 2 }), 42);
    }

    #[test]
    fn readable_callback_runs_until_unregistered() {
        let event_loop = EventLoop::new().unwrap();
        let handle = event_loop.handle();
        let (reader, mut writer) = socket_pair();
        let fd = reader.as_raw_fd();
        let calls = Rc::new(Cell::new(0));

        let calls_in_cb = Rc::clone(&calls);
        let handle_in_cb = handle.clone();
        handle
            .register_readable(
                fd,
                Rc::new(move || {
                    calls_in_cb.set(calls_in_cb.get() + 1);
                    // Level triggered: stays ready, unregister to stop the calls.
                    if calls_in_cb.get() == 3 {
                        assert!(handle_in_cb.unregister_readable(fd));
                    }
                }),
            )
            .unwrap();

        writer.write_all(b"x").unwrap();
        event_loop.block_on(handle.sleep(Duration::from_millis(50)));

        assert_eq!(calls.get(), 3);
        assert_eq!(handle.registered_fds(), 0);
    }

    #[test]
    fn reader_and_writer_of_same_fd_are_independent() {
        let event_loop = EventLoop::new().unwrap();
        let handle = event_loop.handle();
        let (a, _b) = socket_pair();
        let fd = a.as_raw_fd();
        let written = Rc::new(Cell::new(false));

        handle.register_readable(fd, Rc::new(|| panic!("nothing to read"))).unwrap();
        let flag = Rc::clone(&written);
        let handle_in_cb = handle.clone();
        handle
            .register_writable(
                fd,
                Rc::new(move || {
                    flag.set(true);
                    handle_in_cb.unregister_writable(fd);
                }),
            )
            .unwrap();

        event_loop.block_on(handle.sleep(Duration::from_millis(20)));

        assert!(written.get());
        assert_eq!(handle.registered_fds(), 1);
        assert!(handle.unregister_readable(fd));
        assert!(!handle.unregister_readable(fd));
        assert_eq!(handle.registered_fds(), 0);
    }

    #[test]
    fn timers_fire_in_deadline_order() {
        let event_loop = EventLoop::new().unwrap();
        let handle = event_loop.handle();
        let order = Rc::new(RefCell::new(Vec::new()));

        for (delay, tag) in [(30, 'c'), (10, 'a'), (20, 'b')] {
            let order = Rc::clone(&order);
            handle.schedule_after(Duration::from_millis(delay), Box::new(move || order.borrow_mut().push(tag)));
        }

        event_loop.block_on(handle.sleep(Duration::from_millis(40)));

        assert_eq!(*order.borrow(), vec!['a', 'b', 'c']);
        assert_eq!(handle.pending_timers(), 0);
    }

    #[test]
    fn spawned_tasks_progress_during_block_on() {
        let event_loop = EventLoop::new().unwrap();
        let handle = event_loop.handle();
        let done = Rc::new(Cell::new(false));

        let flag = Rc::clone(&done);
        let inner = handle.clone();
        handle.spawn(async move {
            inner.sleep(Duration::from_millis(5)).await;
            flag.set(true);
        });

        event_loop.block_on(handle.sleep(Duration::from_millis(30)));

        assert!(done.get());
        assert_eq!(event_loop.pending_tasks(), 0);
    }

    #[test]
    fn wake_from_other_thread_resumes_block_on() {
        struct Flagged(Arc<Mutex<(bool, Option<Waker>)>>);

        impl Future for Flagged {
            type Output = ();

            fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
                let mut state = self.0.lock().unwrap();
                if state.0 {
                    Poll::Ready(())
                } else {
                    state.1 = Some(cx.waker().clone());
                    Poll::Pending
                }
            }
        }

        let event_loop = EventLoop::new().unwrap();
        let state = Arc::new(Mutex::new((false, None::<Waker>)));

        let remote = Arc::clone(&state);
        let thread = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            let waker = {
                let mut state = remote.lock().unwrap();
                state.0 = true;
                state.1.take()
            };
            if let Some(waker) = waker {
                waker.wake();
            }
        });

        event_loop.block_on(Flagged(Arc::clone(&state)));
        thread.join().unwrap();
    }

    #[test]
    fn io_callback_delivers_data() {
        let event_loop = EventLoop::new().unwrap();
        let handle = event_loop.handle();
        let (reader, mut writer) = socket_pair();
        let fd = reader.as_raw_fd();
        let received = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&received);
        let handle_in_cb = handle.clone();
        handle
            .register_readable(
                fd,
                Rc::new(move || {
                    let mut buf = [0_u8; 16];
                    if let Ok(n) = (&reader).read(&mut buf) {
                        sink.borrow_mut().extend_from_slice(&buf[..n]);
                    }
                    handle_in_cb.unregister_readable(fd);
                }),
            )
            .unwrap();

        handle.schedule_after(Duration::from_millis(5), Box::new(move || writer.write_all(b"abc").unwrap()));
        event_loop.block_on(handle.sleep(Duration::from_millis(40)));

        assert_eq!(*received.borrow(), b"abc");
    }

    #[test]
    fn registration_beyond_capacity_fails() {
        let event_loop = EventLoop::with_capacity(1).unwrap();
        let handle = event_loop.handle();
        let (a, b) = socket_pair();

        handle.register_readable(a.as_raw_fd(), Rc::new(|| {})).unwrap();
        assert_eq!(handle.register_readable(b.as_raw_fd(), Rc::new(|| {})), Err(CommonErrors::NoSpaceLeft));
        assert_eq!(handle.registered_fds(), 1);

        assert!(handle.unregister_readable(a.as_raw_fd()));
    }
}
