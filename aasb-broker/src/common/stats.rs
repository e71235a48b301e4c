/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */


use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters describing what a broker has done since it was created.
#[derive(Debug, Default)]
pub struct BrokerStats {
    pub(crate) messages_published: AtomicUsize,
    pub(crate) callbacks_delivered: AtomicUsize,
    pub(crate) dispatch_failures: AtomicUsize,
    pub(crate) replies_fulfilled: AtomicUsize,
    pub(crate) replies_dropped: AtomicUsize,
    pub(crate) replies_timed_out: AtomicUsize,
    pub(crate) orphaned_deliveries: AtomicUsize,
}

impl BrokerStats {
    /// Messages accepted by `send()` or `get()`.
    #[must_use]
    pub fn messages_published(&self) -> usize {
        self.messages_published.load(Ordering::Relaxed)
    }

    /// Subscriber callbacks that returned `Ok`.
    #[must_use]
    pub fn callbacks_delivered(&self) -> usize {
        self.callbacks_delivered.load(Ordering::Relaxed)
    }

    /// Subscriber callbacks that returned `Err` or panicked.
    #[must_use]
    pub fn dispatch_failures(&self) -> usize {
        self.dispatch_failures.load(Ordering::Relaxed)
    }

    /// Replies handed to a waiting `get()`.
    #[must_use]
    pub fn replies_fulfilled(&self) -> usize {
        self.replies_fulfilled.load(Ordering::Relaxed)
    }

    /// Replies with no waiter: unknown, late, or duplicate.
    #[must_use]
    pub fn replies_dropped(&self) -> usize {
        self.replies_dropped.load(Ordering::Relaxed)
    }

    /// `get()` calls that hit their deadline.
    #[must_use]
    pub fn replies_timed_out(&self) -> usize {
        self.replies_timed_out.load(Ordering::Relaxed)
    }

    /// Deliveries skipped because the handler's owner had been dropped.
    #[must_use]
    pub fn orphaned_deliveries(&self) -> usize {
        self.orphaned_deliveries.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn record(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}
