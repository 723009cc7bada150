use crate::message_spec::{MessageSpec, Owner};
use crate::timer::{ticks_until, Timer};
use slotmap::SlotMap;
use tracing::{debug, error, trace};

/// The default floor on timer intervals, in milliseconds
pub const DEFAULT_MIN_INTERVAL_MS: u32 = 100;

slotmap::new_key_type! { struct EntryKey; }

struct Entry {
    spec: MessageSpec,
    due: u32,
    next: Option<EntryKey>,
}

/// A time-ordered queue of pending outgoing messages
///
/// Entries are kept in order of due time, with entries due at the
/// same time kept in the order they were added. A single one-shot
/// [`Timer`] is armed for the head entry; when it expires, the owner
/// calls [`MessageQueue::on_timer`], which pops *one* entry and hands
/// it over for delivery, then re-arms the timer for the next. Because
/// the timer interval is never less than a minimum (100ms by
/// default), a burst of entries which all fall due together goes out
/// spaced by at least that minimum.
///
/// Repeats are not handled here: whoever receives a spec from
/// `on_timer` may add it again (with a decremented repeat count).
///
pub struct MessageQueue<T: Timer> {
    entries: SlotMap<EntryKey, Entry>,
    head: Option<EntryKey>,
    timer: T,
    timer_set: bool,
    min_interval_ms: u32,
}

impl<T: Timer> MessageQueue<T> {
    /// Create an empty queue driven by the given timer
    #[must_use]
    pub fn new(timer: T) -> Self {
        Self::with_min_interval(timer, DEFAULT_MIN_INTERVAL_MS)
    }

    /// Create an empty queue, with a non-default timer floor
    #[must_use]
    pub fn with_min_interval(timer: T, min_interval_ms: u32) -> Self {
        Self {
            entries: SlotMap::with_key(),
            head: None,
            timer,
            timer_set: false,
            min_interval_ms,
        }
    }

    /// The timer driving this queue
    pub const fn timer(&self) -> &T {
        &self.timer
    }

    /// The timer driving this queue, mutably
    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    /// The number of pending messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no pending messages
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the pending messages, in the order they will be
    /// delivered
    pub fn iter(&self) -> impl Iterator<Item = &MessageSpec> {
        core::iter::successors(
            self.head.and_then(|k| self.entries.get(k)),
            |e| e.next.and_then(|k| self.entries.get(k)),
        )
        .map(|e| &e.spec)
    }

    /// Schedule `spec` for delivery `interval_ms` from now
    ///
    /// The new entry goes after any entries already due at or before
    /// the same time.
    pub fn add(&mut self, spec: MessageSpec, interval_ms: u32) {
        let now = self.timer.ticks();
        let due = now.wrapping_add(self.timer.millis_to_ticks(interval_ms));
        debug!(
            "queue add {} {} {} {} in {}ms",
            spec.message_type,
            spec.notify_subtype,
            spec.target,
            spec.destination,
            interval_ms
        );

        let mut prev = None;
        let mut cur = self.head;
        while let Some(key) = cur {
            let entry = &self.entries[key];
            if ticks_until(entry.due, due) > 0 {
                break;
            }
            prev = cur;
            cur = entry.next;
        }

        let key = self.entries.insert(Entry {
            spec,
            due,
            next: cur,
        });
        if let Some(p) = prev {
            self.entries[p].next = Some(key);
        } else {
            self.head = Some(key);
            self.set_timer();
        }
    }

    /// Handle expiry of the timer
    ///
    /// Pops the head entry and passes it to `deliver`, which may add
    /// further entries (including the same spec again) to the queue it
    /// is given. Then re-arms the timer for the new head, unless that
    /// has already happened.
    ///
    pub fn on_timer<F>(&mut self, deliver: F)
    where
        F: FnOnce(&mut Self, MessageSpec),
    {
        self.timer_set = false;

        debug_assert!(
            self.head.is_some(),
            "message queue timer fired while empty"
        );
        let Some(entry) = self.head.and_then(|k| self.entries.remove(k))
        else {
            error!("message queue timer fired while empty");
            self.set_timer();
            return;
        };
        self.head = entry.next;
        trace!("queue fire {}", entry.spec.message_type);

        deliver(self, entry.spec);

        if !self.timer_set {
            self.set_timer();
        }
    }

    /// Cancel every pending message for `owner`
    ///
    /// Returns the number of messages cancelled.
    pub fn remove(&mut self, owner: Owner) -> usize {
        let mut removed = 0;
        let mut prev: Option<EntryKey> = None;
        let mut cur = self.head;
        while let Some(key) = cur {
            let next = self.entries[key].next;
            if self.entries[key].spec.owner == owner {
                self.entries.remove(key);
                match prev {
                    Some(p) => self.entries[p].next = next,
                    None => self.head = next,
                }
                removed += 1;
            } else {
                prev = Some(key);
            }
            cur = next;
        }

        if removed > 0 {
            debug!("queue removed {} for {:?}", removed, owner);
            self.set_timer();
        }
        removed
    }

    /// Whether an equivalent message is already pending
    ///
    /// Repeat counts and due times are not compared.
    #[must_use]
    pub fn contains(&self, spec: &MessageSpec) -> bool {
        self.entries.values().any(|e| e.spec == *spec)
    }

    /// Cancel every pending message
    pub fn clear(&mut self) {
        self.timer.stop();
        self.timer_set = false;
        self.entries.clear();
        self.head = None;
    }

    fn set_timer(&mut self) {
        let head = self.head.and_then(|k| self.entries.get(k));
        let Some(due) = head.map(|e| e.due) else {
            self.timer.stop();
            return;
        };

        let min = self.timer.millis_to_ticks(self.min_interval_ms);
        let remaining = ticks_until(due, self.timer.ticks());
        let interval = u32::try_from(remaining).unwrap_or(0).max(min);
        trace!("queue timer in {} ticks", interval);
        self.timer.start_once(interval);
        self.timer_set = true;
    }
}
