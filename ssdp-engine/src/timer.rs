/// A monotonic tick counter plus a single one-shot timer
///
/// The [`crate::MessageQueue`] needs exactly one of these. The tick
/// counter is free to wrap around: the queue only ever compares ticks
/// by signed difference (see [`ticks_until`]), so it stays correct as
/// long as no message is scheduled more than about 2^31 ticks ahead.
///
/// When the one-shot timer expires, its owner must call
/// [`crate::Engine::on_timer`] (or [`crate::MessageQueue::on_timer`]).
/// There is never more than one expiry outstanding: arming the timer
/// again replaces any earlier expiry.
///
pub trait Timer {
    /// The current value of the tick counter
    fn ticks(&self) -> u32;

    /// Convert milliseconds to ticks
    ///
    /// The default implementation is for one tick per millisecond.
    fn millis_to_ticks(&self, ms: u32) -> u32 {
        ms
    }

    /// Arm the timer to expire once, `interval` ticks from now
    fn start_once(&mut self, interval: u32);

    /// Disarm the timer
    fn stop(&mut self);
}

/// How many ticks from `now` until `due`; negative if `due` has passed
///
/// Correct across wraparound of the tick counter.
#[must_use]
pub const fn ticks_until(due: u32, now: u32) -> i32 {
    due.wrapping_sub(now) as i32
}
