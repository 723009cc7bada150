use crate::engine::{Callback, Engine, EngineConfig};
use crate::message::Message;
use crate::message_spec::{MessageSpec, Owner};
use crate::timer::Timer;
use crate::udp::{setup_socket, Multicast, Receive};
use futures::Stream;
use std::error::Error;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::time::Instant;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

/// A [`Timer`] made from Tokio's clock
///
/// One tick is one millisecond since the timer was created (wrapping
/// after about 49 days). The timer doesn't fire by itself: its owner
/// sleeps until [`TokioTimer::deadline`], as `AsyncService` does.
#[derive(Debug)]
pub struct TokioTimer {
    epoch: Instant,
    deadline: Option<Instant>,
}

impl Default for TokioTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl TokioTimer {
    /// Create a new, disarmed, timer
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            deadline: None,
        }
    }

    /// When the timer is due to expire, if it's armed
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Disarm the timer because it has expired
    pub fn expire(&mut self) {
        self.deadline = None;
    }
}

impl Timer for TokioTimer {
    #[allow(clippy::cast_possible_truncation)] // ticks wrap
    fn ticks(&self) -> u32 {
        self.epoch.elapsed().as_millis() as u32
    }

    fn start_once(&mut self, interval: u32) {
        self.deadline =
            Some(Instant::now() + Duration::from_millis(interval.into()));
    }

    fn stop(&mut self) {
        self.deadline = None;
    }
}

type SendHook = Box<dyn Fn(&mut Message, &MessageSpec) -> bool + Send + Sync>;

struct AsyncCallback {
    subscribers: Mutex<Vec<mpsc::Sender<Message>>>,
    on_send: SendHook,
}

impl Callback for AsyncCallback {
    fn on_message(&self, message: &Message) {
        self.subscribers.lock().unwrap().retain(|s| {
            !matches!(
                s.try_send(message.clone()),
                Err(mpsc::error::TrySendError::Closed(_))
            )
        });
    }

    fn on_send(&self, message: &mut Message, spec: &MessageSpec) -> bool {
        (self.on_send)(message, spec)
    }
}

struct Inner {
    engine: Mutex<Engine<AsyncCallback, TokioTimer>>,
    socket: tokio::net::UdpSocket,
    // Sends go straight to the (non-blocking) socket, without waiting
    // for Tokio to have seen it become writable
    sender: std::net::UdpSocket,
    rearm: Notify,
}

/** High-level asynchronous SSDP service using tokio.
 *
 * Owns a UDP socket, passes incoming datagrams to the [`Engine`], and
 * sends queued messages as they fall due, using `async`, `await`, and
 * the Tokio crate.
 *
 * Outgoing messages are completed by the `on_send` hook given at
 * construction; it runs with the service locked, so it must not call
 * back into the service.
 */
pub struct AsyncService {
    inner: Arc<Inner>,
}

impl AsyncService {
    /// Create a new `AsyncService` listening on the SSDP port and
    /// multicast group, with default configuration
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Can return a `std::io::Error` or a `udp::Error` if any of the
    /// underlying socket calls fail.
    ///
    pub fn new<F>(on_send: F) -> Result<Self, Box<dyn Error>>
    where
        F: Fn(&mut Message, &MessageSpec) -> bool + Send + Sync + 'static,
    {
        let socket = setup_socket(crate::SSDP_PORT)?;
        socket.join_multicast_group(
            &crate::SSDP_MULTICAST_ADDR,
            &Ipv4Addr::UNSPECIFIED,
        )?;
        Ok(Self::with_socket(socket, EngineConfig::default(), on_send)?)
    }

    /// Create a new `AsyncService` on an existing socket
    ///
    /// The socket must be non-blocking; see [`setup_socket`]. No
    /// multicast groups are joined.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Can return a `std::io::Error` if the socket can't be cloned or
    /// registered with Tokio.
    ///
    /// # Panics
    ///
    /// The background task will panic if the internal mutex cannot be
    /// locked; that would indicate a bug in ssdp-engine.
    ///
    pub fn with_socket<F>(
        socket: std::net::UdpSocket,
        config: EngineConfig,
        on_send: F,
    ) -> Result<Self, std::io::Error>
    where
        F: Fn(&mut Message, &MessageSpec) -> bool + Send + Sync + 'static,
    {
        let callback = AsyncCallback {
            subscribers: Mutex::new(Vec::new()),
            on_send: Box::new(on_send),
        };
        let sender = socket.try_clone()?;
        let inner = Arc::new(Inner {
            engine: Mutex::new(Engine::with_config(
                callback,
                TokioTimer::new(),
                config,
            )),
            socket: tokio::net::UdpSocket::from_std(socket)?,
            sender,
            rearm: Notify::new(),
        });
        let inner2 = inner.clone();

        tokio::spawn(async move {
            loop {
                let deadline =
                    inner.engine.lock().unwrap().queue().timer().deadline();
                let sleep = async {
                    match deadline {
                        Some(d) => tokio::time::sleep_until(d).await,
                        None => std::future::pending().await,
                    }
                };

                tokio::select! {
                    _ = inner.socket.readable() => {
                        let mut buf = [0u8; 1500];
                        match inner.socket.receive_from(&mut buf) {
                            Ok((n, wasfrom)) => {
                                inner.engine.lock().unwrap().on_data(
                                    &buf[0..n],
                                    wasfrom,
                                );
                            }
                            Err(e) => debug!("SSDP receive: {e}"),
                        }
                    },
                    () = sleep => {
                        let mut engine = inner.engine.lock().unwrap();
                        engine.queue_mut().timer_mut().expire();
                        engine.on_timer(&inner.sender);
                    },
                    () = inner.rearm.notified() => {},
                };
            }
        });

        Ok(Self { inner: inner2 })
    }

    /// The address the service's socket is bound to
    ///
    /// # Errors
    ///
    /// Passes on errors from the underlying system call.
    ///
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.socket.local_addr()
    }

    /// Receive every valid SSDP message which arrives from now on
    ///
    /// # Panics
    ///
    /// Will panic if the internal mutex cannot be locked; that would
    /// indicate a bug in ssdp-engine.
    ///
    pub fn subscribe(&self) -> impl Stream<Item = Message> {
        let (snd, rcv) = mpsc::channel(100);
        self.inner
            .engine
            .lock()
            .unwrap()
            .callback()
            .subscribers
            .lock()
            .unwrap()
            .push(snd);
        ReceiverStream::new(rcv)
    }

    /// Schedule a message to be sent `interval_ms` from now
    ///
    /// # Panics
    ///
    /// Will panic if the internal mutex cannot be locked; that would
    /// indicate a bug in ssdp-engine.
    ///
    pub fn schedule(&self, spec: MessageSpec, interval_ms: u32) {
        self.inner
            .engine
            .lock()
            .unwrap()
            .schedule(spec, interval_ms);
        self.inner.rearm.notify_one();
    }

    /// Schedule a response to a search, after a random delay of up to
    /// `mx` seconds
    ///
    /// # Panics
    ///
    /// Will panic if the internal mutex cannot be locked; that would
    /// indicate a bug in ssdp-engine.
    ///
    pub fn schedule_response(&self, spec: MessageSpec, mx: u8) -> u32 {
        let delay = self
            .inner
            .engine
            .lock()
            .unwrap()
            .schedule_response(spec, mx);
        self.inner.rearm.notify_one();
        delay
    }

    /// Cancel every pending message for `owner`
    ///
    /// # Panics
    ///
    /// Will panic if the internal mutex cannot be locked; that would
    /// indicate a bug in ssdp-engine.
    ///
    pub fn remove(&self, owner: Owner) -> usize {
        let n = self.inner.engine.lock().unwrap().remove(owner);
        self.inner.rearm.notify_one();
        n
    }

    /// Whether an equivalent message is already pending
    ///
    /// # Panics
    ///
    /// Will panic if the internal mutex cannot be locked; that would
    /// indicate a bug in ssdp-engine.
    ///
    #[must_use]
    pub fn contains(&self, spec: &MessageSpec) -> bool {
        self.inner.engine.lock().unwrap().contains(spec)
    }

    /// Cancel every pending message
    ///
    /// # Panics
    ///
    /// Will panic if the internal mutex cannot be locked; that would
    /// indicate a bug in ssdp-engine.
    ///
    pub fn clear(&self) {
        self.inner.engine.lock().unwrap().clear();
        self.inner.rearm.notify_one();
    }

    /// Send a message immediately, bypassing the queue
    ///
    /// # Errors
    ///
    /// Returns `Err` if the message is invalid or the transport fails.
    ///
    /// # Panics
    ///
    /// Will panic if the internal mutex cannot be locked; that would
    /// indicate a bug in ssdp-engine.
    ///
    pub fn send_message(
        &self,
        message: &Message,
    ) -> Result<(), crate::Error> {
        let r = self
            .inner
            .engine
            .lock()
            .unwrap()
            .send_message(message, &self.inner.sender);
        if let Err(e) = &r {
            warn!("SSDP send to {}: {e}", message.remote);
        }
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn tokio_timer_counts_millis() {
        let t = TokioTimer::new();
        assert_eq!(t.ticks(), 0);
        tokio::time::advance(Duration::from_millis(1500)).await;
        assert_eq!(t.ticks(), 1500);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_timer_arms_and_stops() {
        let mut t = TokioTimer::new();
        assert!(t.deadline().is_none());
        let now = Instant::now();
        t.start_once(250);
        assert_eq!(t.deadline(), Some(now + Duration::from_millis(250)));
        t.stop();
        assert!(t.deadline().is_none());
        t.start_once(10);
        t.expire();
        assert!(t.deadline().is_none());
    }
}
