use crate::message::{self, Message};
use crate::message_spec::{MessageSpec, Owner};
use crate::queue::MessageQueue;
use crate::timer::Timer;
use crate::types::{
    MessageType, SearchTarget, SSDP_ALL, SSDP_MAN_DISCOVER, UPNP_ROOTDEVICE,
};
use crate::{udp, Error};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use tracing::{debug, trace, warn};

const MAX_PACKET_SIZE: usize = 1024;

/// Protocol policy settings for an [`Engine`]
///
/// Deployments differ on some details of what they put in outgoing
/// messages; these are the knobs for them. Every field has a
/// default, so a configuration file need only mention the ones it
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// MX header of outgoing searches: how many seconds responders
    /// may wait before replying
    pub search_mx: u8,

    /// max-age, in seconds, of the CACHE-CONTROL header on
    /// announcements and responses
    pub max_age_secs: u32,

    /// Interval between repeats of a message with a repeat count
    pub repeat_interval_ms: u32,

    /// Whether to add `CONTENT-LENGTH: 0` to every message
    pub content_length: bool,

    /// Product token for the USER-AGENT header (searches) or SERVER
    /// header (everything else); omitted if `None`
    pub user_agent: Option<String>,

    /// Ignore datagrams from hosts which aren't on a local network
    pub local_only: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            search_mx: 10,
            max_age_secs: 1800,
            repeat_interval_ms: 1000,
            content_length: true,
            user_agent: None,
            local_only: true,
        }
    }
}

/// Callbacks made by [`Engine`] as messages arrive and depart
///
/// See the implementation in [`crate::AsyncService`].
///
pub trait Callback {
    /// A valid SSDP message has been received
    fn on_message(&self, message: &Message);

    /// A queued message is about to be sent
    ///
    /// The engine has filled in the headers that follow from `spec`;
    /// the callback adds the rest (NT, USN, LOCATION and so on), and
    /// returns `false` if the message should not be sent after all.
    fn on_send(&self, message: &mut Message, spec: &MessageSpec) -> bool;
}

/// Whether an address is on (or is) this host's local networks
fn is_local(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback() || v4.is_private() || v4.is_link_local()
        }
        IpAddr::V6(v6) => {
            if let Some(v4) = v6.to_ipv4_mapped() {
                return is_local(IpAddr::V4(v4));
            }
            let first = v6.segments()[0];
            v6.is_loopback()
                || (first & 0xfe00) == 0xfc00 // unique local
                || (first & 0xffc0) == 0xfe80 // link local
        }
    }
}

/// Build the skeleton of the message described by `spec`
fn build_message(
    config: &EngineConfig,
    spec: &MessageSpec,
) -> Result<Message, Error> {
    let mut msg = Message::new(spec.message_type, spec.destination);

    match spec.message_type {
        MessageType::MSearch => {
            msg.set("MAN", SSDP_MAN_DISCOVER);
            msg.set("MX", config.search_mx.to_string());
            msg.remote = crate::multicast_dest();
            let st = match spec.target {
                SearchTarget::Root => UPNP_ROOTDEVICE,
                SearchTarget::All => SSDP_ALL,
                SearchTarget::Type | SearchTarget::Uuid => {
                    warn!("invalid M-SEARCH target {}", spec.target);
                    return Err(Error::InvalidSearchTarget);
                }
            };
            msg.set("ST", st);
        }
        MessageType::Notify => {
            msg.set("NTS", spec.notify_subtype.as_str());
        }
        MessageType::Response => {
            msg.set("EXT", "");
        }
    }

    if spec.message_type != MessageType::MSearch {
        msg.set("CACHE-CONTROL", format!("max-age={}", config.max_age_secs));
    }
    if spec.message_type != MessageType::Response {
        msg.set("HOST", msg.remote.to_string());
    }
    if let Some(agent) = &config.user_agent {
        let name = if spec.message_type == MessageType::MSearch {
            "USER-AGENT"
        } else {
            "SERVER"
        };
        msg.set(name, agent.as_str());
    }
    if config.content_length {
        msg.set("CONTENT-LENGTH", "0");
    }
    Ok(msg)
}

/// Format a message and hand it to the transport
fn send<SCK: udp::SendTo>(
    message: &Message,
    socket: &SCK,
) -> Result<(), Error> {
    let mut buf = [0u8; MAX_PACKET_SIZE];
    let n = message::format_into(&mut buf, message)?;
    trace!(
        "TX {}\n{}",
        message.remote,
        String::from_utf8_lossy(&buf[..n])
    );
    socket.send_with(n, &message.remote, |b| {
        b.copy_from_slice(&buf[..n]);
        n
    })?;
    Ok(())
}

/// The core of an SSDP implementation
///
/// This struct handles parsing incoming SSDP messages, and building
/// and emitting outgoing ones; it does not own or define the UDP
/// sockets themselves, which are left to its owner. The owner should
/// pass incoming UDP packets to [`Engine::on_data`].
///
/// The owner also supplies the [`Timer`] which drives the queue of
/// outgoing messages. When that timer expires, the
/// [`Engine::on_timer`] method must be called. See, for instance, the
/// `tokio::select!` loop in `AsyncService`.
///
/// Messages are sent by scheduling a [`MessageSpec`] with
/// [`Engine::schedule`]. When it falls due, the engine builds the
/// message, lets the [`Callback`] complete it, and sends it; then, if
/// its repeat count is non-zero, schedules it again.
///
pub struct Engine<CB: Callback, T: Timer> {
    config: EngineConfig,
    callback: CB,
    queue: MessageQueue<T>,
}

impl<CB: Callback, T: Timer> Engine<CB, T> {
    /// Create a new Engine, with default configuration
    #[must_use]
    pub fn new(callback: CB, timer: T) -> Self {
        Self::with_config(callback, timer, EngineConfig::default())
    }

    /// Create a new Engine
    #[must_use]
    pub fn with_config(callback: CB, timer: T, config: EngineConfig) -> Self {
        Self::with_queue(callback, MessageQueue::new(timer), config)
    }

    /// Create a new Engine around an existing (usually empty) queue
    #[must_use]
    pub const fn with_queue(
        callback: CB,
        queue: MessageQueue<T>,
        config: EngineConfig,
    ) -> Self {
        Self {
            config,
            callback,
            queue,
        }
    }

    /// The configuration in use
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The callback in use
    pub const fn callback(&self) -> &CB {
        &self.callback
    }

    /// The queue of pending messages
    pub const fn queue(&self) -> &MessageQueue<T> {
        &self.queue
    }

    /// The queue of pending messages, mutably
    pub fn queue_mut(&mut self) -> &mut MessageQueue<T> {
        &mut self.queue
    }

    /// Notify the `Engine` that data has arrived
    ///
    /// Malformed datagrams are logged and dropped; valid ones are
    /// passed to [`Callback::on_message`].
    pub fn on_data(&self, buf: &[u8], wasfrom: SocketAddr) {
        if self.config.local_only && !is_local(wasfrom.ip()) {
            debug!("RX {} ignored, not local", wasfrom);
            return;
        }

        let len = message::payload_len(buf);
        if len != buf.len() {
            warn!("RX {} {} chars, {} bytes", wasfrom, len, buf.len());
        }

        match message::parse(&buf[..len], wasfrom) {
            Ok(Some(msg)) => {
                debug!(
                    "RX {} {}: {} headers",
                    wasfrom,
                    msg.message_type.map_or("?", |t| t.as_str()),
                    msg.headers.len()
                );
                self.callback.on_message(&msg);
            }
            Ok(None) => {}
            Err(e) => {
                warn!("RX {} {}", wasfrom, e);
            }
        }
    }

    /// Notify the `Engine` that its timer has expired
    ///
    /// Sends the message at the head of the queue (if the callback
    /// agrees), and re-schedules it if it has repeats left.
    pub fn on_timer<SCK: udp::SendTo>(&mut self, socket: &SCK) {
        let config = &self.config;
        let callback = &self.callback;
        self.queue.on_timer(|queue, mut spec| {
            if let Err(e) = Self::deliver(config, callback, &spec, socket) {
                warn!(
                    "TX {} {} failed: {}",
                    spec.destination, spec.message_type, e
                );
            }

            if spec.repeat > 0 {
                spec.repeat -= 1;
                queue.add(spec, config.repeat_interval_ms);
            }
        });
    }

    fn deliver<SCK: udp::SendTo>(
        config: &EngineConfig,
        callback: &CB,
        spec: &MessageSpec,
        socket: &SCK,
    ) -> Result<(), Error> {
        let mut msg = build_message(config, spec)?;
        if callback.on_send(&mut msg, spec) {
            send(&msg, socket)
        } else {
            trace!("TX {} vetoed", spec.message_type);
            Ok(())
        }
    }

    /// Build the message described by `spec`, as it would be before
    /// [`Callback::on_send`] completes it
    ///
    /// Searches always go to the multicast group; everything else
    /// goes to the destination in `spec`.
    ///
    /// # Errors
    ///
    /// Returns `Err(Error::InvalidSearchTarget)` for a search whose
    /// target is neither `Root` nor `All`: searches for particular
    /// types or devices can't be built from a spec alone.
    ///
    pub fn build_message(&self, spec: &MessageSpec) -> Result<Message, Error> {
        build_message(&self.config, spec)
    }

    /// Send a message immediately, bypassing the queue
    ///
    /// # Errors
    ///
    /// Returns `Err` if the message can't be formatted (see
    /// [`message::format`]) or doesn't fit in a datagram, or if the
    /// transport fails.
    ///
    pub fn send_message<SCK: udp::SendTo>(
        &self,
        message: &Message,
        socket: &SCK,
    ) -> Result<(), Error> {
        send(message, socket)
    }

    /// Schedule a message to be sent `interval_ms` from now
    pub fn schedule(&mut self, spec: MessageSpec, interval_ms: u32) {
        self.queue.add(spec, interval_ms);
    }

    /// Schedule a response to a search, after a random delay of up to
    /// `mx` seconds (the search's MX header)
    ///
    /// Returns the delay chosen, in milliseconds.
    pub fn schedule_response(&mut self, spec: MessageSpec, mx: u8) -> u32 {
        let delay = if mx == 0 {
            0
        } else {
            rand::rng().random_range(0..u32::from(mx) * 1000)
        };
        self.queue.add(spec, delay);
        delay
    }

    /// Cancel every pending message for `owner`, returning how many
    /// there were
    pub fn remove(&mut self, owner: Owner) -> usize {
        self.queue.remove(owner)
    }

    /// Whether an equivalent message is already pending
    #[must_use]
    pub fn contains(&self, spec: &MessageSpec) -> bool {
        self.queue.contains(spec)
    }

    /// Cancel every pending message
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}
