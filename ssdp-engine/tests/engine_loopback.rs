use ssdp_engine::udp::{Receive, SendTo};
use ssdp_engine::*;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
struct ManualTimer {
    now: u32,
    expiry: Option<u32>,
}

impl ManualTimer {
    fn expire(&mut self) -> bool {
        if let Some(t) = self.expiry.take() {
            self.now = t;
            true
        } else {
            false
        }
    }
}

impl Timer for ManualTimer {
    fn ticks(&self) -> u32 {
        self.now
    }

    fn start_once(&mut self, interval: u32) {
        self.expiry = Some(self.now.wrapping_add(interval));
    }

    fn stop(&mut self) {
        self.expiry = None;
    }
}

struct Recorder {
    uuid: String,
    location: String,
    received: Mutex<Vec<Message>>,
}

impl Recorder {
    fn new(location: &str) -> Self {
        Self {
            uuid: urn::generate_uuid(),
            location: location.to_string(),
            received: Mutex::new(Vec::new()),
        }
    }

    fn received(&self) -> Vec<Message> {
        self.received.lock().unwrap().clone()
    }
}

impl Callback for Recorder {
    fn on_message(&self, message: &Message) {
        self.received.lock().unwrap().push(message.clone());
    }

    fn on_send(&self, message: &mut Message, spec: &MessageSpec) -> bool {
        let root = Urn::root();
        let usn = root.clone().with_uuid(self.uuid.as_str());
        let nt = if spec.message_type == MessageType::Response {
            "ST"
        } else {
            "NT"
        };
        message.set(nt, root.to_string());
        message.set("USN", usn.to_string());
        message.set("LOCATION", self.location.as_str());
        true
    }
}

fn socket() -> (UdpSocket, SocketAddr) {
    let s = UdpSocket::bind("127.0.0.1:0").unwrap();
    s.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    let addr = s.local_addr().unwrap();
    (s, addr)
}

fn run(e: &mut Engine<Recorder, ManualTimer>, s: &UdpSocket) {
    while e.queue_mut().timer_mut().expire() {
        e.on_timer(s);
    }
}

fn receive(e: &Engine<Recorder, ManualTimer>, s: &UdpSocket) -> SocketAddr {
    let mut buf = [0u8; 1500];
    let (n, wasfrom) = s.receive_from(&mut buf).unwrap();
    e.on_data(&buf[0..n], wasfrom);
    wasfrom
}

#[test]
#[cfg_attr(miri, ignore)]
fn search_and_response() {
    let (cp_socket, cp_addr) = socket();
    let (dev_socket, dev_addr) = socket();
    let cp = Engine::new(Recorder::new("http://cp/"), ManualTimer::default());
    let mut dev = Engine::new(
        Recorder::new("http://127.0.0.1/description.xml"),
        ManualTimer::default(),
    );

    let mut search = Message::new(MessageType::MSearch, dev_addr);
    search.set("HOST", dev_addr.to_string());
    search.set("MAN", "\"ssdp:discover\"");
    search.set("ST", "upnp:rootdevice");
    search.set("MX", "1");
    cp.send_message(&search, &cp_socket).unwrap();

    assert_eq!(receive(&dev, &dev_socket), cp_addr);
    let got = dev.callback().received();
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].message_type, Some(MessageType::MSearch));
    assert_eq!(
        SearchTarget::classify(got[0].get("ST").unwrap()),
        Some(SearchTarget::Root)
    );

    let mx = got[0].maximum_wait_sec().unwrap();
    let delay = dev.schedule_response(
        MessageSpec::response(SearchMatch::Root, Owner(1), got[0].remote),
        mx,
    );
    assert!(delay < 1000);
    run(&mut dev, &dev_socket);

    assert_eq!(receive(&cp, &cp_socket), dev_addr);
    let got = cp.callback().received();
    assert_eq!(got.len(), 1);
    let r = &got[0];
    assert_eq!(r.message_type, Some(MessageType::Response));
    assert_eq!(r.get("ST"), Some("upnp:rootdevice"));
    assert_eq!(r.get("EXT"), Some(""));
    assert_eq!(r.get("CACHE-CONTROL"), Some("max-age=1800"));
    assert_eq!(r.get("LOCATION"), Some("http://127.0.0.1/description.xml"));

    let usn = Urn::parse(r.get("USN").unwrap());
    assert_eq!(usn.kind(), UrnKind::Root);
    assert_eq!(usn.uuid, dev.callback().uuid);
}

#[test]
#[cfg_attr(miri, ignore)]
fn repeated_notify() {
    let (cp_socket, cp_addr) = socket();
    let (dev_socket, _) = socket();
    let cp = Engine::new(Recorder::new("http://cp/"), ManualTimer::default());
    let mut dev = Engine::new(
        Recorder::new("http://127.0.0.1/description.xml"),
        ManualTimer::default(),
    );

    let spec = MessageSpec::notify(NotifySubtype::Alive, Owner(7), cp_addr)
        .with_repeat(1);
    dev.schedule(spec, 0);
    assert!(dev.contains(&spec));
    run(&mut dev, &dev_socket);
    assert!(!dev.contains(&spec));

    receive(&cp, &cp_socket);
    receive(&cp, &cp_socket);
    let got = cp.callback().received();
    assert_eq!(got.len(), 2);
    for m in &got {
        assert_eq!(m.message_type, Some(MessageType::Notify));
        assert_eq!(m.notify_subtype(), Some(NotifySubtype::Alive));
        assert_eq!(m.get("HOST"), Some(cp_addr.to_string().as_str()));
        assert_eq!(m.get("NT"), Some("upnp:rootdevice"));
    }
}

#[test]
#[cfg_attr(miri, ignore)]
fn cancelled_messages_are_not_sent() {
    let (cp_socket, cp_addr) = socket();
    let (dev_socket, _) = socket();
    let cp = Engine::new(Recorder::new("http://cp/"), ManualTimer::default());
    let mut dev = Engine::new(
        Recorder::new("http://127.0.0.1/description.xml"),
        ManualTimer::default(),
    );

    dev.schedule(
        MessageSpec::notify(NotifySubtype::ByeBye, Owner(1), cp_addr),
        100,
    );
    dev.schedule(
        MessageSpec::notify(NotifySubtype::Alive, Owner(2), cp_addr),
        200,
    );
    assert_eq!(dev.remove(Owner(1)), 1);
    run(&mut dev, &dev_socket);

    receive(&cp, &cp_socket);
    let got = cp.callback().received();
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].notify_subtype(), Some(NotifySubtype::Alive));
}

#[test]
#[cfg_attr(miri, ignore)]
fn malformed_datagrams_are_dropped() {
    let (cp_socket, cp_addr) = socket();
    let (raw, _) = socket();
    let cp = Engine::new(Recorder::new("http://cp/"), ManualTimer::default());

    for datagram in [
        &b"M-SEARCH * HTTP/1.1\r\nST: ssdp:all\r\n\r\n"[..],
        b"HELLO\r\n\r\n",
        b"\0\0\0\0",
        b"HTTP/1.1 200 OK\r\nST: ssdp:all\r\n\r\n",
    ] {
        raw.send_with(datagram.len(), &cp_addr, |b| {
            b.copy_from_slice(datagram);
            datagram.len()
        })
        .unwrap();
        receive(&cp, &cp_socket);
    }

    // Only the last one is valid
    let got = cp.callback().received();
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].message_type, Some(MessageType::Response));
}
