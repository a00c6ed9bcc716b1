//! In-memory link fixtures for integration tests.
//!
//! A [`Loopback`] pair behaves like two ends of a serial cable carrying whole
//! frames.  [`ScriptedPeer`] wraps one end with a codec so a test can play
//! the hub (or accessory) by hand, and [`Bench`] drives a real hub and
//! accessory against each other on a shared clock.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use packlink::app::commands::HubRequest;
use packlink::app::events::LinkEvent;
use packlink::app::ports::{EventSink, HubDelegate};
use packlink::adapters::nvs::NvsAdapter;
use packlink::config::LinkConfig;
use packlink::link::{AccessoryLink, HubLink};
use packlink::protocol::{Codec, Packet, PacketTransport, RawFrame, Role};

type Wire = Rc<RefCell<VecDeque<RawFrame>>>;

// ── Loopback transport ────────────────────────────────────────

pub struct Loopback {
    rx: Wire,
    tx: Wire,
    ready: Rc<Cell<bool>>,
}

/// Two connected ends sharing one readiness flag.
pub fn loopback_pair() -> (Loopback, Loopback) {
    let a_to_b: Wire = Rc::default();
    let b_to_a: Wire = Rc::default();
    let ready = Rc::new(Cell::new(true));
    (
        Loopback {
            rx: b_to_a.clone(),
            tx: a_to_b.clone(),
            ready: ready.clone(),
        },
        Loopback {
            rx: a_to_b,
            tx: b_to_a,
            ready,
        },
    )
}

#[allow(dead_code)]
impl Loopback {
    /// Simulate the transport reporting not-ready on both ends.
    pub fn set_ready(&self, ready: bool) {
        self.ready.set(ready);
    }

    /// Frames waiting to be read by this end.
    pub fn backlog(&self) -> usize {
        self.rx.borrow().len()
    }

    /// Inject a frame as if the peer had sent it.
    pub fn inject(&self, frame: RawFrame) {
        self.rx.borrow_mut().push_back(frame);
    }
}

impl PacketTransport for Loopback {
    type Error = Infallible;

    fn is_ready(&self) -> bool {
        self.ready.get()
    }

    fn poll(&mut self) -> Option<RawFrame> {
        self.rx.borrow_mut().pop_front()
    }

    fn send(&mut self, kind: u8, payload: &[u8]) -> Result<(), Infallible> {
        if let Some(frame) = RawFrame::new(kind, payload) {
            self.tx.borrow_mut().push_back(frame);
        }
        Ok(())
    }
}

// ── Scripted peer ─────────────────────────────────────────────

/// One end of a loopback driven by hand, encoding as `role`.
pub struct ScriptedPeer {
    end: Loopback,
    codec: Codec,
}

#[allow(dead_code)]
impl ScriptedPeer {
    pub fn new(end: Loopback, role: Role) -> Self {
        Self {
            end,
            codec: Codec::new(role),
        }
    }

    pub fn send(&mut self, packet: &Packet) {
        let frame = self.codec.encode(packet).expect("encodable packet");
        let _ = self.end.send(frame.kind, &frame.payload);
    }

    /// Send a frame with arbitrary bytes.
    pub fn send_raw(&mut self, kind: u8, payload: &[u8]) {
        let _ = self.end.send(kind, payload);
    }

    /// Everything the other side has sent so far, decoded.
    pub fn received(&mut self) -> Vec<Packet> {
        let mut out = Vec::new();
        while let Some(frame) = self.end.poll() {
            out.push(self.codec.decode_frame(&frame).expect("peer frame decodes"));
        }
        out
    }

    pub fn end(&self) -> &Loopback {
        &self.end
    }
}

/// A hand-driven hub facing a real accessory.
#[allow(dead_code)]
pub fn accessory_with_script(config: LinkConfig) -> (AccessoryLink<Loopback>, ScriptedPeer) {
    let (a, b) = loopback_pair();
    (AccessoryLink::new(a, config), ScriptedPeer::new(b, Role::Hub))
}

// ── Recording ports ───────────────────────────────────────────

#[derive(Default)]
pub struct RecordingDelegate {
    pub requests: Vec<HubRequest>,
}

impl HubDelegate for RecordingDelegate {
    fn on_request(&mut self, request: HubRequest) {
        self.requests.push(request);
    }
}

#[derive(Default)]
pub struct EventLog {
    pub events: Vec<LinkEvent>,
}

#[allow(dead_code)]
impl EventLog {
    pub fn count(&self, pred: impl Fn(&LinkEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for EventLog {
    fn emit(&mut self, event: &LinkEvent) {
        self.events.push(*event);
    }
}

// ── Bench: real hub ↔ real accessory ─────────────────────────

pub struct Bench {
    pub hub: HubLink<Loopback>,
    pub accessory: AccessoryLink<Loopback>,
    pub delegate: RecordingDelegate,
    pub store: NvsAdapter,
    pub hub_events: EventLog,
    pub accessory_events: EventLog,
    pub now: u64,
    /// When false the hub is not polled (powered off / hung).
    pub hub_alive: bool,
}

#[allow(dead_code)]
impl Bench {
    pub fn new() -> Self {
        let (h, a) = loopback_pair();
        let config = LinkConfig::default();
        Self {
            hub: HubLink::new(h, config),
            accessory: AccessoryLink::new(a, config),
            delegate: RecordingDelegate::default(),
            store: NvsAdapter::new().expect("simulation NVS"),
            hub_events: EventLog::default(),
            accessory_events: EventLog::default(),
            now: 0,
            hub_alive: true,
        }
    }

    /// Advance the clock by `ms` in steps of `step`, polling both ends.
    pub fn run(&mut self, ms: u64, step: u64) {
        let end = self.now + ms;
        while self.now < end {
            self.now += step;
            self.tick();
        }
    }

    /// Poll each end once at the current time.
    pub fn tick(&mut self) {
        if self.hub_alive {
            self.hub.poll(
                self.now,
                &mut self.hub_events,
                &mut self.delegate,
                &mut self.store,
            );
        }
        let _ = self.accessory.poll(self.now, &mut self.accessory_events);
    }

    /// Run until both ends report connected, or panic after `limit_ms`.
    pub fn connect(&mut self, limit_ms: u64) {
        let deadline = self.now + limit_ms;
        while !(self.hub.is_connected() && self.accessory.is_synced()) {
            assert!(self.now < deadline, "link did not connect within {limit_ms} ms");
            self.now += 1;
            self.tick();
        }
    }
}
