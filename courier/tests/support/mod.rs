//! Test doubles shared by the courier integration tests

#![allow(dead_code)]

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use courier::{Address, Message, Transport, TransportError};
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Start,
    Stop,
    Send,
}

/// A transport that records what it is asked to do
#[derive(Default)]
pub struct RecordingTransport {
    events: Mutex<Vec<Event>>,
    sent: Mutex<Vec<Message>>,
    reject: Mutex<Vec<Address>>,
    started: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Report `address` as rejected on every send
    pub fn reject(&self, address: &str) {
        self.reject.lock().push(Address::new(address, None));
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn start(&self) -> Result<(), TransportError> {
        self.events.lock().push(Event::Start);
        self.started.store(true, Ordering::Release);
        Ok(())
    }

    async fn stop(&self) -> Result<(), TransportError> {
        self.events.lock().push(Event::Stop);
        self.started.store(false, Ordering::Release);
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    async fn send(&self, message: &Message) -> Result<Vec<Address>, TransportError> {
        self.events.lock().push(Event::Send);
        self.sent.lock().push(message.clone());
        Ok(self.reject.lock().clone())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
