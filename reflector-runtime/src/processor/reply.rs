use crate::processor::Processor;
use reflector_packets::{ArpFrame, EchoFrame, Identity};

/// Builds the address-resolution reply for each validated request. Runs once
/// per dequeued frame; invalid frames never reach it because only validated
/// frames are queued.
pub struct ArpResponder {
    identity: Identity,
}

impl ArpResponder {
    pub fn new(identity: Identity) -> Self {
        ArpResponder { identity }
    }
}

impl Processor for ArpResponder {
    type Input = ArpFrame;
    type Output = ArpFrame;

    fn process(&mut self, request: Self::Input) -> Option<Self::Output> {
        Some(request.build_reply(self.identity))
    }
}

/// Builds the echo reply, checksums recomputed, for each validated request.
pub struct EchoResponder {
    identity: Identity,
}

impl EchoResponder {
    pub fn new(identity: Identity) -> Self {
        EchoResponder { identity }
    }
}

impl Processor for EchoResponder {
    type Input = EchoFrame;
    type Output = EchoFrame;

    fn process(&mut self, request: Self::Input) -> Option<Self::Output> {
        Some(request.build_reply(self.identity))
    }
}
