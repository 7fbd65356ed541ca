use crate::processor::Processor;
use futures::prelude::*;

/// The primitive links: process, queue, fork, transmit, priority join, and
/// the channel shims that connect a pipeline to the host glue.
pub mod primitive;

/// Utilities needed to manage task waking between the two sides of a link.
pub mod utils;

pub type PacketStream<Input> = Box<dyn Stream<Item = Input> + Send + Unpin>;

pub type TokioRunnable = Box<dyn Future<Output = ()> + Send + Unpin>;

/// A built link: the futures the runtime must drive, and the egress streams
/// the next link ingests.
pub type Link<Output> = (Vec<TokioRunnable>, Vec<PacketStream<Output>>);

/// Links are assembled with builders: declare one, hand it its ingress
/// stream(s) and any configuration, then `build_link`. Builders panic on
/// misuse (missing ingressor, zero capacity) at build time rather than
/// surfacing errors at run time.
pub trait LinkBuilder<Input, Output> {
    fn new() -> Self;

    fn ingressors(self, in_streams: Vec<PacketStream<Input>>) -> Self;

    fn ingressor(self, in_stream: PacketStream<Input>) -> Self;

    fn build_link(self) -> Link<Output>;
}

/// `LinkBuilder`s that run their packets through a `Processor`.
pub trait ProcessLinkBuilder<P: Processor>: LinkBuilder<P::Input, P::Output> {
    fn processor(self, processor: P) -> Self;
}

/// Builders for links fed from a channel rather than an upstream stream.
pub trait IngressLinkBuilder<Packet>: LinkBuilder<(), Packet> {
    type Receiver;

    fn channel(self, receiver: Self::Receiver) -> Self;
}

/// Builders for links draining into a channel rather than a downstream
/// stream.
pub trait EgressLinkBuilder<Packet>: LinkBuilder<Packet, ()> {
    type Sender;

    fn channel(self, sender: Self::Sender) -> Self;
}
