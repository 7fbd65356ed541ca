use crate::link::{IngressLinkBuilder, Link, LinkBuilder, PacketStream};
use crossbeam::crossbeam_channel;
use futures::prelude::*;
use futures::task::{Context, Poll};
use std::pin::Pin;

/// Entry point of a pipeline: adapts a crossbeam channel, typically fed by
/// the host receive glue on its own thread, into a `PacketStream`. For the
/// responder the channel carries raw wire samples.
#[derive(Default)]
pub struct InputChannelLink<Packet> {
    channel_receiver: Option<crossbeam::Receiver<Packet>>,
}

impl<Packet: Send + 'static> IngressLinkBuilder<Packet> for InputChannelLink<Packet> {
    type Receiver = crossbeam::Receiver<Packet>;

    fn channel(self, channel_receiver: crossbeam::Receiver<Packet>) -> Self {
        InputChannelLink {
            channel_receiver: Some(channel_receiver),
        }
    }
}

impl<Packet: Send + 'static> LinkBuilder<(), Packet> for InputChannelLink<Packet> {
    fn new() -> Self {
        InputChannelLink {
            channel_receiver: None,
        }
    }

    fn ingressors(self, mut _in_streams: Vec<PacketStream<()>>) -> Self {
        panic!("InputChannelLink does not take stream ingressors")
    }

    fn ingressor(self, _in_stream: PacketStream<()>) -> Self {
        panic!("InputChannelLink does not take any stream ingressors")
    }

    fn build_link(self) -> Link<Packet> {
        if self.channel_receiver.is_none() {
            panic!("Cannot build link! Missing channel");
        } else {
            (
                vec![],
                vec![Box::new(StreamFromChannel {
                    channel_receiver: self.channel_receiver.unwrap(),
                })],
            )
        }
    }
}

struct StreamFromChannel<Packet> {
    channel_receiver: crossbeam::Receiver<Packet>,
}

impl<Packet> Unpin for StreamFromChannel<Packet> {}

impl<Packet> Stream for StreamFromChannel<Packet> {
    type Item = Packet;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Option<Self::Item>> {
        match self.channel_receiver.try_recv() {
            Ok(packet) => Poll::Ready(Some(packet)),
            Err(crossbeam_channel::TryRecvError::Empty) => {
                // The sender is outside the runtime and holds no waker for
                // us, so we must self-wake and poll the channel again.
                cx.waker().clone().wake();
                Poll::Pending
            }
            Err(crossbeam_channel::TryRecvError::Disconnected) => Poll::Ready(None),
        }
    }
}
