use crate::link::{Link, LinkBuilder, PacketStream};
use crate::wire::WireSample;
use futures::prelude::*;
use futures::ready;
use futures::task::{Context, Poll};
use reflector_packets::PacketData;
use std::pin::Pin;

/// Serializes reply frames onto the wire, one sample per poll. Each frame
/// becomes its bytes in order followed by a single gap sample as the
/// falling edge. A frame, once latched, streams out before the next frame
/// is pulled; the pace is set entirely by how fast downstream polls, which
/// is the per-byte acknowledge.
pub struct TransmitLink<Packet: Into<PacketData>> {
    in_stream: Option<PacketStream<Packet>>,
}

impl<Packet: Into<PacketData> + Send + 'static> LinkBuilder<Packet, WireSample>
    for TransmitLink<Packet>
{
    fn new() -> Self {
        TransmitLink { in_stream: None }
    }

    fn ingressors(self, mut in_streams: Vec<PacketStream<Packet>>) -> Self {
        assert_eq!(
            in_streams.len(),
            1,
            "TransmitLink may only take 1 input stream"
        );

        if self.in_stream.is_some() {
            panic!("TransmitLink may only take 1 input stream")
        }

        TransmitLink {
            in_stream: Some(in_streams.remove(0)),
        }
    }

    fn ingressor(self, in_stream: PacketStream<Packet>) -> Self {
        if self.in_stream.is_some() {
            panic!("TransmitLink may only take 1 input stream")
        }

        TransmitLink {
            in_stream: Some(in_stream),
        }
    }

    fn build_link(self) -> Link<WireSample> {
        if self.in_stream.is_none() {
            panic!("Cannot build link! Missing input stream");
        } else {
            (
                vec![],
                vec![Box::new(TransmitEgressor::new(self.in_stream.unwrap()))],
            )
        }
    }
}

pub struct TransmitEgressor<Packet: Into<PacketData>> {
    in_stream: PacketStream<Packet>,
    /// Frame currently on the wire and the next byte offset into it. Once
    /// the offset reaches the frame length, the falling-edge gap goes out
    /// and the slot clears.
    in_flight: Option<(PacketData, usize)>,
}

impl<Packet: Into<PacketData>> TransmitEgressor<Packet> {
    fn new(in_stream: PacketStream<Packet>) -> Self {
        TransmitEgressor {
            in_stream,
            in_flight: None,
        }
    }
}

impl<Packet: Into<PacketData>> Unpin for TransmitEgressor<Packet> {}

impl<Packet: Into<PacketData> + Send> Stream for TransmitEgressor<Packet> {
    type Item = WireSample;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context) -> Poll<Option<Self::Item>> {
        if let Some((frame, offset)) = self.in_flight.take() {
            if offset < frame.len() {
                let sample = WireSample::active(frame[offset]);
                self.in_flight = Some((frame, offset + 1));
                return Poll::Ready(Some(sample));
            }
            return Poll::Ready(Some(WireSample::gap()));
        }

        match ready!(Pin::new(&mut self.in_stream).poll_next(cx)) {
            Some(packet) => {
                self.in_flight = Some((packet.into(), 0));
                self.poll_next(cx)
            }
            None => Poll::Ready(None),
        }
    }
}
