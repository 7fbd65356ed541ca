use crate::link::{Link, LinkBuilder, PacketStream, ProcessLinkBuilder};
use crate::processor::Processor;
use futures::prelude::*;
use futures::ready;
use futures::task::{Context, Poll};
use std::pin::Pin;

/// `ProcessLink` runs packets through its processor inline. It cannot buffer
/// packets, so it only does work when its egressor is polled, and every
/// packet either leaves transformed immediately or is dropped.
#[derive(Default)]
pub struct ProcessLink<P: Processor> {
    in_stream: Option<PacketStream<P::Input>>,
    processor: Option<P>,
}

/// `ProcessLink` may only have one ingress and egress stream since it lacks
/// any kind of queue storage.
impl<P: Processor + Send + 'static> LinkBuilder<P::Input, P::Output> for ProcessLink<P> {
    fn new() -> Self {
        ProcessLink {
            in_stream: None,
            processor: None,
        }
    }

    fn ingressors(self, mut in_streams: Vec<PacketStream<P::Input>>) -> Self {
        assert_eq!(
            in_streams.len(),
            1,
            "ProcessLink may only take 1 input stream"
        );

        if self.in_stream.is_some() {
            panic!("ProcessLink may only take 1 input stream")
        }

        ProcessLink {
            in_stream: Some(in_streams.remove(0)),
            processor: self.processor,
        }
    }

    fn ingressor(self, in_stream: PacketStream<P::Input>) -> Self {
        if self.in_stream.is_some() {
            panic!("ProcessLink may only take 1 input stream")
        }

        ProcessLink {
            in_stream: Some(in_stream),
            processor: self.processor,
        }
    }

    fn build_link(self) -> Link<P::Output> {
        if self.in_stream.is_none() {
            panic!("Cannot build link! Missing input stream");
        } else if self.processor.is_none() {
            panic!("Cannot build link! Missing processor");
        } else {
            let runner = ProcessRunner::new(self.in_stream.unwrap(), self.processor.unwrap());
            (vec![], vec![Box::new(runner)])
        }
    }
}

impl<P: Processor + Send + 'static> ProcessLinkBuilder<P> for ProcessLink<P> {
    fn processor(self, processor: P) -> Self {
        ProcessLink {
            in_stream: self.in_stream,
            processor: Some(processor),
        }
    }
}

/// The single egressor of ProcessLink.
struct ProcessRunner<P: Processor> {
    in_stream: PacketStream<P::Input>,
    processor: P,
}

impl<P: Processor> ProcessRunner<P> {
    fn new(in_stream: PacketStream<P::Input>, processor: P) -> Self {
        ProcessRunner {
            in_stream,
            processor,
        }
    }
}

impl<P: Processor> Unpin for ProcessRunner<P> {}

impl<P: Processor> Stream for ProcessRunner<P> {
    type Item = P::Output;

    /// Packets are pulled from upstream on demand. A `Ready(Some)` from
    /// upstream goes through the processor; if the processor drops it we
    /// keep pulling, so a dropped packet never surfaces as `Pending`.
    /// `Ready(None)` (upstream exhausted) is forwarded to tear the chain
    /// down.
    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context) -> Poll<Option<Self::Item>> {
        loop {
            match ready!(Pin::new(&mut self.in_stream).poll_next(cx)) {
                Some(packet) => {
                    if let Some(output_packet) = self.processor.process(packet) {
                        return Poll::Ready(Some(output_packet));
                    }
                }
                None => return Poll::Ready(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::{ArpWire, FrameParser};
    use crate::utils::test::harness::{initialize_runtime, run_link};
    use crate::utils::test::packet_generators::immediate_stream;
    use crate::wire::frame_samples;
    use reflector_packets::{ArpFrame, ArpOp, Identity, MacAddr};
    use std::net::Ipv4Addr;

    fn local_identity() -> Identity {
        Identity::new(
            MacAddr::new([0x02, 0x00, 0x00, 0xAA, 0xBB, 0x01]),
            Ipv4Addr::new(10, 0, 0, 42),
        )
    }

    fn arp_request(identity: Identity) -> Vec<u8> {
        let mut request = ArpFrame::empty();
        request.set_dest_mac(MacAddr::broadcast());
        request.set_src_mac(MacAddr::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]));
        request.set_opcode(ArpOp::Request as u16);
        request.set_sender_hardware_addr(MacAddr::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]));
        request.set_sender_protocol_addr(Ipv4Addr::new(10, 0, 0, 1));
        request.set_target_protocol_addr(identity.ip);
        request.into()
    }

    #[test]
    #[should_panic]
    fn panics_when_built_without_input_stream() {
        ProcessLink::new()
            .processor(FrameParser::<ArpWire>::new(local_identity()))
            .build_link();
    }

    #[test]
    #[should_panic]
    fn panics_when_built_without_processor() {
        ProcessLink::<FrameParser<ArpWire>>::new()
            .ingressor(immediate_stream(vec![]))
            .build_link();
    }

    #[test]
    fn parses_samples_inline() {
        let identity = local_identity();
        let samples = frame_samples(&arp_request(identity));

        let mut runtime = initialize_runtime();
        let results = runtime.block_on(async {
            let link = ProcessLink::new()
                .ingressor(immediate_stream(samples))
                .processor(FrameParser::<ArpWire>::new(identity))
                .build_link();
            run_link(link).await
        });
        assert_eq!(results[0].len(), 1);
        assert_eq!(results[0][0].opcode(), ArpOp::Request as u16);
    }

    #[test]
    fn dropped_packets_do_not_stall_the_stream() {
        let identity = local_identity();
        // nothing here validates, so nothing comes out
        let samples = frame_samples(&[0u8; 42]);

        let mut runtime = initialize_runtime();
        let results = runtime.block_on(async {
            let link = ProcessLink::new()
                .ingressor(immediate_stream(samples))
                .processor(FrameParser::<ArpWire>::new(identity))
                .build_link();
            run_link(link).await
        });
        assert!(results[0].is_empty());
    }
}
