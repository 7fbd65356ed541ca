use crate::link::primitive::{ForkLink, PriorityJoinLink, ProcessLink, QueueLink, TransmitLink};
use crate::link::{Link, LinkBuilder, PacketStream, ProcessLinkBuilder};
use crate::processor::{ArpResponder, ArpWire, EchoResponder, EchoWire, FrameParser};
use crate::wire::WireSample;
use reflector_packets::Identity;

/// The complete responder, as one composite link from wire samples in to
/// wire samples out.
///
/// The input is forked to two per-protocol branches. Each branch parses the
/// byte stream into validated request frames, hands them through a bounded
/// transfer queue to its responder, builds the reply, and serializes it
/// back into wire samples. The two sample streams then merge onto the one
/// output under strict priority, address resolution over echo: resolution
/// replies are tiny, latency sensitive, and other hosts block on them.
#[derive(Default)]
pub struct Responder {
    in_stream: Option<PacketStream<WireSample>>,
    identity: Option<Identity>,
    queue_capacity: usize,
}

impl Responder {
    /// The local addresses this responder answers for. Required.
    pub fn identity(self, identity: Identity) -> Self {
        Responder {
            in_stream: self.in_stream,
            identity: Some(identity),
            queue_capacity: self.queue_capacity,
        }
    }

    /// Changes the per-branch transfer queue capacity, default value is 16.
    /// A branch whose responder falls behind sheds whole request frames
    /// once its queue fills.
    pub fn queue_capacity(self, queue_capacity: usize) -> Self {
        assert!(
            queue_capacity > 0,
            "Responder queue capacity must be non-zero"
        );

        Responder {
            in_stream: self.in_stream,
            identity: self.identity,
            queue_capacity,
        }
    }
}

impl LinkBuilder<WireSample, WireSample> for Responder {
    fn new() -> Self {
        Responder {
            in_stream: None,
            identity: None,
            queue_capacity: 16,
        }
    }

    fn ingressors(self, mut in_streams: Vec<PacketStream<WireSample>>) -> Self {
        assert_eq!(
            in_streams.len(),
            1,
            "Responder may only take 1 input stream"
        );

        if self.in_stream.is_some() {
            panic!("Responder may only take 1 input stream")
        }

        Responder {
            in_stream: Some(in_streams.remove(0)),
            identity: self.identity,
            queue_capacity: self.queue_capacity,
        }
    }

    fn ingressor(self, in_stream: PacketStream<WireSample>) -> Self {
        if self.in_stream.is_some() {
            panic!("Responder may only take 1 input stream")
        }

        Responder {
            in_stream: Some(in_stream),
            identity: self.identity,
            queue_capacity: self.queue_capacity,
        }
    }

    fn build_link(self) -> Link<WireSample> {
        if self.in_stream.is_none() {
            panic!("Cannot build link! Missing input stream");
        } else if self.identity.is_none() {
            panic!("Cannot build link! Missing identity");
        }
        let identity = self.identity.unwrap();

        let (mut runnables, mut fork_egressors) = ForkLink::new()
            .ingressor(self.in_stream.unwrap())
            .num_egressors(2)
            .build_link();
        let echo_samples = fork_egressors.pop().unwrap();
        let arp_samples = fork_egressors.pop().unwrap();

        let (mut arp_parser_runnables, mut arp_requests) = QueueLink::new()
            .ingressor(arp_samples)
            .processor(FrameParser::<ArpWire>::new(identity))
            .queue_capacity(self.queue_capacity)
            .build_link();
        runnables.append(&mut arp_parser_runnables);

        let (_, mut arp_replies) = ProcessLink::new()
            .ingressor(arp_requests.remove(0))
            .processor(ArpResponder::new(identity))
            .build_link();

        let (_, mut arp_wire) = TransmitLink::new()
            .ingressor(arp_replies.remove(0))
            .build_link();

        let (mut echo_parser_runnables, mut echo_requests) = QueueLink::new()
            .ingressor(echo_samples)
            .processor(FrameParser::<EchoWire>::new(identity))
            .queue_capacity(self.queue_capacity)
            .build_link();
        runnables.append(&mut echo_parser_runnables);

        let (_, mut echo_replies) = ProcessLink::new()
            .ingressor(echo_requests.remove(0))
            .processor(EchoResponder::new(identity))
            .build_link();

        let (_, mut echo_wire) = TransmitLink::new()
            .ingressor(echo_replies.remove(0))
            .build_link();

        let (mut join_runnables, join_egressors) = PriorityJoinLink::new()
            .ingressors(vec![arp_wire.remove(0), echo_wire.remove(0)])
            .queue_capacity(self.queue_capacity)
            .build_link();
        runnables.append(&mut join_runnables);

        (runnables, join_egressors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test::harness::{initialize_runtime, run_link};
    use crate::utils::test::packet_generators::immediate_stream;
    use crate::wire::{collect_frames, frame_samples};
    use reflector_packets::{
        ArpFrame, ArpOp, EchoFrame, IcmpType, MacAddr, PacketData, REPLY_TTL,
    };
    use std::net::Ipv4Addr;

    fn local_identity() -> Identity {
        Identity::new(
            MacAddr::new([0x02, 0x00, 0x00, 0xAA, 0xBB, 0x01]),
            Ipv4Addr::new(10, 0, 0, 42),
        )
    }

    fn neighbor_mac() -> MacAddr {
        MacAddr::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF])
    }

    fn arp_request(identity: Identity) -> PacketData {
        let mut request = ArpFrame::empty();
        request.set_dest_mac(MacAddr::broadcast());
        request.set_src_mac(neighbor_mac());
        request.set_opcode(ArpOp::Request as u16);
        request.set_sender_hardware_addr(neighbor_mac());
        request.set_sender_protocol_addr(Ipv4Addr::new(10, 0, 0, 1));
        request.set_target_protocol_addr(identity.ip);
        request.into()
    }

    fn echo_request(identity: Identity) -> PacketData {
        let mut request = EchoFrame::empty();
        request.set_dest_mac(identity.mac);
        request.set_src_mac(neighbor_mac());
        request.set_src_addr(Ipv4Addr::new(10, 0, 0, 1));
        request.set_dest_addr(identity.ip);
        request.set_identifier(0x1234);
        request.set_sequence_number(1);
        request.set_header_checksum();
        request.set_icmp_checksum();
        request.into()
    }

    fn run_responder(identity: Identity, samples: Vec<WireSample>) -> Vec<WireSample> {
        let mut runtime = initialize_runtime();
        let mut results = runtime.block_on(async {
            let link = Responder::new()
                .ingressor(immediate_stream(samples))
                .identity(identity)
                .build_link();
            run_link(link).await
        });
        results.remove(0)
    }

    #[test]
    #[should_panic]
    fn panics_when_built_without_identity() {
        Responder::new()
            .ingressor(immediate_stream(vec![]))
            .build_link();
    }

    #[test]
    fn answers_address_resolution_request() {
        let identity = local_identity();
        let out = run_responder(identity, frame_samples(&arp_request(identity)));

        let frames = collect_frames(&out);
        assert_eq!(frames.len(), 1);

        let reply = ArpFrame::from_buffer(frames[0].clone()).unwrap();
        assert_eq!(reply.dest_mac(), neighbor_mac());
        assert_eq!(reply.src_mac(), identity.mac);
        assert_eq!(reply.opcode(), ArpOp::Reply as u16);
        assert_eq!(reply.sender_hardware_addr(), identity.mac);
        assert_eq!(reply.sender_protocol_addr(), identity.ip);
        assert_eq!(reply.target_hardware_addr(), neighbor_mac());
        assert_eq!(reply.target_protocol_addr(), Ipv4Addr::new(10, 0, 0, 1));
    }

    #[test]
    fn answers_echo_request() {
        let identity = local_identity();
        let out = run_responder(identity, frame_samples(&echo_request(identity)));

        let frames = collect_frames(&out);
        assert_eq!(frames.len(), 1);

        let reply = EchoFrame::from_buffer(frames[0].clone()).unwrap();
        assert_eq!(reply.dest_mac(), neighbor_mac());
        assert_eq!(reply.src_mac(), identity.mac);
        assert_eq!(reply.src_addr(), identity.ip);
        assert_eq!(reply.dest_addr(), Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(reply.ttl(), REPLY_TTL);
        assert_eq!(reply.icmp_type(), IcmpType::EchoReply as u8);
        assert_eq!(reply.identifier(), 0x1234);
        assert_eq!(reply.sequence_number(), 1);
        assert!(reply.validate_header_checksum());
        assert!(reply.validate_icmp_checksum());
    }

    #[test]
    fn ignores_requests_for_other_hosts() {
        let identity = local_identity();
        let mut request = ArpFrame::empty();
        request.set_dest_mac(MacAddr::broadcast());
        request.set_src_mac(neighbor_mac());
        request.set_opcode(ArpOp::Request as u16);
        request.set_sender_hardware_addr(neighbor_mac());
        request.set_sender_protocol_addr(Ipv4Addr::new(10, 0, 0, 1));
        request.set_target_protocol_addr(Ipv4Addr::new(10, 0, 0, 77));
        let data: PacketData = request.into();

        let out = run_responder(identity, frame_samples(&data));
        assert!(collect_frames(&out).is_empty());
    }

    #[test]
    fn ignores_idle_wire() {
        let identity = local_identity();
        let out = run_responder(identity, vec![WireSample::gap(); 64]);
        assert!(collect_frames(&out).is_empty());
    }

    #[test]
    fn resolution_reply_is_contiguous_in_mixed_traffic() {
        let identity = local_identity();

        // Resolution first: its reply is short and should hold the wire as
        // one unbroken frame whatever the echo branch is doing.
        let mut samples = frame_samples(&arp_request(identity));
        samples.extend(frame_samples(&echo_request(identity)));
        let out = run_responder(identity, samples);

        let arp_reply: PacketData = ArpFrame::validate_request(arp_request(identity), identity)
            .unwrap()
            .build_reply(identity)
            .into();
        let echo_reply: PacketData = EchoFrame::validate_request(echo_request(identity), identity)
            .unwrap()
            .build_reply(identity)
            .into();

        let arp_reply_samples = frame_samples(&arp_reply);
        assert_eq!(out.len(), arp_reply_samples.len() + echo_reply.len() + 1);

        // The resolution reply occupies one contiguous window; everything
        // outside that window is the echo reply, possibly split around it.
        let window_start = (0..=out.len() - arp_reply_samples.len())
            .find(|&i| out[i..i + arp_reply_samples.len()] == arp_reply_samples[..])
            .expect("resolution reply was interleaved");
        let mut rest = out.clone();
        rest.drain(window_start..window_start + arp_reply_samples.len());
        assert_eq!(collect_frames(&rest), vec![echo_reply]);
    }
}
