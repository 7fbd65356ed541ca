use crate::link::utils::task_park::*;
use crate::link::{Link, LinkBuilder, PacketStream, ProcessLinkBuilder};
use crate::processor::Processor;
use crossbeam::atomic::AtomicCell;
use crossbeam::crossbeam_channel;
use crossbeam::crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use futures::prelude::*;
use futures::ready;
use futures::task::{Context, Poll};
use std::pin::Pin;
use std::sync::Arc;

/// The bounded transfer queue between the receive pace and the transmit
/// pace. The ingressor runs the processor (here, a frame parser) and places
/// its output in a bounded channel; the egressor is a stream the transmit
/// side pulls at its own rate. Packets transfer whole, a frame is never
/// observable partially enqueued, and order is preserved.
///
/// Backpressure on the producer side is loss, not blocking: a packet
/// processed while the channel is full is dropped on the floor. The receive
/// side of a best-effort responder must never stall waiting on the transmit
/// side.
#[derive(Default)]
pub struct QueueLink<P: Processor> {
    in_stream: Option<PacketStream<P::Input>>,
    processor: Option<P>,
    queue_capacity: usize,
}

impl<P: Processor> QueueLink<P> {
    /// Changes queue_capacity, default value is 16.
    pub fn queue_capacity(self, queue_capacity: usize) -> Self {
        assert!(
            queue_capacity > 0,
            "QueueLink queue capacity must be non-zero"
        );

        QueueLink {
            in_stream: self.in_stream,
            processor: self.processor,
            queue_capacity,
        }
    }
}

impl<P: Processor + Send + 'static> LinkBuilder<P::Input, P::Output> for QueueLink<P> {
    fn new() -> Self {
        QueueLink {
            in_stream: None,
            processor: None,
            queue_capacity: 16,
        }
    }

    fn ingressors(self, mut in_streams: Vec<PacketStream<P::Input>>) -> Self {
        assert_eq!(
            in_streams.len(),
            1,
            "QueueLink may only take 1 input stream"
        );

        if self.in_stream.is_some() {
            panic!("QueueLink may only take 1 input stream")
        }

        QueueLink {
            in_stream: Some(in_streams.remove(0)),
            processor: self.processor,
            queue_capacity: self.queue_capacity,
        }
    }

    fn ingressor(self, in_stream: PacketStream<P::Input>) -> Self {
        if self.in_stream.is_some() {
            panic!("QueueLink may only take 1 input stream")
        }

        QueueLink {
            in_stream: Some(in_stream),
            processor: self.processor,
            queue_capacity: self.queue_capacity,
        }
    }

    fn build_link(self) -> Link<P::Output> {
        if self.in_stream.is_none() {
            panic!("Cannot build link! Missing input stream");
        } else if self.processor.is_none() {
            panic!("Cannot build link! Missing processor");
        } else {
            let (to_egressor, from_ingressor) =
                crossbeam_channel::bounded::<Option<P::Output>>(self.queue_capacity);
            let task_park: Arc<AtomicCell<TaskParkState>> =
                Arc::new(AtomicCell::new(TaskParkState::Empty));

            let ingressor = QueueIngressor::new(
                self.in_stream.unwrap(),
                to_egressor,
                self.processor.unwrap(),
                Arc::clone(&task_park),
            );
            let egressor = QueueEgressor::new(from_ingressor, task_park);

            (vec![Box::new(ingressor)], vec![Box::new(egressor)])
        }
    }
}

impl<P: Processor + Send + 'static> ProcessLinkBuilder<P> for QueueLink<P> {
    fn processor(self, processor: P) -> Self {
        QueueLink {
            in_stream: self.in_stream,
            processor: Some(processor),
            queue_capacity: self.queue_capacity,
        }
    }
}

/// The QueueIngressor polls its input stream, runs each packet through the
/// `processor`, and pushes the output onto the to_egressor channel. It works
/// in batches: it continues to pull packets as long as it can make forward
/// progress.
pub struct QueueIngressor<P: Processor> {
    input_stream: PacketStream<P::Input>,
    to_egressor: Sender<Option<P::Output>>,
    processor: P,
    task_park: Arc<AtomicCell<TaskParkState>>,
}

impl<P: Processor> QueueIngressor<P> {
    pub fn new(
        input_stream: PacketStream<P::Input>,
        to_egressor: Sender<Option<P::Output>>,
        processor: P,
        task_park: Arc<AtomicCell<TaskParkState>>,
    ) -> Self {
        QueueIngressor {
            input_stream,
            to_egressor,
            processor,
            task_park,
        }
    }
}

impl<P: Processor> Unpin for QueueIngressor<P> {}

impl<P: Processor> Future for QueueIngressor<P> {
    type Output = ();

    /// There are four cases:
    ///
    /// #1 The input_stream returns Pending: we sleep, trusting whoever
    /// produced the Pending to awaken the task later.
    ///
    /// #2 We get Ready(None): upstream is exhausted. We push a None onto the
    /// to_egressor channel to propagate the teardown and finish. The final
    /// None must not be lost, so if the channel is full we park and retry.
    ///
    /// #3 The processor yields a packet and the channel has room: enqueue it
    /// and wake the egressor.
    ///
    /// #4 The processor yields a packet and the channel is full: the packet
    /// is dropped, silently, and we keep pulling input. The egressor is not
    /// woken, nothing changed for it, and this task does not sleep: load
    /// shedding must not stall the receive side.
    fn poll(mut self: Pin<&mut Self>, cx: &mut Context) -> Poll<Self::Output> {
        loop {
            let input_packet_option: Option<P::Input> =
                ready!(Pin::new(&mut self.input_stream).poll_next(cx));

            match input_packet_option {
                None => {
                    if self.to_egressor.is_full() {
                        park_and_wake(&self.task_park, cx.waker().clone());
                        return Poll::Pending;
                    }
                    self.to_egressor
                        .try_send(None)
                        .expect("QueueIngressor::Poll::Ready(None) try_send shouldn't fail");
                    die_and_wake(&self.task_park);
                    return Poll::Ready(());
                }
                Some(input_packet) => {
                    if let Some(output_packet) = self.processor.process(input_packet) {
                        match self.to_egressor.try_send(Some(output_packet)) {
                            Ok(()) => unpark_and_wake(&self.task_park),
                            Err(TrySendError::Full(_packet)) => {
                                // queue full: frame dropped
                            }
                            Err(TrySendError::Disconnected(_packet)) => {
                                return Poll::Ready(());
                            }
                        }
                    }
                }
            }
        }
    }
}

/// The egressor side of the QueueLink, converting the channel of processed
/// packets into a Stream the next link can poll.
pub struct QueueEgressor<Packet: Sized> {
    from_ingressor: Receiver<Option<Packet>>,
    task_park: Arc<AtomicCell<TaskParkState>>,
}

impl<Packet: Sized> QueueEgressor<Packet> {
    pub fn new(
        from_ingressor: Receiver<Option<Packet>>,
        task_park: Arc<AtomicCell<TaskParkState>>,
    ) -> Self {
        QueueEgressor {
            from_ingressor,
            task_park,
        }
    }
}

impl<Packet: Sized> Unpin for QueueEgressor<Packet> {}

impl<Packet: Sized> Stream for QueueEgressor<Packet> {
    type Item = Packet;

    /// Four cases:
    ///
    /// #1 Ok(Some(Packet)): got a packet. Wake the ingressor in case a full
    /// channel put it to sleep, and yield the packet.
    ///
    /// #2 Ok(None): the ingressor is tearing down; forward-propagate.
    ///
    /// #3 Err(Empty): await the ingressor with more work, parking our waker.
    ///
    /// #4 Err(Disconnected): the ingressor dropped; no more packets are
    /// coming.
    fn poll_next(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Option<Self::Item>> {
        match self.from_ingressor.try_recv() {
            Ok(Some(packet)) => {
                unpark_and_wake(&self.task_park);
                Poll::Ready(Some(packet))
            }
            Ok(None) => {
                die_and_wake(&self.task_park);
                Poll::Ready(None)
            }
            Err(TryRecvError::Empty) => {
                park_and_wake(&self.task_park, cx.waker().clone());
                Poll::Pending
            }
            Err(TryRecvError::Disconnected) => Poll::Ready(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::{ArpWire, FrameParser};
    use crate::utils::test::harness::{initialize_runtime, run_link};
    use crate::utils::test::packet_generators::{immediate_stream, PacketIntervalGenerator};
    use crate::wire::frame_samples;
    use core::time;
    use futures::task::noop_waker;
    use reflector_packets::{ArpFrame, ArpOp, Identity, MacAddr};
    use std::net::Ipv4Addr;

    struct Passthrough;

    impl Processor for Passthrough {
        type Input = i32;
        type Output = i32;

        fn process(&mut self, packet: i32) -> Option<i32> {
            Some(packet)
        }
    }

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
        QueueLink::new().processor(Passthrough).build_link();
    }

    #[test]
    #[should_panic]
    fn panics_when_built_with_zero_capacity() {
        QueueLink::<Passthrough>::new()
            .ingressor(immediate_stream(vec![]))
            .processor(Passthrough)
            .queue_capacity(0)
            .build_link();
    }

    #[test]
    fn parses_and_queues_valid_frames() {
        let identity = local_identity();
        let mut samples = frame_samples(&arp_request(identity));
        samples.extend(frame_samples(&arp_request(identity)));

        let mut runtime = initialize_runtime();
        let results = runtime.block_on(async {
            let link = QueueLink::new()
                .ingressor(immediate_stream(samples))
                .processor(FrameParser::<ArpWire>::new(identity))
                .build_link();
            run_link(link).await
        });
        assert_eq!(results[0].len(), 2);
        assert_eq!(results[0][0].opcode(), ArpOp::Request as u16);
    }

    #[test]
    fn survivors_keep_fifo_order() {
        // An eager producer against a default-size queue can overflow it
        // before the consumer task first runs; the excess is shed. Whatever
        // survives must still leave in arrival order.
        let packets: Vec<i32> = (0..100).collect();

        let mut runtime = initialize_runtime();
        let results = runtime.block_on(async {
            let link = QueueLink::new()
                .ingressor(immediate_stream(packets.clone()))
                .processor(Passthrough)
                .build_link();
            run_link(link).await
        });

        let out = &results[0];
        assert!(!out.is_empty());
        assert!(out.len() <= packets.len());
        assert!(out.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn drops_excess_when_consumer_never_runs() {
        // Drive the ingressor by hand with no egressor task: a capacity-4
        // channel fed 7 packets keeps the first 4 in order and sheds the
        // rest, one drop per excess packet.
        let (to_egressor, from_ingressor) = crossbeam_channel::bounded::<Option<i32>>(4);
        let task_park = Arc::new(AtomicCell::new(TaskParkState::Empty));
        let mut ingressor = QueueIngressor::new(
            immediate_stream(vec![0, 1, 2, 3, 4, 5, 6]),
            to_egressor,
            Passthrough,
            task_park,
        );

        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        // Stream exhausted but the final None cannot enter the full
        // channel, so the ingressor parks instead of completing.
        assert_eq!(Pin::new(&mut ingressor).poll(&mut cx), Poll::Pending);

        let retained: Vec<i32> = from_ingressor.try_iter().map(|p| p.unwrap()).collect();
        assert_eq!(retained, vec![0, 1, 2, 3]);

        // With room again, the ingressor finishes its teardown.
        assert_eq!(Pin::new(&mut ingressor).poll(&mut cx), Poll::Ready(()));
    }

    /// Yields one packet per poll, returning Pending in between. Lets a
    /// test interleave the ingressor and a channel drain deterministically.
    struct OneAtATimeStream {
        packets: std::vec::IntoIter<i32>,
        ready: bool,
    }

    impl OneAtATimeStream {
        fn new(packets: Vec<i32>) -> Self {
            OneAtATimeStream {
                packets: packets.into_iter(),
                ready: true,
            }
        }
    }

    impl Unpin for OneAtATimeStream {}

    impl Stream for OneAtATimeStream {
        type Item = i32;

        fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context) -> Poll<Option<i32>> {
            if self.ready {
                self.ready = false;
                Poll::Ready(self.packets.next())
            } else {
                self.ready = true;
                cx.waker().wake_by_ref();
                Poll::Pending
            }
        }
    }

    #[test]
    fn paced_producer_within_capacity_loses_nothing() {
        // 12 packets can never overflow the default 16 slot queue, so this
        // holds however the two tasks get scheduled.
        let packets: Vec<i32> = (0..12).collect();

        let mut runtime = initialize_runtime();
        let results = runtime.block_on(async {
            let link = QueueLink::new()
                .ingressor(Box::new(PacketIntervalGenerator::new(
                    time::Duration::from_millis(1),
                    packets.clone().into_iter(),
                )))
                .processor(Passthrough)
                .build_link();
            run_link(link).await
        });
        assert_eq!(results[0], packets);
    }

    #[test]
    fn one_slot_queue_with_lockstep_drain_loses_nothing() {
        // Drained between every send, even a one-slot queue never fills,
        // so nothing is shed.
        let packets: Vec<i32> = (0..12).collect();
        let (to_egressor, from_ingressor) = crossbeam_channel::bounded::<Option<i32>>(1);
        let task_park = Arc::new(AtomicCell::new(TaskParkState::Empty));
        let mut ingressor = QueueIngressor::new(
            Box::new(OneAtATimeStream::new(packets.clone())),
            to_egressor,
            Passthrough,
            task_park,
        );

        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut delivered: Vec<i32> = Vec::new();
        while Pin::new(&mut ingressor).poll(&mut cx) == Poll::Pending {
            delivered.extend(from_ingressor.try_iter().map(|p| p.unwrap()));
        }
        assert_eq!(delivered, packets);
        // teardown marker is the only thing left in the channel
        assert_eq!(from_ingressor.try_recv(), Ok(None));
    }

    #[test]
    fn empty_stream() {
        let mut runtime = initialize_runtime();
        let results = runtime.block_on(async {
            let packets: Vec<i32> = vec![];
            let link = QueueLink::new()
                .ingressor(immediate_stream(packets))
                .processor(Passthrough)
                .build_link();
            run_link(link).await
        });
        assert_eq!(results[0], []);
    }
}
