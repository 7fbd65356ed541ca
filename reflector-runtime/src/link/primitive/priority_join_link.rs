use crate::link::utils::task_park::*;
use crate::link::{Link, LinkBuilder, PacketStream, TokioRunnable};
use crate::wire::WireSample;
use crossbeam::atomic::AtomicCell;
use crossbeam::crossbeam_channel;
use crossbeam::crossbeam_channel::{Receiver, Sender, TryRecvError};
use futures::prelude::*;
use futures::ready;
use futures::task::{Context, Poll};
use std::pin::Pin;
use std::sync::Arc;

/// Index of the high priority ingressor. Ingress streams are supplied
/// highest priority first.
const HIGH: usize = 0;

/// Merges two wire-sample streams onto one wire under strict priority.
/// Stream 0 wins whenever both have a sample ready, so a high priority
/// frame can cut in at any byte boundary of a low priority frame. The
/// reverse never happens: once a high priority frame has put its first
/// byte on the wire, the egressor stays granted to stream 0 until that
/// frame's falling edge, even if it must idle waiting for the next byte.
#[derive(Default)]
pub struct PriorityJoinLink {
    in_streams: Option<Vec<PacketStream<WireSample>>>,
    queue_capacity: usize,
}

impl PriorityJoinLink {
    /// Changes queue_capacity, default value is 16.
    pub fn queue_capacity(self, queue_capacity: usize) -> Self {
        assert!(
            queue_capacity > 0,
            "PriorityJoinLink queue capacity must be non-zero"
        );

        PriorityJoinLink {
            in_streams: self.in_streams,
            queue_capacity,
        }
    }

}

impl LinkBuilder<WireSample, WireSample> for PriorityJoinLink {
    fn new() -> Self {
        PriorityJoinLink {
            in_streams: None,
            queue_capacity: 16,
        }
    }

    /// Appends one ingressor; call with the high priority stream first.
    fn ingressor(self, in_stream: PacketStream<WireSample>) -> Self {
        match self.in_streams {
            None => PriorityJoinLink {
                in_streams: Some(vec![in_stream]),
                queue_capacity: self.queue_capacity,
            },
            Some(mut in_streams) => {
                assert!(
                    in_streams.len() < 2,
                    "PriorityJoinLink may only take 2 input streams"
                );
                in_streams.push(in_stream);
                PriorityJoinLink {
                    in_streams: Some(in_streams),
                    queue_capacity: self.queue_capacity,
                }
            }
        }
    }

    fn ingressors(self, in_streams: Vec<PacketStream<WireSample>>) -> Self {
        assert_eq!(
            in_streams.len(),
            2,
            "PriorityJoinLink takes exactly 2 input streams, highest priority first"
        );

        PriorityJoinLink {
            in_streams: Some(in_streams),
            queue_capacity: self.queue_capacity,
        }
    }

    fn build_link(self) -> Link<WireSample> {
        match self.in_streams {
            None => panic!("Cannot build link! Missing input streams"),
            Some(input_streams) => {
                assert_eq!(
                    input_streams.len(),
                    2,
                    "PriorityJoinLink takes exactly 2 input streams, highest priority first"
                );

                let mut ingressors: Vec<TokioRunnable> = Vec::new();
                let mut from_ingressors: Vec<Receiver<Option<WireSample>>> = Vec::new();
                let mut task_parks: Vec<Arc<AtomicCell<TaskParkState>>> = Vec::new();

                for input_stream in input_streams {
                    let (to_egressor, from_ingressor) =
                        crossbeam_channel::bounded::<Option<WireSample>>(self.queue_capacity);
                    let task_park = Arc::new(AtomicCell::new(TaskParkState::Empty));

                    let ingressor = PriorityJoinIngressor::new(
                        input_stream,
                        to_egressor,
                        Arc::clone(&task_park),
                    );
                    ingressors.push(Box::new(ingressor));
                    from_ingressors.push(from_ingressor);
                    task_parks.push(task_park);
                }

                let egressor = PriorityJoinEgressor::new(from_ingressors, task_parks);

                (ingressors, vec![Box::new(egressor)])
            }
        }
    }
}

pub struct PriorityJoinIngressor {
    input_stream: PacketStream<WireSample>,
    to_egressor: Sender<Option<WireSample>>,
    task_park: Arc<AtomicCell<TaskParkState>>,
}

impl PriorityJoinIngressor {
    fn new(
        input_stream: PacketStream<WireSample>,
        to_egressor: Sender<Option<WireSample>>,
        task_park: Arc<AtomicCell<TaskParkState>>,
    ) -> Self {
        PriorityJoinIngressor {
            input_stream,
            to_egressor,
            task_park,
        }
    }
}

impl Unpin for PriorityJoinIngressor {}

impl Future for PriorityJoinIngressor {
    type Output = ();

    /// Moves samples from the sender's stream into this channel's staging
    /// queue. Unlike the receive-side transfer queue there is no load
    /// shedding here: a full queue parks this task until the egressor makes
    /// room, which is the per-byte acknowledge propagating backwards.
    fn poll(mut self: Pin<&mut Self>, cx: &mut Context) -> Poll<Self::Output> {
        loop {
            if self.to_egressor.is_full() {
                park_and_wake(&self.task_park, cx.waker().clone());
                return Poll::Pending;
            }
            let sample_option: Option<WireSample> =
                ready!(Pin::new(&mut self.input_stream).poll_next(cx));

            match sample_option {
                None => {
                    self.to_egressor
                        .try_send(None)
                        .expect("PriorityJoinIngressor: teardown try_send shouldn't fail");
                    die_and_wake(&self.task_park);
                    return Poll::Ready(());
                }
                Some(sample) => {
                    self.to_egressor
                        .try_send(Some(sample))
                        .expect("PriorityJoinIngressor: try_send shouldn't fail");
                    unpark_and_wake(&self.task_park);
                }
            }
        }
    }
}

pub struct PriorityJoinEgressor {
    from_ingressors: Vec<Receiver<Option<WireSample>>>,
    task_parks: Vec<Arc<AtomicCell<TaskParkState>>>,
    alive: Vec<bool>,
    /// Set while a high priority frame is on the wire; cleared by its
    /// falling edge. While set, only stream 0 may be pulled.
    granted_high: bool,
}

impl PriorityJoinEgressor {
    fn new(
        from_ingressors: Vec<Receiver<Option<WireSample>>>,
        task_parks: Vec<Arc<AtomicCell<TaskParkState>>>,
    ) -> Self {
        let alive = vec![true; from_ingressors.len()];
        PriorityJoinEgressor {
            from_ingressors,
            task_parks,
            alive,
            granted_high: false,
        }
    }
}

impl Drop for PriorityJoinEgressor {
    fn drop(&mut self) {
        for task_park in self.task_parks.iter() {
            die_and_wake(&task_park);
        }
    }
}

impl Unpin for PriorityJoinEgressor {}

impl Stream for PriorityJoinEgressor {
    type Item = WireSample;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context) -> Poll<Option<Self::Item>> {
        if self.granted_high {
            if self.alive[HIGH] {
                match self.from_ingressors[HIGH].try_recv() {
                    Ok(Some(sample)) => {
                        unpark_and_wake(&self.task_parks[HIGH]);
                        if !sample.active {
                            self.granted_high = false;
                        }
                        return Poll::Ready(Some(sample));
                    }
                    Ok(None) | Err(TryRecvError::Disconnected) => {
                        self.alive[HIGH] = false;
                        self.granted_high = false;
                    }
                    Err(TryRecvError::Empty) => {
                        // The frame in progress keeps the grant; everyone
                        // else waits for its next byte.
                        park_and_wake(&self.task_parks[HIGH], cx.waker().clone());
                        return Poll::Pending;
                    }
                }
            } else {
                self.granted_high = false;
            }
        }

        for port in 0..self.from_ingressors.len() {
            if !self.alive[port] {
                continue;
            }
            match self.from_ingressors[port].try_recv() {
                Ok(Some(sample)) => {
                    unpark_and_wake(&self.task_parks[port]);
                    if port == HIGH && sample.active {
                        self.granted_high = true;
                    }
                    return Poll::Ready(Some(sample));
                }
                Ok(None) | Err(TryRecvError::Disconnected) => {
                    self.alive[port] = false;
                }
                Err(TryRecvError::Empty) => {}
            }
        }

        if !self.alive.iter().any(|&alive| alive) {
            return Poll::Ready(None);
        }

        // Nothing ready on any live channel. Park one shared handle to our
        // waker in every live task_park; the first ingressor to enqueue
        // takes the waker and the rest find it already claimed.
        let mut parked = false;
        let shared_waker = Arc::new(AtomicCell::new(Some(cx.waker().clone())));
        for port in 0..self.task_parks.len() {
            if self.alive[port]
                && indirect_park_and_wake(&self.task_parks[port], Arc::clone(&shared_waker))
            {
                parked = true;
            }
        }
        if !parked {
            cx.waker().clone().wake();
        }
        Poll::Pending
    }
}
