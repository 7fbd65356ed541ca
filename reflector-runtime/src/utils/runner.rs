use crate::link::primitive::{InputChannelLink, OutputChannelLink};
use crate::link::{EgressLinkBuilder, IngressLinkBuilder, LinkBuilder};
use crate::wire::WireSample;
use crossbeam::crossbeam_channel;
use tokio::runtime;
use tokio::task::JoinHandle;

/// Hooks a responder up to its host I/O and drives it to completion.
///
/// The host glue owns the channel ends: it feeds received wire samples into
/// `wire_in` from its own thread and drains `wire_out` onto the wire. This
/// function wraps the channels in ingress and egress links around the
/// provided responder builder, spawns everything on a tokio runtime, and
/// blocks until the input side disconnects and the pipeline has flushed.
pub fn build_and_run_responder<Responder: LinkBuilder<WireSample, WireSample>>(
    wire_in: crossbeam_channel::Receiver<WireSample>,
    wire_out: crossbeam_channel::Sender<WireSample>,
    responder: Responder,
) {
    let mut runtime = runtime::Builder::new()
        .threaded_scheduler()
        .enable_all()
        .build()
        .unwrap();

    runtime.block_on(async {
        let (mut runnables, ingress_streams) =
            InputChannelLink::new().channel(wire_in).build_link();

        let (mut responder_runnables, mut responder_egressors) =
            responder.ingressors(ingress_streams).build_link();
        runnables.append(&mut responder_runnables);

        let (mut egress_runnables, _) = OutputChannelLink::new()
            .ingressor(responder_egressors.remove(0))
            .channel(wire_out)
            .build_link();
        runnables.append(&mut egress_runnables);

        let handles: Vec<JoinHandle<()>> = runnables.into_iter().map(tokio::spawn).collect();
        for handle in handles {
            handle.await.unwrap();
        }
    })
}
