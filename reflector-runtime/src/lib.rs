/// The wire-facing sample type. The outside world hands us a sequence of
/// (byte, active) samples and consumes one back; everything between those two
/// sample streams is this crate.
pub mod wire;

/// Processors are the unit of transformation: a processor is handed each packet that moves
/// through its link and may transform it or drop it. The two frame parsers and the two reply
/// builders are processors; anything that conforms to the trait can be loaded into a link.
pub mod processor;

/// Links connect processors together and manage the flow of packets between independently-paced
/// tasks. A link builds into its runnables (futures the runtime drives) and its egress streams
/// (which the next link ingests). The bounded queues, the input fan-out, the byte-serializing
/// transmitters and the priority arbiter all live here.
pub mod link;

/// The top-level composition: two protocol pipelines fed from one sample stream, arbitrated onto
/// one output.
pub mod responder;

/// Utility module
pub mod utils;
