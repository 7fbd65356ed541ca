/// A pull-based link that runs each packet through its processor inline. It
/// cannot store packets, so everything either leaves immediately or is
/// dropped; both sides run on the same task.
mod process_link;
pub use self::process_link::*;

/// Input packets are run through a processor and placed into a bounded
/// intermediate channel that the output pulls from asynchronously. This is
/// the cross-domain queue of the design: it creates the task boundary
/// between the receive pace and the transmit pace, and it is the one place
/// where load is shed: a packet arriving at a full channel is dropped,
/// silently.
mod queue_link;
pub use self::queue_link::*;

/// Copies every input packet to each of its egressors; feeds one wire input
/// to both protocol parsers.
mod fork_link;
pub use self::fork_link::*;

/// Serializes reply frames onto the wire one byte per poll, in frame order,
/// with a falling-edge sample after each frame.
mod transmit_link;
pub use self::transmit_link::*;

/// Combines the two transmitters onto the single output with strict
/// priority, not fairness.
mod priority_join_link;
pub use self::priority_join_link::*;

/// Takes a channel for input and converts it to a stream.
mod input_channel_link;
pub use self::input_channel_link::*;

/// Takes a stream and converts it to a channel for output.
mod output_channel_link;
pub use self::output_channel_link::*;
