use crate::processor::Processor;
use std::fmt::Debug;
use std::io::{BufWriter, Write};
use std::marker::PhantomData;

/// Processor that logs incoming packets with Debug information, delimited
/// with newlines, and passes them through unchanged. Insert anywhere in a
/// pipeline to watch frames or wire samples go by.
pub struct Log<A, W: Write> {
    phantom: PhantomData<A>,
    log_writer: BufWriter<W>,
}

impl<A, W: Write> Log<A, W> {
    pub fn new(writer: W) -> Log<A, W> {
        Log {
            phantom: PhantomData,
            log_writer: BufWriter::new(writer),
        }
    }
}

/// "It is critical to call flush before BufWriter<W> is dropped.
/// Though dropping will attempt to flush the the contents of the buffer, any errors that happen in
/// the process of dropping will be ignored. Calling flush ensures that the buffer is empty and thus
/// dropping will not even attempt file operations."
/// https://doc.rust-lang.org/std/io/struct.BufWriter.html
impl<A, W: Write> Drop for Log<A, W> {
    fn drop(&mut self) {
        self.log_writer.flush().unwrap();
    }
}

impl<A: Send + Clone + Debug, W: Write> Processor for Log<A, W> {
    type Input = A;
    type Output = A;

    fn process(&mut self, packet: Self::Input) -> Option<Self::Output> {
        self.log_writer
            .write_all(format!("{:?}\n", packet).as_ref())
            .unwrap();
        Some(packet)
    }
}
