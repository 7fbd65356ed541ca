mod frame_parser;
pub use self::frame_parser::*;

mod reply;
pub use self::reply::*;

mod log;
pub use self::log::*;

pub trait Processor {
    type Input: Send + Clone;
    type Output: Send + Clone;

    fn process(&mut self, packet: Self::Input) -> Option<Self::Output>;
}
