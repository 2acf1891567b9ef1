use std::fmt;

/// Payload pushed through the queues in benchmarks; big enough that moving it
/// isn't free.
pub struct Message(pub [usize; 4]);

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Message({})", self.0[0])
    }
}

#[inline]
pub fn new(num: usize) -> Message {
    Message([num; 4])
}
