/// Issues sequence numbers for outbound messages of a single connection.
#[derive(Debug)]
pub struct SequenceAllocator {
    next: i64,
}

impl Default for SequenceAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl SequenceAllocator {
    pub fn next(&mut self) -> i64 {
        let s = self.next;
        self.next += 1;
        s
    }
}
