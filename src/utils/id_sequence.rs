/// Monotonic identifier source scoped to one generation run.
///
/// Identifiers are unique within a single response only.
#[derive(Debug, Clone)]
pub struct IdSequence {
    next: i64,
}

impl IdSequence {
    pub fn starting_at(seed: i64) -> Self {
        Self { next: seed }
    }

    pub fn next_id(&mut self) -> i64 {
        let id = self.next;
        self.next += 1;
        id
    }
}
