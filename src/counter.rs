use std::fmt;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Counter {
    candidates: usize,
    moved: usize,
    skipped: usize,
    failed: usize,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, counter: Counters) {
        match counter {
            Counters::Candidates => self.candidates += 1,
            Counters::Moved => self.moved += 1,
            Counters::Skipped => self.skipped += 1,
            Counters::Failed => self.failed += 1,
        };
    }

    pub fn get(&self, counter: Counters) -> usize {
        match counter {
            Counters::Candidates => self.candidates,
            Counters::Moved => self.moved,
            Counters::Skipped => self.skipped,
            Counters::Failed => self.failed,
        }
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Moved files: {}", self.moved)?;
        writeln!(f, "Skipped files (no date): {}", self.skipped)?;
        write!(f, "Failed moves: {}", self.failed)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Counters {
    Candidates,
    Moved,
    Skipped,
    Failed,
}
