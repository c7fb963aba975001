use std::time::Duration;

/// Accumulated per-stage durations (preprocess, inference, postprocess) across calls.
#[derive(Debug, Default)]
pub struct TimeCalc {
    n: usize,
    duration: Vec<Duration>,
}

impl TimeCalc {
    pub fn total(&self) -> Duration {
        self.duration.iter().sum::<Duration>()
    }

    /// Number of completed calls.
    pub fn n(&self) -> usize {
        self.n
    }

    pub fn avg(&self) -> Duration {
        match self.n {
            0 => Duration::ZERO,
            n => self.total() / n as u32,
        }
    }

    pub fn avg_i(&self, i: usize) -> Duration {
        match (self.duration.get(i), self.n) {
            (Some(d), n) if n > 0 => *d / n as u32,
            _ => Duration::ZERO,
        }
    }

    /// Adds one call's stage durations.
    pub fn record(&mut self, stages: &[Duration]) {
        for (i, x) in stages.iter().enumerate() {
            match self.duration.get_mut(i) {
                Some(elem) => *elem += *x,
                None => self.duration.push(*x),
            }
        }
        self.n += 1;
    }
}
