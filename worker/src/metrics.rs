/// Running counters for one worker session.
#[derive(Debug, Default, Clone, Copy)]
pub struct WorkerMetrics {
    pub steps: u64,
    pub samples: u64,
}

impl WorkerMetrics {
    #[inline]
    pub fn bump_step(&mut self) {
        self.steps += 1;
    }

    #[inline]
    pub fn add_samples(&mut self, n: u64) {
        self.samples += n;
    }
}
