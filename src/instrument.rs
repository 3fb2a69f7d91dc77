//! Timing and counting sinks for instrumented gather kernels.
use crate::backend::{GatherKernel, KernelError};
use crate::face_group::FaceGroup;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Accumulates the time spent in a number of intervals.
#[derive(Debug, Default)]
pub struct IntervalTimer {
    elapsed: Mutex<Duration>,
}

impl IntervalTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_interval(&self, interval: Duration) {
        *self.elapsed.lock() += interval;
    }

    /// Total time of all intervals recorded since the last reset.
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }

    pub fn reset(&self) -> Duration {
        std::mem::take(&mut *self.elapsed.lock())
    }
}

#[derive(Debug, Default)]
pub struct EventCounter {
    count: AtomicU64,
}

impl EventCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, events: u64) {
        self.count.fetch_add(events, Ordering::Relaxed);
    }

    pub fn increment(&self) {
        self.add(1);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn reset(&self) -> u64 {
        self.count.swap(0, Ordering::Relaxed)
    }
}

struct InstrumentedKernel<K> {
    kernel: K,
    timer: Arc<IntervalTimer>,
    counter: Arc<EventCounter>,
    flops: Option<(Arc<EventCounter>, u64)>,
}

impl<K: GatherKernel> GatherKernel for InstrumentedKernel<K> {
    fn call(&self, face_group: &FaceGroup, outputs: &mut [&mut [f64]], inputs: &[&[f64]]) -> Result<(), KernelError> {
        let start = Instant::now();
        let result = self.kernel.call(face_group, outputs, inputs);
        self.timer.add_interval(start.elapsed());
        self.counter.increment();
        if let Some((flop_counter, flops)) = &self.flops {
            flop_counter.add(*flops);
        }
        result
    }
}

/// Wraps `kernel` so that every call records its duration, the call itself and `flops`
/// floating point operations.
pub fn time_count_flop<K>(
    kernel: K,
    timer: Arc<IntervalTimer>,
    counter: Arc<EventCounter>,
    flop_counter: Arc<EventCounter>,
    flops: u64,
) -> impl GatherKernel
where
    K: GatherKernel,
{
    InstrumentedKernel {
        kernel,
        timer,
        counter,
        flops: Some((flop_counter, flops)),
    }
}

/// Wraps `kernel` so that every call records its duration and the call itself.
pub fn time_and_count<K>(kernel: K, timer: Arc<IntervalTimer>, counter: Arc<EventCounter>) -> impl GatherKernel
where
    K: GatherKernel,
{
    InstrumentedKernel {
        kernel,
        timer,
        counter,
        flops: None,
    }
}
