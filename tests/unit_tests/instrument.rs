use dgflux::backend::{GatherKernel, KernelError};
use dgflux::face_group::{FaceGroup, FaceGroupBuilder};
use dgflux::instrument::{time_and_count, time_count_flop, EventCounter, IntervalTimer};
use std::sync::Arc;
use std::time::Duration;

struct Fill(f64);

impl GatherKernel for Fill {
    fn call(&self, _: &FaceGroup, outputs: &mut [&mut [f64]], _: &[&[f64]]) -> Result<(), KernelError> {
        for output in outputs {
            output.fill(self.0);
        }
        Ok(())
    }
}

#[test]
fn timer_and_counter_accumulate() {
    let timer = IntervalTimer::new();
    timer.add_interval(Duration::from_millis(3));
    timer.add_interval(Duration::from_millis(4));
    assert_eq!(timer.elapsed(), Duration::from_millis(7));
    assert_eq!(timer.reset(), Duration::from_millis(7));
    assert_eq!(timer.elapsed(), Duration::ZERO);

    let counter = EventCounter::new();
    counter.increment();
    counter.add(41);
    assert_eq!(counter.count(), 42);
    assert_eq!(counter.reset(), 42);
    assert_eq!(counter.count(), 0);
}

#[test]
fn wrapped_kernels_record_calls_and_flops() {
    let group = FaceGroupBuilder::new(1, 1).build();
    let timer = Arc::new(IntervalTimer::new());
    let counter = Arc::new(EventCounter::new());
    let flops = Arc::new(EventCounter::new());

    let kernel = time_count_flop(Fill(3.0), timer.clone(), counter.clone(), flops.clone(), 100);
    let mut output = [0.0; 2];
    for _ in 0..3 {
        kernel.call(&group, &mut [&mut output[..]], &[]).unwrap();
    }
    assert_eq!(output, [3.0, 3.0]);
    assert_eq!(counter.count(), 3);
    assert_eq!(flops.count(), 300);

    let kernel = time_and_count(Fill(1.0), timer, counter.clone());
    kernel.call(&group, &mut [], &[]).unwrap();
    assert_eq!(counter.count(), 4);
    assert_eq!(flops.count(), 300);
}
