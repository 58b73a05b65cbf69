/*!
 * Concurrency Primitives Benchmarks
 *
 * Lock acquisition, semaphore signaling, and cooperative fiber switch
 * latency
 */

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use native_concurrency::{Fiber, Mutex, RwLock, Semaphore};
use std::ffi::c_void;
use std::time::Duration;

fn bench_mutex_uncontended(c: &mut Criterion) {
    let mutex = Mutex::new();
    c.bench_function("mutex_uncontended_lock_unlock", |b| {
        b.iter(|| {
            mutex.lock();
            black_box(&mutex);
            mutex.unlock();
        });
    });
}

fn bench_mutex_reentrant_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("mutex_reentrant_depth");

    for depth in [1usize, 2, 4, 8] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            let mutex = Mutex::new();
            b.iter(|| {
                for _ in 0..depth {
                    mutex.lock();
                }
                for _ in 0..depth {
                    mutex.unlock();
                }
            });
        });
    }

    group.finish();
}

fn bench_rwlock_read_acquire(c: &mut Criterion) {
    let lock = RwLock::new();
    c.bench_function("rwlock_read_acquire_release", |b| {
        b.iter(|| {
            lock.begin_read();
            black_box(&lock);
            lock.end_read();
        });
    });
}

fn bench_semaphore_signal_wait(c: &mut Criterion) {
    let semaphore = Semaphore::new(0, 1024, None).unwrap();
    c.bench_function("semaphore_signal_then_poll", |b| {
        b.iter(|| {
            semaphore.signal(1);
            semaphore.wait(Some(Duration::ZERO));
        });
    });
}

fn ping_pong(data: *mut c_void) {
    let origin = data as *const Fiber;
    loop {
        unsafe { (*origin).switch_to() };
    }
}

fn bench_fiber_switch_round_trip(c: &mut Criterion) {
    let origin = Fiber::convert_thread(Some("bench-origin")).unwrap();
    let ponger = Fiber::spawn(
        ping_pong,
        &origin as *const Fiber as *mut c_void,
        256 * 1024,
        Some("bench-ponger"),
    )
    .unwrap();

    c.bench_function("fiber_switch_round_trip", |b| {
        b.iter(|| {
            // One switch out plus the ponger's switch back.
            ponger.switch_to();
        });
    });
}

criterion_group!(
    benches,
    bench_mutex_uncontended,
    bench_mutex_reentrant_depth,
    bench_rwlock_read_acquire,
    bench_semaphore_signal_wait,
    bench_fiber_switch_round_trip
);
criterion_main!(benches);
