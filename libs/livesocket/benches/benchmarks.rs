//! Benchmarks for the livesocket hot paths
//!
//! Run with: cargo bench -p livesocket

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use livesocket::core::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
use livesocket::core::pong_tracker::PongTracker;
use livesocket::traits::pong_detector::{ExactPongDetector, PongDetector};
use livesocket::traits::reconnect::{ExponentialBackoff, FixedDelay, ReconnectionStrategy};
use livesocket::{Frame, PingConfig};

/// Every inbound frame goes through the pong check
fn bench_pong_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("pong_detection");
    group.throughput(Throughput::Elements(1));

    let detector = ExactPongDetector::new(r#"{"type":"pong"}"#);
    let exact = Frame::from(r#"{"type":"pong"}"#);
    let same_length = Frame::from(r#"{"type":"ping"}"#);
    let short = Frame::from("ok");
    let large = Frame::Text("x".repeat(16 * 1024));

    group.bench_function("exact_match", |b| b.iter(|| black_box(detector.is_pong(black_box(&exact)))));
    group.bench_function("same_length_miss", |b| {
        b.iter(|| black_box(detector.is_pong(black_box(&same_length))))
    });
    group.bench_function("length_miss_short", |b| b.iter(|| black_box(detector.is_pong(black_box(&short)))));
    group.bench_function("length_miss_16k", |b| b.iter(|| black_box(detector.is_pong(black_box(&large)))));

    // Through PingConfig, as the read loop calls it
    let ping = PingConfig::new(
        Duration::from_secs(10),
        Frame::from("ping"),
        Some(Arc::new(detector) as Arc<dyn PongDetector>),
        None,
    );
    group.bench_function("ping_config_is_pong", |b| b.iter(|| black_box(ping.is_pong(black_box(&same_length)))));

    let disabled = PingConfig::disabled();
    group.bench_function("ping_config_disabled", |b| b.iter(|| black_box(disabled.is_pong(black_box(&exact)))));

    group.finish();
}

/// Benchmark atomic state operations
fn bench_atomic_state(c: &mut Criterion) {
    let mut group = c.benchmark_group("atomic_state");

    group.bench_function("get", |b| {
        let state = AtomicConnectionState::new(ConnectionState::Connected);
        b.iter(|| black_box(state.get()))
    });

    // Send and read check this before touching the dispatcher
    group.bench_function("is_terminal", |b| {
        let state = AtomicConnectionState::new(ConnectionState::Connected);
        b.iter(|| black_box(state.is_terminal()))
    });

    group.bench_function("advance", |b| {
        let state = AtomicConnectionState::new(ConnectionState::Connected);
        b.iter(|| {
            black_box(state.advance(black_box(ConnectionState::Reconnecting)));
            black_box(state.advance(black_box(ConnectionState::Connected)));
        })
    });

    group.bench_function("advance_refused_when_closed", |b| {
        let state = AtomicConnectionState::new(ConnectionState::Closed);
        b.iter(|| black_box(state.advance(black_box(ConnectionState::Connected))))
    });

    group.finish();
}

/// Benchmark atomic metrics operations
fn bench_atomic_metrics(c: &mut Criterion) {
    let mut group = c.benchmark_group("atomic_metrics");
    group.throughput(Throughput::Elements(1));

    group.bench_function("increment_received", |b| {
        let metrics = AtomicMetrics::new();
        b.iter(|| metrics.increment_received())
    });

    group.bench_function("increment_pongs", |b| {
        let metrics = AtomicMetrics::new();
        b.iter(|| metrics.increment_pongs())
    });

    group.bench_function("arc_increment_sent", |b| {
        let metrics = Arc::new(AtomicMetrics::new());
        b.iter(|| metrics.increment_sent())
    });

    group.finish();
}

/// Benchmark pong tracker operations
fn bench_pong_tracker(c: &mut Criterion) {
    let mut group = c.benchmark_group("pong_tracker");

    group.bench_function("record_ping_sent", |b| {
        let tracker = PongTracker::new(Duration::from_secs(15));
        b.iter(|| black_box(tracker.record_ping_sent()))
    });

    group.bench_function("record_pong_received", |b| {
        let tracker = PongTracker::new(Duration::from_secs(15));
        b.iter(|| tracker.record_pong_received())
    });

    group.bench_function("pong_since", |b| {
        let tracker = PongTracker::new(Duration::from_secs(15));
        let mark = tracker.record_ping_sent();
        tracker.record_pong_received();
        b.iter(|| black_box(tracker.pong_since(black_box(mark))))
    });

    group.bench_function("is_healthy_awaiting_pong", |b| {
        let tracker = PongTracker::new(Duration::from_secs(15));
        tracker.record_ping_sent();
        b.iter(|| black_box(tracker.is_healthy()))
    });

    group.finish();
}

/// Benchmark reconnection strategy calculations
fn bench_reconnection_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconnection_strategies");

    let plain = ExponentialBackoff::new(Duration::from_millis(100), Duration::from_secs(30), None);
    let jittered = plain.clone().with_jitter(true);

    for attempt in [0usize, 5, 64] {
        group.bench_with_input(BenchmarkId::new("exponential", attempt), &attempt, |b, &attempt| {
            b.iter(|| black_box(plain.next_delay(black_box(attempt))))
        });
        group.bench_with_input(BenchmarkId::new("exponential_jitter", attempt), &attempt, |b, &attempt| {
            b.iter(|| black_box(jittered.next_delay(black_box(attempt))))
        });
    }

    group.bench_function("fixed_delay_next_delay", |b| {
        let strategy = FixedDelay::new(Duration::from_millis(500), None);
        b.iter(|| black_box(strategy.next_delay(black_box(5))))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_pong_detection,
    bench_atomic_state,
    bench_atomic_metrics,
    bench_pong_tracker,
    bench_reconnection_strategies,
);

criterion_main!(benches);
