//! Canvas Server Performance Benchmark Suite
//!
//! Measures the serialized tile-change path with a realistic number of
//! logged-in sessions, and the cost of taking a statistics snapshot.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use place_server::{
    board::{Color, Tile},
    config::ServerConfig,
    server::{middleware::ChangeRateLimiter, ServerState, Session},
};
use std::{sync::Arc, time::Duration};
use tokio::{runtime::Runtime, sync::mpsc};
use uuid::Uuid;

/// Builds server state with `sessions` logged-in sessions whose queues are
/// drained in the background.
fn state_with_sessions(rt: &Runtime, sessions: usize) -> Arc<ServerState> {
    let config = ServerConfig {
        dimension: 64,
        ..ServerConfig::default()
    };
    let state = Arc::new(ServerState::new(config).expect("valid benchmark config"));

    rt.block_on(async {
        for i in 0..sessions {
            let (tx, mut rx) = mpsc::unbounded_channel();
            tokio::spawn(async move { while rx.recv().await.is_some() {} });
            let addr = "127.0.0.1:9000".parse().unwrap();
            let limiter = Arc::new(ChangeRateLimiter::new(state.change_quota));
            let session = Session::new(Uuid::new_v4(), format!("user{}", i), addr, tx, limiter);
            state.board.login(Arc::new(session), None).await.unwrap();
        }
    });

    state
}

/// Benchmark group for the critical section: record, validate, set, broadcast.
fn bench_change_tile(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("change_tile");
    group.measurement_time(Duration::from_secs(5));

    for sessions in [1usize, 32, 256] {
        let state = state_with_sessions(&rt, sessions);
        let mut n = 0i32;
        group.bench_with_input(BenchmarkId::from_parameter(sessions), &sessions, |b, _| {
            b.to_async(&rt).iter(|| {
                n = n.wrapping_add(1);
                let tile = Tile::new(n.rem_euclid(64), (n / 64).rem_euclid(64), Color::ALL[n.rem_euclid(16) as usize], "user0");
                let state = state.clone();
                async move { state.board.change_tile(tile).await }
            });
        });
    }

    group.finish();
}

/// Benchmark for building a statistics report over a well-used board.
fn bench_stats_snapshot(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let state = state_with_sessions(&rt, 1);
    for n in 0..10_000i32 {
        let tile = Tile::new(n % 64, (n / 64) % 64, Color::ALL[(n % 16) as usize], format!("user{}", n % 50));
        state.stats.record(&tile);
    }

    c.bench_function("stats_snapshot", |b| b.iter(|| state.stats.snapshot()));
}

// Configure benchmark groups
criterion_group!(
    name = benches;
    config = Criterion::default()
        .significance_level(0.05)
        .noise_threshold(0.05);
    targets = bench_change_tile, bench_stats_snapshot
);
criterion_main!(benches);
