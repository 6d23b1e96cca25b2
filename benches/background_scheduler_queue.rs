//! Throughput of the priority task pool under varying queue
//! depths and priority mixes.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use async_trait::async_trait;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use orchard::domain::errors::OrchardResult;
use orchard::domain::models::{BackgroundTask, Priority};
use orchard::domain::ports::BackgroundHandler;
use orchard::services::BackgroundScheduler;

struct NoopHandler(&'static str);

#[async_trait]
impl BackgroundHandler for NoopHandler {
    fn task_type(&self) -> &'static str {
        self.0
    }

    async fn handle(&self, _task: &BackgroundTask, _cancelled: &AtomicBool) -> OrchardResult<serde_json::Value> {
        Ok(serde_json::Value::Null)
    }
}

fn scheduler_with(depth: usize) -> BackgroundScheduler {
    let handlers: Vec<Arc<dyn BackgroundHandler>> =
        vec![Arc::new(NoopHandler("maintenance")), Arc::new(NoopHandler("index_update"))];
    BackgroundScheduler::new(handlers, depth)
}

fn bench_submit_throughput(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("submit_throughput");

    for depth in [64, 512, 4096] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            b.to_async(&rt).iter(|| async {
                let scheduler = scheduler_with(depth);
                for i in 0..depth.min(256) {
                    let priority = if i % 4 == 0 { Priority::High } else { Priority::Low };
                    scheduler.submit("maintenance", priority, None, serde_json::Map::new()).await.unwrap();
                }
            });
        });
    }

    group.finish();
}

fn bench_drain_mixed_priority_queue(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("drain_256_mixed_priority_tasks", |b| {
        b.to_async(&rt).iter(|| async {
            let scheduler = scheduler_with(1024);
            for i in 0..256 {
                let (task_type, priority) = if i % 3 == 0 { ("index_update", Priority::High) } else { ("maintenance", Priority::Low) };
                scheduler.submit(task_type, priority, None, serde_json::Map::new()).await.unwrap();
            }
            while scheduler.run_worker().await.unwrap() {}
        });
    });
}

criterion_group!(benches, bench_submit_throughput, bench_drain_mixed_priority_queue);
criterion_main!(benches);
