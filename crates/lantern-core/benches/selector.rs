use std::collections::BTreeSet;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use lantern_core::{EngineConfig, Message, WorkingSet, select_cluster};

fn full_working_set(size: usize) -> WorkingSet {
    let mut set = WorkingSet::new(size);
    for i in 0..size as i64 {
        set.insert(Message {
            id: i + 1,
            content: "remembering ".repeat((i as usize % 20) + 1),
            created_at: 1_700_000_000 + i * 3600,
            approved: true,
            deleted_at: None,
        });
    }
    set
}

fn bench_select(c: &mut Criterion) {
    let config = EngineConfig::default();
    let set = full_working_set(config.working_set_size);
    let priority: BTreeSet<i64> = (380..=400).collect();

    let first = select_cluster(&set, &priority, None, &config, 1).unwrap();

    c.bench_function("select_cluster_400", |b| {
        b.iter(|| {
            select_cluster(
                black_box(&set),
                black_box(&priority),
                Some(black_box(&first)),
                &config,
                2,
            )
        })
    });
}

criterion_group!(benches, bench_select);
criterion_main!(benches);
