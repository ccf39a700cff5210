use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use textview_core::{Buffer, Region, Selection};

fn large_text(line_count: usize) -> String {
    let mut out = String::with_capacity(line_count * 64);
    for i in 0..line_count {
        out.push_str(&format!(
            "{i:06} the quick brown fox jumps over the lazy dog (textview-core benchmark line)\n"
        ));
    }
    out.pop();
    out
}

fn random_regions(count: usize, max: usize) -> Vec<Region> {
    let mut rng = StdRng::seed_from_u64(1);
    (0..count)
        .map(|_| {
            let a = rng.gen_range(0..max);
            Region::new(a, (a + rng.gen_range(0..8)).min(max))
        })
        .collect()
}

fn bench_selection_add(c: &mut Criterion) {
    let regions = random_regions(10_000, 1_000_000);
    c.bench_function("selection_add/10k_random", |b| {
        b.iter(|| {
            let mut sel = Selection::new();
            sel.add_all(regions.iter().copied());
            black_box(sel.len());
        })
    });
}

fn bench_selection_merge_all(c: &mut Criterion) {
    let carets: Vec<Region> = (0..10_000).map(|i| Region::caret(i * 2 + 1)).collect();
    c.bench_function("selection_add/cover_10k_carets", |b| {
        b.iter_batched(
            || carets.iter().copied().collect::<Selection>(),
            |mut sel| {
                sel.add(Region::new(0, 20_001));
                black_box(sel.len());
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_transform_region(c: &mut Criterion) {
    let text = large_text(10_000);
    let mut buffer = Buffer::new(&text);
    let start = buffer.stamp();
    let mut offset = buffer.size() / 2;
    for _ in 0..1_000 {
        let edit = buffer.begin_edit().unwrap();
        buffer.insert(&edit, offset, "x").unwrap();
        buffer.end_edit(edit).unwrap();
        offset += 1;
    }

    c.bench_function("transform_region_from/1k_versions", |b| {
        b.iter(|| {
            let region = buffer
                .transform_region_from(black_box(Region::new(10, buffer.size() / 2 + 10)), start)
                .unwrap();
            black_box(region);
        })
    });
}

criterion_group!(
    benches,
    bench_selection_add,
    bench_selection_merge_all,
    bench_transform_region
);
criterion_main!(benches);
