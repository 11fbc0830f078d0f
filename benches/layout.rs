use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use orgchart_layout::config::LayoutConfig;
use orgchart_layout::ir::CircleRecord;
use orgchart_layout::layout::pack::{Lcg, pack_siblings};
use orgchart_layout::layout::{Circle, compute_layout};
use orgchart_layout::parser::parse_org_structure;
use std::hint::black_box;

/// Org markup with `fanout` sub-circles per circle down to `depth` levels and
/// `roles` roles in every circle.
fn org_source(fanout: usize, depth: usize, roles: usize) -> String {
    fn emit(out: &mut String, prefix: &str, level: usize, fanout: usize, depth: usize, roles: usize) {
        let dashes = "-".repeat(level + 1);
        for r in 0..roles {
            out.push_str(&format!("{dashes} role: {prefix} Role {r}\n"));
        }
        if level >= depth {
            return;
        }
        for c in 0..fanout {
            let name = format!("{prefix}.{c}");
            out.push_str(&format!("{dashes} circle: Circle {name}\n"));
            emit(out, &name, level + 1, fanout, depth, roles);
        }
    }

    let mut out = String::from("root: Bench Org\n");
    emit(&mut out, "C", 0, fanout, depth, roles);
    out
}

fn org_records(fanout: usize, depth: usize, roles: usize) -> Vec<CircleRecord> {
    parse_org_structure(&org_source(fanout, depth, roles))
        .into_records()
        .expect("generated org should parse")
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for (name, fanout, depth, roles) in [("small", 3, 2, 2), ("medium", 4, 3, 3), ("large", 5, 4, 3)] {
        let input = org_source(fanout, depth, roles);
        group.bench_with_input(BenchmarkId::from_parameter(name), &input, |b, data| {
            b.iter(|| {
                let output = parse_org_structure(black_box(data));
                black_box(output.nodes.len());
            });
        });
    }
    group.finish();
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    let config = LayoutConfig::default();
    for (name, fanout, depth, roles) in [("small", 3, 2, 2), ("medium", 4, 3, 3), ("large", 5, 4, 3)] {
        let records = org_records(fanout, depth, roles);
        group.bench_with_input(BenchmarkId::from_parameter(name), &records, |b, data| {
            b.iter(|| {
                let layout = compute_layout(black_box(data), &config).expect("layout failed");
                black_box(layout.nodes.len());
            });
        });
    }
    group.finish();
}

fn bench_layout_passes(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout_passes");
    let records = org_records(4, 3, 3);
    for passes in [0usize, 2, 8] {
        let mut config = LayoutConfig::default();
        config.pack.max_passes = passes;
        group.bench_with_input(BenchmarkId::from_parameter(passes), &config, |b, config| {
            b.iter(|| {
                let layout = compute_layout(black_box(&records), config).expect("layout failed");
                black_box(layout.phantom_count);
            });
        });
    }
    group.finish();
}

fn bench_pack_siblings(c: &mut Criterion) {
    let mut group = c.benchmark_group("pack_siblings");
    for count in [10usize, 100, 1000] {
        let mut random = Lcg::new();
        let radii: Vec<f64> = (0..count).map(|_| 1.0 + random.next_f64() * 20.0).collect();
        group.bench_with_input(BenchmarkId::from_parameter(count), &radii, |b, radii| {
            b.iter(|| {
                let mut circles: Vec<Circle> = radii.iter().map(|&r| Circle::new(0.0, 0.0, r)).collect();
                let r = pack_siblings(&mut circles, &mut Lcg::new());
                black_box(r);
            });
        });
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_parse, bench_layout, bench_layout_passes, bench_pack_siblings
);
criterion_main!(benches);
