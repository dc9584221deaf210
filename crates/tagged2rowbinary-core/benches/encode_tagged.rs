// Tagged pipeline benchmark - identifier parsing and full file passes
//
// `parse_identifier` isolates the tag parser; `parse_records` measures the
// whole read -> filter -> dedup -> encode -> write path over an in-memory file.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tagged2rowbinary_core::rowbinary::{Point, PointWriter, RecordReader};
use tagged2rowbinary_core::tagged::parse;
use tagged2rowbinary_core::{DedicatedTags, IgnoredMetrics, NoCache, TaggedParser};

#[derive(Debug, Clone, Copy)]
enum WorkloadSize {
    Small,
    Medium,
}

impl WorkloadSize {
    fn record_count(self) -> usize {
        match self {
            WorkloadSize::Small => 1_000,
            WorkloadSize::Medium => 50_000,
        }
    }
}

fn identifiers(size: WorkloadSize) -> Vec<String> {
    (0..size.record_count())
        .map(|i| {
            format!(
                "service.requests.count?env=prod&host=web-{:04}&region=eu-{}&path=%2Fapi%2Fv{}",
                i,
                i % 4,
                i % 3
            )
        })
        .collect()
}

fn point_file(names: &[String]) -> Vec<u8> {
    let mut writer = PointWriter::new(Vec::new());
    for name in names {
        writer
            .write(&Point::at(name, 1.0, 1_700_000_000))
            .unwrap();
    }
    writer.finish().unwrap()
}

fn bench_parse_identifier(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_identifier");

    for size in [WorkloadSize::Small, WorkloadSize::Medium] {
        let names = identifiers(size);
        group.throughput(Throughput::Elements(names.len() as u64));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{:?}", size)),
            &names,
            |b, names| {
                b.iter(|| {
                    for name in names {
                        black_box(parse(name).unwrap());
                    }
                });
            },
        );
    }

    group.finish();
}

fn bench_parse_records(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_records");
    let parser = TaggedParser::new(
        "graphite_tagged",
        DedicatedTags::new([("env", "Env")]),
        IgnoredMetrics::none(),
    );

    for size in [WorkloadSize::Small, WorkloadSize::Medium] {
        let data = point_file(&identifiers(size));
        group.throughput(Throughput::Elements(size.record_count() as u64));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{:?}", size)),
            &data,
            |b, data| {
                b.iter(|| {
                    let mut reader = RecordReader::new(&data[..]);
                    let mut out = Vec::with_capacity(data.len() * 4);
                    let summary = parser
                        .parse_records(&mut reader, &NoCache, &mut out, 1)
                        .unwrap();
                    black_box((summary.rows_written, out.len()));
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_parse_identifier, bench_parse_records);
criterion_main!(benches);
