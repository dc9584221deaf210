// KeyCache driving the tagged parser across consecutive passes

use std::sync::Arc;
use std::time::Duration;

use tagged2rowbinary_cache::KeyCache;
use tagged2rowbinary_core::rowbinary::{Point, PointWriter, RecordReader};
use tagged2rowbinary_core::{DedicatedTags, IgnoredMetrics, TaggedParser};

fn points(names: &[&str]) -> Vec<u8> {
    let mut writer = PointWriter::new(Vec::new());
    for name in names {
        writer.write(&Point::at(name, 1.0, 1_700_000_000)).unwrap();
    }
    writer.finish().unwrap()
}

#[test]
fn test_second_pass_after_merge_writes_nothing() {
    let parser = TaggedParser::new("t", DedicatedTags::default(), IgnoredMetrics::none());
    let cache = Arc::new(KeyCache::new(Duration::from_secs(3600)));
    let data = points(&["cpu.load?a=1", "mem.free?b=2", "plain.metric"]);

    let mut first = Vec::new();
    let summary = parser
        .parse_records(&mut RecordReader::new(&data[..]), &cache, &mut first, 1)
        .unwrap();
    assert_eq!(summary.metrics_written, 2);
    cache.merge(summary.new_keys);
    assert_eq!(cache.len(), 2);

    let mut second = Vec::new();
    let summary = parser
        .parse_records(&mut RecordReader::new(&data[..]), &cache, &mut second, 2)
        .unwrap();
    assert!(second.is_empty());
    assert_eq!(summary.skipped_duplicate, 2);
    assert_eq!(summary.skipped_plain, 1);
}

#[test]
fn test_unmerged_keys_are_processed_again() {
    let parser = TaggedParser::new("t", DedicatedTags::default(), IgnoredMetrics::none());
    let cache = KeyCache::default();
    let data = points(&["cpu.load?a=1"]);

    for _ in 0..2 {
        let mut out = Vec::new();
        let summary = parser
            .parse_records(&mut RecordReader::new(&data[..]), &cache, &mut out, 1)
            .unwrap();
        assert_eq!(summary.metrics_written, 1);
        assert!(!out.is_empty());
    }
}
