//! Benchmarks for decoding `tc -s -j` output.
//! The sample files hold an htb tree with 200 leaf classes, each with
//! an fq_codel qdisc below it, as `tc` prints them.

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use tc_collector::*;

const EXAMPLE_CLASSES: &str = include_str!("./example_classes.json");
const EXAMPLE_QDISCS: &str = include_str!("./example_qdiscs.json");

pub fn criterion_benchmark(c: &mut Criterion) {
  c.bench_function("deserialize_classes", |b| {
    b.iter(|| {
      let classes = deserialize_tc_classes(black_box(EXAMPLE_CLASSES)).unwrap();
      black_box(classes);
    });
  });

  c.bench_function("deserialize_qdiscs", |b| {
    b.iter(|| {
      let qdiscs = deserialize_tc_qdiscs(black_box(EXAMPLE_QDISCS)).unwrap();
      black_box(qdiscs);
    });
  });

  c.bench_function("deserialize_and_backfill_classes", |b| {
    b.iter(|| {
      let mut classes = deserialize_tc_classes(EXAMPLE_CLASSES).unwrap();
      classes.iter_mut().for_each(|c| c.backfill("eth0"));
      black_box(classes);
    });
  });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
