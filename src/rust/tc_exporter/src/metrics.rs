//! Prometheus gauges for tc classes and qdiscs.
//!
//! Gauges are split into two groups, each with its own registry so the
//! groups can be scraped independently: slow-moving configuration
//! ("params") and fast-moving counters ("stats"). Every scrape of a
//! group resets it, collects from `tc`, repopulates and encodes while
//! holding that group's lock, so overlapping scrapes never see each
//! other's half-built state.

use parking_lot::Mutex;
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use tc_collector::{
  Collector, InterfaceLookup, TcClass, TcQdisc, TcReaderError, TcRecord, TcSource,
};
use thiserror::Error;
use tracing::debug;

const LABELS: [&str; 4] = ["kind", "handle", "parent", "device"];

/// Which set of gauges a scrape refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
  /// Rates, priorities and qdisc options. Served on `/params`.
  Params,
  /// Byte, packet and queue counters. Served on `/metrics`.
  Stats,
}

/// Why a scrape produced no metrics.
#[derive(Error, Debug)]
pub enum ExportError {
  #[error(transparent)]
  Collect(#[from] TcReaderError),
  #[error("metric encoding failed: {0}")]
  Encode(#[from] prometheus::Error),
  #[error("metric encoding produced invalid UTF-8")]
  Utf8(#[from] std::string::FromUtf8Error),
}

trait MetricGroup: Send {
  fn registry(&self) -> &Registry;
  fn gauges(&self) -> Vec<&GaugeVec>;
  fn observe(&self, classes: &[TcClass], qdiscs: &[TcQdisc]);

  fn reset(&self) {
    self.gauges().into_iter().for_each(|g| g.reset());
  }
}

fn gauge(registry: &Registry, name: &str, help: &str) -> Result<GaugeVec, prometheus::Error> {
  let gauge = GaugeVec::new(Opts::new(name, help), &LABELS)?;
  registry.register(Box::new(gauge.clone()))?;
  Ok(gauge)
}

fn labels<R: TcRecord>(record: &R) -> [&str; 4] {
  [record.kind(), record.handle(), record.parent(), record.device()]
}

struct ParamGauges {
  registry: Registry,
  prio: GaugeVec,
  rate: GaugeVec,
  ceil: GaugeVec,
  burst: GaugeVec,
  cburst: GaugeVec,
  r2q: GaugeVec,
  direct_packets_stat: GaugeVec,
  direct_qlen: GaugeVec,
}

impl ParamGauges {
  fn new() -> Result<Self, prometheus::Error> {
    let registry = Registry::new();
    Ok(Self {
      prio: gauge(&registry, "tc_class_prio", "class priority of leaf; lower are served first")?,
      rate: gauge(&registry, "tc_class_rate", "rate allocated to this class (htb class can still borrow)")?,
      ceil: gauge(&registry, "tc_class_ceil", "rate at which the class can send if its parent has bandwidth to spare (htb)")?,
      burst: gauge(&registry, "tc_class_burst", "bytes that can be burst at ceil speed {computed}")?,
      cburst: gauge(&registry, "tc_class_cburst", "bytes that can be burst at 'infinite' speed {computed}")?,
      r2q: gauge(
        &registry,
        "tc_qdisc_options_r2q",
        "Divisor used to calculate quantum values for classes. Classes divide rate by this number.",
      )?,
      direct_packets_stat: gauge(&registry, "tc_qdisc_options_direct_packets_stat", "direct_packets_stat option")?,
      direct_qlen: gauge(&registry, "tc_qdisc_options_direct_qlen", "direct_qlen option")?,
      registry,
    })
  }
}

impl MetricGroup for ParamGauges {
  fn registry(&self) -> &Registry {
    &self.registry
  }

  fn gauges(&self) -> Vec<&GaugeVec> {
    vec![
      &self.prio,
      &self.rate,
      &self.ceil,
      &self.burst,
      &self.cburst,
      &self.r2q,
      &self.direct_packets_stat,
      &self.direct_qlen,
    ]
  }

  fn observe(&self, classes: &[TcClass], qdiscs: &[TcQdisc]) {
    for class in classes {
      let l = labels(class);
      self.prio.with_label_values(&l).set(class.prio as f64);
      self.rate.with_label_values(&l).set(class.rate as f64);
      self.ceil.with_label_values(&l).set(class.ceil as f64);
      self.burst.with_label_values(&l).set(class.burst as f64);
      self.cburst.with_label_values(&l).set(class.cburst as f64);
    }
    for qdisc in qdiscs {
      let l = labels(qdisc);
      self.r2q.with_label_values(&l).set(qdisc.options.r2q as f64);
      self.direct_packets_stat
        .with_label_values(&l)
        .set(qdisc.options.direct_packets_stat as f64);
      self.direct_qlen
        .with_label_values(&l)
        .set(qdisc.options.direct_qlen as f64);
    }
  }
}

struct StatGauges {
  registry: Registry,
  class_bytes: GaugeVec,
  class_packets: GaugeVec,
  class_drops: GaugeVec,
  class_overlimits: GaugeVec,
  class_requeues: GaugeVec,
  class_lended: GaugeVec,
  class_borrowed: GaugeVec,
  class_backlog: GaugeVec,
  class_qlen: GaugeVec,
  qdisc_bytes: GaugeVec,
  qdisc_packets: GaugeVec,
  qdisc_drops: GaugeVec,
  qdisc_overlimits: GaugeVec,
  qdisc_requeues: GaugeVec,
  qdisc_backlog: GaugeVec,
  qdisc_qlen: GaugeVec,
}

impl StatGauges {
  fn new() -> Result<Self, prometheus::Error> {
    let registry = Registry::new();
    Ok(Self {
      class_bytes: gauge(&registry, "tc_class_stats_bytes", "number of seen bytes")?,
      class_packets: gauge(&registry, "tc_class_stats_packets", "number of seen packets")?,
      class_drops: gauge(&registry, "tc_class_stats_drops", "number of dropped packets")?,
      class_overlimits: gauge(&registry, "tc_class_stats_overlimits", "number of enqueues over the limit")?,
      class_requeues: gauge(&registry, "tc_class_stats_requeues", "number of requeues")?,
      class_lended: gauge(&registry, "tc_class_stats_lended", "lended tokens (htb)")?,
      class_borrowed: gauge(&registry, "tc_class_stats_borrowed", "borrowed tokens (htb)")?,
      class_backlog: gauge(&registry, "tc_class_stats_backlog", "backlog size")?,
      class_qlen: gauge(&registry, "tc_class_stats_qlen", "qlen size")?,
      qdisc_bytes: gauge(&registry, "tc_qdisc_bytes", "number of seen bytes")?,
      qdisc_packets: gauge(&registry, "tc_qdisc_packets", "number of seen packets")?,
      qdisc_drops: gauge(&registry, "tc_qdisc_drops", "number of dropped packets")?,
      qdisc_overlimits: gauge(&registry, "tc_qdisc_overlimits", "number of enqueues over the limit")?,
      qdisc_requeues: gauge(&registry, "tc_qdisc_requeues", "number of requeues")?,
      qdisc_backlog: gauge(&registry, "tc_qdisc_backlog", "backlog size")?,
      qdisc_qlen: gauge(&registry, "tc_qdisc_qlen", "qlen size")?,
      registry,
    })
  }
}

impl MetricGroup for StatGauges {
  fn registry(&self) -> &Registry {
    &self.registry
  }

  fn gauges(&self) -> Vec<&GaugeVec> {
    vec![
      &self.class_bytes,
      &self.class_packets,
      &self.class_drops,
      &self.class_overlimits,
      &self.class_requeues,
      &self.class_lended,
      &self.class_borrowed,
      &self.class_backlog,
      &self.class_qlen,
      &self.qdisc_bytes,
      &self.qdisc_packets,
      &self.qdisc_drops,
      &self.qdisc_overlimits,
      &self.qdisc_requeues,
      &self.qdisc_backlog,
      &self.qdisc_qlen,
    ]
  }

  fn observe(&self, classes: &[TcClass], qdiscs: &[TcQdisc]) {
    for class in classes {
      let l = labels(class);
      let stats = &class.stats;
      self.class_bytes.with_label_values(&l).set(stats.bytes as f64);
      self.class_packets.with_label_values(&l).set(stats.packets as f64);
      self.class_drops.with_label_values(&l).set(stats.drops as f64);
      self.class_overlimits.with_label_values(&l).set(stats.overlimits as f64);
      self.class_requeues.with_label_values(&l).set(stats.requeues as f64);
      self.class_lended.with_label_values(&l).set(stats.lended as f64);
      self.class_borrowed.with_label_values(&l).set(stats.borrowed as f64);
      self.class_backlog.with_label_values(&l).set(stats.backlog as f64);
      self.class_qlen.with_label_values(&l).set(stats.qlen as f64);
    }
    for qdisc in qdiscs {
      let l = labels(qdisc);
      self.qdisc_bytes.with_label_values(&l).set(qdisc.bytes as f64);
      self.qdisc_packets.with_label_values(&l).set(qdisc.packets as f64);
      self.qdisc_drops.with_label_values(&l).set(qdisc.drops as f64);
      self.qdisc_overlimits.with_label_values(&l).set(qdisc.overlimits as f64);
      self.qdisc_requeues.with_label_values(&l).set(qdisc.requeues as f64);
      self.qdisc_backlog.with_label_values(&l).set(qdisc.backlog as f64);
      self.qdisc_qlen.with_label_values(&l).set(qdisc.qlen as f64);
    }
  }
}

/// Owns the collector and both gauge groups.
pub struct Exporter<S, L> {
  collector: Collector<S, L>,
  params: Mutex<ParamGauges>,
  stats: Mutex<StatGauges>,
}

impl<S: TcSource, L: InterfaceLookup> Exporter<S, L> {
  pub fn new(collector: Collector<S, L>) -> Result<Self, prometheus::Error> {
    Ok(Self {
      collector,
      params: Mutex::new(ParamGauges::new()?),
      stats: Mutex::new(StatGauges::new()?),
    })
  }

  /// Refreshes `group` from `tc` and returns it in the Prometheus text
  /// format. On failure the group is left empty.
  pub fn scrape(&self, group: Group) -> Result<String, ExportError> {
    match group {
      Group::Params => self.scrape_group(&self.params),
      Group::Stats => self.scrape_group(&self.stats),
    }
  }

  fn scrape_group<G: MetricGroup>(&self, group: &Mutex<G>) -> Result<String, ExportError> {
    let group = group.lock();
    group.reset();

    let classes = self.collector.classes()?;
    let qdiscs = self.collector.qdiscs()?;
    debug!("Collected {} classes and {} qdiscs", classes.len(), qdiscs.len());
    group.observe(&classes, &qdiscs);

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&group.registry().gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
  }
}
