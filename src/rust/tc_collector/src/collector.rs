use crate::interfaces::{valid_interfaces, InterfaceLookup};
use crate::reader::{TcReaderError, TcSource};
use crate::tc_records::{TcClass, TcQdisc, TcRecord};
use tracing::debug;

/// Gathers class and qdisc records for a fixed list of interfaces.
///
/// The list is re-checked against the host on every call, so an
/// interface that shows up after startup is picked up on the next
/// collection.
pub struct Collector<S, L> {
  source: S,
  lookup: L,
  interfaces: Vec<String>,
}

impl<S: TcSource, L: InterfaceLookup> Collector<S, L> {
  /// Creates a collector for `interfaces`, in the order given.
  pub fn new(source: S, lookup: L, interfaces: Vec<String>) -> Self {
    Self { source, lookup, interfaces }
  }

  /// The interfaces this collector was configured with.
  pub fn interfaces(&self) -> &[String] {
    &self.interfaces
  }

  /// Every class on every interface that currently exists. Fails as a
  /// whole if any interface fails.
  pub fn classes(&self) -> Result<Vec<TcClass>, TcReaderError> {
    self.collect(|source, interface| source.read_classes(interface))
  }

  /// Every qdisc on every interface that currently exists. Fails as a
  /// whole if any interface fails.
  pub fn qdiscs(&self) -> Result<Vec<TcQdisc>, TcReaderError> {
    self.collect(|source, interface| source.read_qdiscs(interface))
  }

  fn collect<T, F>(&self, read: F) -> Result<Vec<T>, TcReaderError>
  where
    T: TcRecord,
    F: Fn(&S, &str) -> Result<Vec<T>, TcReaderError>,
  {
    let mut result = Vec::new();
    for interface in valid_interfaces(&self.interfaces, &self.lookup) {
      let mut records = read(&self.source, &interface)?;
      debug!("Read {} records from {interface}", records.len());
      records.iter_mut().for_each(|r| r.backfill(&interface));
      result.extend(records);
    }
    Ok(result)
  }
}
