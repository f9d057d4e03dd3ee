//! Retrieves class and qdisc statistics from the Linux `tc` shaper for
//! a configured set of interfaces. Interfaces that do not currently
//! exist are skipped, every record is annotated with the device it came
//! from, and root records always report a parent of `root`.
//!
//! Nothing is cached: each call to [`Collector::classes`] or
//! [`Collector::qdiscs`] re-validates the interface list and runs `tc`
//! again.

#![deny(clippy::unwrap_used)]
#![warn(missing_docs)]
mod collector;
mod interfaces;
mod reader;
mod tc_records;

pub use collector::Collector;
pub use interfaces::{valid_interfaces, InterfaceLookup, LinuxInterfaces};
pub use reader::{TcCommand, TcObject, TcReaderError, TcSource, DEFAULT_TC};
pub use tc_records::{
  deserialize_tc_classes, deserialize_tc_qdiscs, TcClass, TcClassStats,
  TcDecodeError, TcQdisc, TcQdiscOptions, TcRecord, ROOT_PARENT,
};
