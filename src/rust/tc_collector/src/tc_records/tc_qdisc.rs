/*
{"kind":"htb","handle":"1:","root":true,"refcnt":2,"options":{"r2q":10,"default":"0x10","direct_packets_stat":7,"direct_qlen":1000},
"bytes":1920791512305,"packets":1466145855,"drops":32136937,"overlimits":2627500070,"requeues":1224,"backlog":0,"qlen":0}
*/

use super::{json_bool, json_i64, json_string, json_u64, TcDecodeError};
use serde_json::Value;
use tracing::debug;

/// One queueing discipline on one interface.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct TcQdisc {
  /// Discipline name, e.g. `htb` or `fq_codel`.
  pub kind: String,
  /// Qdisc handle, e.g. `1:`.
  pub handle: String,
  /// Set when the qdisc is attached at the device root.
  pub root: bool,
  /// Parent handle, or `root`.
  pub parent: String,
  /// Interface the qdisc was read from.
  pub device: String,
  /// Discipline options. Only the htb fields are tracked.
  pub options: TcQdiscOptions,
  /// Bytes sent.
  pub bytes: u64,
  /// Packets sent.
  pub packets: u64,
  /// Packets dropped.
  pub drops: u64,
  /// Enqueues over the limit.
  pub overlimits: u64,
  /// Packets requeued.
  pub requeues: u64,
  /// Bytes waiting in the queue.
  pub backlog: u64,
  /// Packets waiting in the queue.
  pub qlen: u64,
}

/// The `options` block of a qdisc.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct TcQdiscOptions {
  /// Divisor used to calculate class quantum from rate.
  pub r2q: u64,
  /// Default class for unclassified traffic.
  pub default: String,
  /// Packets sent directly, bypassing classes (htb).
  pub direct_packets_stat: u64,
  /// Queue length for directly sent packets (htb).
  pub direct_qlen: u64,
}

impl TcQdisc {
  pub(crate) fn from_json(
    map: &serde_json::Map<std::string::String, Value>,
  ) -> Result<Self, TcDecodeError> {
    let mut result = Self::default();
    for (key, value) in map.iter() {
      match key.as_str() {
        "kind" | "class" => result.kind = json_string(key, value)?,
        "handle" => result.handle = json_string(key, value)?,
        "root" => result.root = json_bool(key, value)?,
        "parent" => result.parent = json_string(key, value)?,
        "device" | "dev" => result.device = json_string(key, value)?,
        "options" => result.options = TcQdiscOptions::from_json(value)?,
        "bytes" => result.bytes = json_u64(key, value)?,
        "packets" => result.packets = json_u64(key, value)?,
        "drops" => result.drops = json_u64(key, value)?,
        "overlimits" => result.overlimits = json_u64(key, value)?,
        "requeues" => result.requeues = json_u64(key, value)?,
        "backlog" => result.backlog = json_u64(key, value)?,
        "qlen" => result.qlen = json_u64(key, value)?,
        _ => {
          debug!("Unknown entry in tc qdisc json decoder: {key}");
        }
      }
    }
    Ok(result)
  }
}

impl TcQdiscOptions {
  fn from_json(value: &Value) -> Result<Self, TcDecodeError> {
    let Value::Object(map) = value else {
      return Err(TcDecodeError::QdiscOptions);
    };
    let mut result = Self::default();
    for (key, value) in map.iter() {
      match key.as_str() {
        "r2q" => result.r2q = json_u64(key, value)?,
        "default" => result.default = json_string(key, value)?,
        "direct_packets_stat" => {
          result.direct_packets_stat = json_u64(key, value)?
        }
        "direct_qlen" => result.direct_qlen = json_u64(key, value)?,
        // Other disciplines carry their own options (limit, flows, ...)
        _ => {}
      }
    }
    Ok(result)
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::deserialize_tc_qdiscs;

  const QDISCS: &str = r#"[
    {"kind":"htb","handle":"1:","root":true,"refcnt":2,"options":{"r2q":10,"default":"0x10","direct_packets_stat":7,"direct_qlen":1000},
     "bytes":1920791512305,"packets":1466145855,"drops":32136937,"overlimits":2627500070,"requeues":1224,"backlog":0,"qlen":0},
    {"kind":"fq_codel","handle":"10:","parent":"1:10","options":{"limit":10240,"flows":1024,"quantum":1514,"ecn":true},
     "bytes":500,"packets":10,"drops":0,"overlimits":0,"requeues":0,"backlog":64,"qlen":1,"maxpacket":1514}
  ]"#;

  #[test]
  fn decodes_qdiscs() {
    let qdiscs = deserialize_tc_qdiscs(QDISCS).unwrap();
    assert_eq!(qdiscs.len(), 2);

    let htb = &qdiscs[0];
    assert_eq!(htb.kind, "htb");
    assert_eq!(htb.handle, "1:");
    assert!(htb.root);
    assert_eq!(htb.options.r2q, 10);
    assert_eq!(htb.options.default, "0x10");
    assert_eq!(htb.options.direct_packets_stat, 7);
    assert_eq!(htb.options.direct_qlen, 1000);
    assert_eq!(htb.bytes, 1_920_791_512_305);
    assert_eq!(htb.overlimits, 2_627_500_070);

    let codel = &qdiscs[1];
    assert_eq!(codel.kind, "fq_codel");
    assert_eq!(codel.parent, "1:10");
    assert_eq!(codel.options, TcQdiscOptions::default());
    assert_eq!(codel.backlog, 64);
    assert_eq!(codel.qlen, 1);
  }

  #[test]
  fn mistyped_root_flag_is_an_error() {
    let result = deserialize_tc_qdiscs(r#"[{"kind":"mq","handle":"7fff:","root":"yes"}]"#);
    assert_eq!(
      result.unwrap_err(),
      TcDecodeError::FieldType { key: "root".to_string() }
    );
  }

  #[test]
  fn mistyped_option_is_an_error() {
    let result =
      deserialize_tc_qdiscs(r#"[{"kind":"htb","handle":"1:","options":{"r2q":"ten"}}]"#);
    assert_eq!(
      result.unwrap_err(),
      TcDecodeError::FieldType { key: "r2q".to_string() }
    );
  }

  #[test]
  fn options_must_be_an_object() {
    let result = deserialize_tc_qdiscs(r#"[{"kind":"htb","options":"r2q 10"}]"#);
    assert_eq!(result.unwrap_err(), TcDecodeError::QdiscOptions);
  }
}
