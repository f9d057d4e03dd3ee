/*
{"class":"htb","handle":"1:10","parent":"1:1","leaf":"10:","prio":0,"rate":12500000,"ceil":25000000,"burst":1600,"cburst":1600,
"stats":{"bytes":23400,"packets":180,"drops":0,"overlimits":0,"requeues":0,"backlog":0,"qlen":0,"lended":180,"borrowed":0,"giants":0,"tokens":15500,"ctokens":7750}}
*/

use super::{json_bool, json_i64, json_string, json_u64, TcDecodeError};
use serde_json::Value;
use tracing::debug;

/// One traffic-control class on one interface.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct TcClass {
  /// Discipline name, e.g. `htb`.
  pub kind: String,
  /// Class id, unique within a device and parent.
  pub handle: String,
  /// Set for classes attached directly to the qdisc root.
  pub root: bool,
  /// Parent class id, or `root`.
  pub parent: String,
  /// Handle of the qdisc attached below this class, if any.
  pub leaf: String,
  /// Interface the class was read from.
  pub device: String,
  /// Priority; lower is served first.
  pub prio: i64,
  /// Guaranteed rate, bytes per second.
  pub rate: u64,
  /// Rate the class may borrow up to, bytes per second.
  pub ceil: u64,
  /// Bytes that may be burst at ceil speed.
  pub burst: u64,
  /// Bytes that may be burst at unlimited speed.
  pub cburst: u64,
  /// Counters captured when `tc` ran.
  pub stats: TcClassStats,
}

/// The `stats` block of a class.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct TcClassStats {
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
  /// Packets sent from this class's own rate (htb).
  pub lended: u64,
  /// Packets sent on tokens borrowed from a parent (htb).
  pub borrowed: u64,
  /// Packets larger than the configured MTU (htb).
  pub giants: u64,
  /// Remaining tokens at rate.
  pub tokens: i64,
  /// Remaining tokens at ceil.
  pub ctokens: i64,
}

impl TcClass {
  pub(crate) fn from_json(
    map: &serde_json::Map<std::string::String, Value>,
  ) -> Result<Self, TcDecodeError> {
    let mut result = Self::default();
    for (key, value) in map.iter() {
      match key.as_str() {
        // `class` on current iproute2, `kind` on some older builds
        "class" | "kind" => result.kind = json_string(key, value)?,
        "handle" => result.handle = json_string(key, value)?,
        "root" => result.root = json_bool(key, value)?,
        "parent" => result.parent = json_string(key, value)?,
        "leaf" => result.leaf = json_string(key, value)?,
        "device" | "dev" => result.device = json_string(key, value)?,
        "prio" => result.prio = json_i64(key, value)?,
        "rate" => result.rate = json_u64(key, value)?,
        "ceil" => result.ceil = json_u64(key, value)?,
        "burst" => result.burst = json_u64(key, value)?,
        "cburst" => result.cburst = json_u64(key, value)?,
        "stats" => result.stats = TcClassStats::from_json(value)?,
        _ => {
          debug!("Unknown entry in tc class json decoder: {key}");
        }
      }
    }
    Ok(result)
  }
}

impl TcClassStats {
  fn from_json(value: &Value) -> Result<Self, TcDecodeError> {
    let Value::Object(map) = value else {
      return Err(TcDecodeError::ClassStats);
    };
    let mut result = Self::default();
    for (key, value) in map.iter() {
      match key.as_str() {
        "bytes" => result.bytes = json_u64(key, value)?,
        "packets" => result.packets = json_u64(key, value)?,
        "drops" => result.drops = json_u64(key, value)?,
        "overlimits" => result.overlimits = json_u64(key, value)?,
        "requeues" => result.requeues = json_u64(key, value)?,
        "backlog" => result.backlog = json_u64(key, value)?,
        "qlen" => result.qlen = json_u64(key, value)?,
        "lended" => result.lended = json_u64(key, value)?,
        "borrowed" => result.borrowed = json_u64(key, value)?,
        "giants" => result.giants = json_u64(key, value)?,
        "tokens" => result.tokens = json_i64(key, value)?,
        "ctokens" => result.ctokens = json_i64(key, value)?,
        _ => {
          debug!("Unknown entry in tc class stats json decoder: {key}");
        }
      }
    }
    Ok(result)
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::deserialize_tc_classes;

  const HTB_CLASSES: &str = r#"[
    {"class":"htb","handle":"1:1","root":true,"rate":125000000,"ceil":125000000,"burst":1500,"cburst":1500,
     "stats":{"bytes":9000,"packets":60,"drops":0,"overlimits":0,"requeues":0,"backlog":0,"qlen":0,"lended":10,"borrowed":0,"giants":0,"tokens":1500,"ctokens":1500}},
    {"class":"htb","handle":"1:10","parent":"1:1","leaf":"10:","prio":2,"rate":1000000,"ceil":2000000,"burst":1600,"cburst":1600,
     "stats":{"bytes":500,"packets":10,"drops":1,"overlimits":3,"requeues":0,"backlog":120,"qlen":2,"lended":4,"borrowed":6,"giants":0,"tokens":-200,"ctokens":7750}}
  ]"#;

  #[test]
  fn decodes_htb_classes() {
    let classes = deserialize_tc_classes(HTB_CLASSES).unwrap();
    assert_eq!(classes.len(), 2);

    let root = &classes[0];
    assert_eq!(root.kind, "htb");
    assert_eq!(root.handle, "1:1");
    assert!(root.root);
    assert_eq!(root.parent, "");

    let leaf = &classes[1];
    assert_eq!(leaf.handle, "1:10");
    assert_eq!(leaf.parent, "1:1");
    assert_eq!(leaf.leaf, "10:");
    assert_eq!(leaf.prio, 2);
    assert_eq!(leaf.rate, 1_000_000);
    assert_eq!(leaf.ceil, 2_000_000);
    assert_eq!(leaf.stats.bytes, 500);
    assert_eq!(leaf.stats.packets, 10);
    assert_eq!(leaf.stats.backlog, 120);
    assert_eq!(leaf.stats.borrowed, 6);
    assert_eq!(leaf.stats.tokens, -200);
  }

  #[test]
  fn accepts_kind_key() {
    let classes =
      deserialize_tc_classes(r#"[{"kind":"hfsc","handle":"1:2"}]"#).unwrap();
    assert_eq!(classes[0].kind, "hfsc");
  }

  #[test]
  fn mistyped_field_is_an_error() {
    let result = deserialize_tc_classes(
      r#"[{"class":"htb","handle":"1:3","rate":"1Mbit"}]"#,
    );
    assert_eq!(
      result.unwrap_err(),
      TcDecodeError::FieldType { key: "rate".to_string() }
    );
  }

  #[test]
  fn negative_counter_is_an_error() {
    let result = deserialize_tc_classes(r#"[{"class":"htb","handle":"1:3","rate":-5}]"#);
    assert_eq!(
      result.unwrap_err(),
      TcDecodeError::FieldType { key: "rate".to_string() }
    );
  }

  #[test]
  fn mistyped_stats_field_is_an_error() {
    let result = deserialize_tc_classes(
      r#"[{"class":"htb","handle":"1:10","stats":{"bytes":"500"}}]"#,
    );
    assert_eq!(
      result.unwrap_err(),
      TcDecodeError::FieldType { key: "bytes".to_string() }
    );
  }

  #[test]
  fn missing_fields_default() {
    let classes = deserialize_tc_classes(r#"[{"class":"htb","handle":"1:3"}]"#).unwrap();
    assert_eq!(classes[0].rate, 0);
    assert_eq!(classes[0].prio, 0);
    assert!(!classes[0].root);
    assert_eq!(classes[0].stats, TcClassStats::default());
  }

  #[test]
  fn unknown_keys_are_ignored() {
    let classes = deserialize_tc_classes(
      r#"[{"class":"fq_codel","handle":"10:1","xstats":{"deficit":1514}}]"#,
    )
    .unwrap();
    assert_eq!(classes[0].kind, "fq_codel");
  }

  #[test]
  fn stats_must_be_an_object() {
    let result =
      deserialize_tc_classes(r#"[{"class":"htb","handle":"1:3","stats":[1,2]}]"#);
    assert_eq!(result.unwrap_err(), TcDecodeError::ClassStats);
  }
}
