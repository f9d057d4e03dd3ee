mod tc_class;
mod tc_qdisc;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

pub use tc_class::{TcClass, TcClassStats};
pub use tc_qdisc::{TcQdisc, TcQdiscOptions};

/// Parent reported for any record whose `root` flag is set.
pub const ROOT_PARENT: &str = "root";

/// Fields shared by every record `tc` reports, and the annotation
/// applied once we know which interface produced it.
pub trait TcRecord {
  /// Discipline name, e.g. `htb`.
  fn kind(&self) -> &str;
  /// The record's own handle.
  fn handle(&self) -> &str;
  /// The parent handle, or `root`.
  fn parent(&self) -> &str;
  /// The interface the record was read from.
  fn device(&self) -> &str;

  /// Stamps the record with its interface and normalizes the parent
  /// of root records. `tc` doesn't always report either correctly.
  fn backfill(&mut self, device: &str);
}

macro_rules! impl_tc_record {
  ($t: ty) => {
    impl TcRecord for $t {
      fn kind(&self) -> &str {
        &self.kind
      }
      fn handle(&self) -> &str {
        &self.handle
      }
      fn parent(&self) -> &str {
        &self.parent
      }
      fn device(&self) -> &str {
        &self.device
      }
      fn backfill(&mut self, device: &str) {
        self.device = device.to_string();
        if self.root {
          self.parent = ROOT_PARENT.to_string();
        }
      }
    }
  };
}

impl_tc_record!(TcClass);
impl_tc_record!(TcQdisc);

/// Decodes the output of `tc -s -j class show`.
pub fn deserialize_tc_classes(json: &str) -> Result<Vec<TcClass>, TcDecodeError> {
  deserialize_tc_array(json, TcClass::from_json)
}

/// Decodes the output of `tc -s -j qdisc show`.
pub fn deserialize_tc_qdiscs(json: &str) -> Result<Vec<TcQdisc>, TcDecodeError> {
  deserialize_tc_array(json, TcQdisc::from_json)
}

fn deserialize_tc_array<T>(
  json: &str,
  parse: fn(&serde_json::Map<String, Value>) -> Result<T, TcDecodeError>,
) -> Result<Vec<T>, TcDecodeError> {
  let json: Value = serde_json::from_str(json)
    .map_err(|e| TcDecodeError::Json(e.to_string()))?;
  let Value::Array(array) = &json else {
    warn!("Failed to parse TC data array.");
    return Err(TcDecodeError::ArrayInvalid);
  };

  let mut result = Vec::with_capacity(array.len());
  for entry in array.iter() {
    match entry {
      Value::Object(map) => result.push(parse(map)?),
      _ => return Err(TcDecodeError::EntryInvalid),
    }
  }
  Ok(result)
}

/// Reasons a `tc` JSON document could not be decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TcDecodeError {
  /// The text was not JSON at all.
  #[error("Error parsing tc JSON: {0}")]
  Json(String),
  /// The top-level value was not an array.
  #[error("Unable to parse TC data array")]
  ArrayInvalid,
  /// An array entry was not an object.
  #[error("TC data array contains a non-object entry")]
  EntryInvalid,
  /// A class `stats` block was not an object.
  #[error("Unable to parse class stats")]
  ClassStats,
  /// A qdisc `options` block was not an object.
  #[error("Unable to parse qdisc options")]
  QdiscOptions,
  /// A known field held a value of the wrong type.
  #[error("Unexpected type for field {key}")]
  FieldType {
    /// The offending key.
    key: String,
  },
}

fn field_type(key: &str) -> TcDecodeError {
  TcDecodeError::FieldType { key: key.to_string() }
}

pub(crate) fn json_string(key: &str, value: &Value) -> Result<String, TcDecodeError> {
  value.as_str().map(str::to_string).ok_or_else(|| field_type(key))
}

pub(crate) fn json_u64(key: &str, value: &Value) -> Result<u64, TcDecodeError> {
  value.as_u64().ok_or_else(|| field_type(key))
}

pub(crate) fn json_i64(key: &str, value: &Value) -> Result<i64, TcDecodeError> {
  value.as_i64().ok_or_else(|| field_type(key))
}

pub(crate) fn json_bool(key: &str, value: &Value) -> Result<bool, TcDecodeError> {
  value.as_bool().ok_or_else(|| field_type(key))
}
