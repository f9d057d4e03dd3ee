use crate::tc_records::{
  deserialize_tc_classes, deserialize_tc_qdiscs, TcClass, TcDecodeError,
  TcQdisc,
};
use std::fmt;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};
use thiserror::Error;
use tracing::{debug, warn};

/// Where `tc` lives on most distributions.
pub const DEFAULT_TC: &str = "/usr/sbin/tc";

/// The kind of object to ask `tc` about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcObject {
  /// `tc class show`
  Class,
  /// `tc qdisc show`
  Qdisc,
}

impl TcObject {
  /// The `tc` sub-command for this object.
  pub fn as_str(&self) -> &'static str {
    match self {
      TcObject::Class => "class",
      TcObject::Qdisc => "qdisc",
    }
  }
}

impl fmt::Display for TcObject {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A source of `tc` state for a single interface.
///
/// Only [`TcSource::show`] has to be provided: it returns the JSON
/// document `tc -s -j` would print. Decoding is shared, so a source
/// that talks netlink directly can slot in by producing the same shape.
pub trait TcSource {
  /// Returns the raw JSON listing of `object`s on `interface`.
  fn show(&self, object: TcObject, interface: &str) -> Result<String, TcReaderError>;

  /// Reads and decodes every class on `interface`.
  fn read_classes(&self, interface: &str) -> Result<Vec<TcClass>, TcReaderError> {
    let json = self.show(TcObject::Class, interface)?;
    deserialize_tc_classes(&json).map_err(|source| {
      warn!("Failed to deserialize tc class list for {interface}: {source}");
      TcReaderError::Deserialization {
        command: describe(TcObject::Class, interface),
        source,
      }
    })
  }

  /// Reads and decodes every qdisc on `interface`.
  fn read_qdiscs(&self, interface: &str) -> Result<Vec<TcQdisc>, TcReaderError> {
    let json = self.show(TcObject::Qdisc, interface)?;
    deserialize_tc_qdiscs(&json).map_err(|source| {
      warn!("Failed to deserialize tc qdisc list for {interface}: {source}");
      TcReaderError::Deserialization {
        command: describe(TcObject::Qdisc, interface),
        source,
      }
    })
  }
}

fn describe(object: TcObject, interface: &str) -> String {
  format!("tc {object} show dev {interface}")
}

/// Runs the `tc` binary and captures its JSON output.
#[derive(Debug, Clone)]
pub struct TcCommand {
  binary: PathBuf,
}

impl TcCommand {
  /// Uses the `tc` found at `binary`.
  pub fn new(binary: impl Into<PathBuf>) -> Self {
    Self { binary: binary.into() }
  }

  fn args<'a>(object: TcObject, interface: &'a str) -> [&'a str; 7] {
    ["-name", "-s", "-j", object.as_str(), "show", "dev", interface]
  }
}

impl Default for TcCommand {
  fn default() -> Self {
    Self::new(DEFAULT_TC)
  }
}

impl TcSource for TcCommand {
  fn show(&self, object: TcObject, interface: &str) -> Result<String, TcReaderError> {
    let command = describe(object, interface);
    debug!("Running {} {:?}", self.binary.display(), Self::args(object, interface));

    let output = Command::new(&self.binary)
      .args(Self::args(object, interface))
      .output()
      .map_err(|source| {
        warn!("Failed to run {}: {source}", self.binary.display());
        TcReaderError::Spawn { command: command.clone(), source }
      })?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
      warn!("{command} exited with {}: {stderr}", output.status);
      return Err(TcReaderError::CommandFailed {
        command,
        status: output.status,
        stderr,
      });
    }

    String::from_utf8(output.stdout).map_err(|_| {
      warn!("Failed to convert {command} output to UTF-8");
      TcReaderError::Utf8 { command }
    })
  }
}

/// Reasons a `tc` listing could not be obtained.
#[derive(Error, Debug)]
pub enum TcReaderError {
  /// The binary could not be started.
  #[error("command error: {command}: {source}")]
  Spawn {
    /// The failing invocation.
    command: String,
    /// The underlying I/O error.
    #[source]
    source: std::io::Error,
  },
  /// `tc` ran but reported failure.
  #[error("command error: {command}: {status}: {stderr}")]
  CommandFailed {
    /// The failing invocation.
    command: String,
    /// How the process exited.
    status: ExitStatus,
    /// Whatever `tc` printed to stderr.
    stderr: String,
  },
  /// `tc` printed something that isn't UTF-8.
  #[error("command error: {command}: output is not valid UTF-8")]
  Utf8 {
    /// The failing invocation.
    command: String,
  },
  /// `tc` printed something we couldn't decode.
  #[error("json error: {command}: {source}")]
  Deserialization {
    /// The failing invocation.
    command: String,
    /// What the decoder objected to.
    #[source]
    source: TcDecodeError,
  },
}
