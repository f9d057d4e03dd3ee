use tracing::debug;

/// Answers whether a network interface currently exists on the host.
pub trait InterfaceLookup {
  /// Returns `true` if `name` resolves to a live interface right now.
  fn exists(&self, name: &str) -> bool;
}

/// Looks interfaces up in the kernel's interface map.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinuxInterfaces;

impl InterfaceLookup for LinuxInterfaces {
  fn exists(&self, name: &str) -> bool {
    // if_nametoindex rejects unknown names with ENODEV; an interior
    // NUL is rejected before the call is made.
    nix::net::if_::if_nametoindex(name).is_ok()
  }
}

/// Filters `configured` down to the interfaces that exist right now.
/// Order and duplicates are preserved; missing interfaces are dropped
/// without error.
pub fn valid_interfaces<L: InterfaceLookup + ?Sized>(
  configured: &[String],
  lookup: &L,
) -> Vec<String> {
  configured
    .iter()
    .filter(|name| {
      let exists = lookup.exists(name);
      if !exists {
        debug!("Skipping interface {name}: not present on this host");
      }
      exists
    })
    .cloned()
    .collect()
}

#[cfg(test)]
mod test {
  use super::*;

  struct Only(&'static [&'static str]);

  impl InterfaceLookup for Only {
    fn exists(&self, name: &str) -> bool {
      self.0.contains(&name)
    }
  }

  fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn drops_missing_interfaces() {
    let lookup = Only(&["eth0"]);
    let result = valid_interfaces(&names(&["eth0", "ppp0"]), &lookup);
    assert_eq!(result, names(&["eth0"]));
  }

  #[test]
  fn keeps_order_and_duplicates() {
    let lookup = Only(&["eth0", "eth1"]);
    let result = valid_interfaces(
      &names(&["eth1", "ppp0", "eth0", "eth1"]),
      &lookup,
    );
    assert_eq!(result, names(&["eth1", "eth0", "eth1"]));
  }

  #[test]
  fn nothing_configured() {
    let lookup = Only(&["eth0"]);
    assert!(valid_interfaces(&[], &lookup).is_empty());
  }

  #[test]
  fn loopback_exists() {
    assert!(LinuxInterfaces.exists("lo"));
  }

  #[test]
  fn unknown_interface_does_not_exist() {
    assert!(!LinuxInterfaces.exists("tcx_missing0"));
  }

  #[test]
  fn interior_nul_does_not_exist() {
    assert!(!LinuxInterfaces.exists("lo\0"));
  }
}
