//! Common test utilities for integration tests.
//!
//! Provides `TestNamespace` for isolated network namespace testing
//! and helper macros for conditional test execution.

use nftlink::Result;
use nftlink::netlink::Connection;
use std::io;
use std::process::Command;
use std::sync::atomic::{AtomicU32, Ordering};

/// Global counter for unique namespace names.
static NAMESPACE_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Generate a unique namespace name for this test.
fn unique_ns_name(prefix: &str) -> String {
    let id = NAMESPACE_COUNTER.fetch_add(1, Ordering::SeqCst);
    let pid = std::process::id();
    format!("nftlink-test-{}-{}-{}", prefix, pid, id)
}

/// A test network namespace with automatic cleanup.
///
/// Every namespace starts with an empty ruleset. The namespace is deleted
/// when the struct is dropped.
///
/// # Example
///
/// ```ignore
/// let ns = TestNamespace::new("mytest")?;
/// let conn = ns.connection()?;
///
/// conn.add_table(&Table::new("filter", TableFamily::Inet));
/// conn.flush().await?;
/// ```
pub struct TestNamespace {
    name: String,
}

impl TestNamespace {
    /// Create a new test namespace with a unique name.
    pub fn new(prefix: &str) -> Result<Self> {
        let name = unique_ns_name(prefix);

        let status = Command::new("ip")
            .args(["netns", "add", &name])
            .status()
            .map_err(|e| nftlink::Error::Io(io::Error::from(e.kind())))?;

        if !status.success() {
            return Err(nftlink::Error::InvalidMessage(format!(
                "failed to create namespace: {}",
                name
            )));
        }

        Ok(Self { name })
    }

    /// Get the namespace name.
    #[allow(dead_code)]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get a connection to this namespace.
    pub fn connection(&self) -> Result<Connection> {
        Connection::new_in_namespace_path(format!("/var/run/netns/{}", self.name))
    }
}

impl Drop for TestNamespace {
    fn drop(&mut self) {
        let _ = Command::new("ip")
            .args(["netns", "del", &self.name])
            .status();
    }
}

/// Check if running as root.
pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

/// Skip the test if not running as root.
///
/// Use this at the beginning of integration tests that require root privileges.
#[macro_export]
macro_rules! require_root {
    () => {
        if !crate::common::is_root() {
            eprintln!("Skipping test: requires root");
            return Ok(());
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_ns_name() {
        let name1 = unique_ns_name("test");
        let name2 = unique_ns_name("test");
        assert_ne!(name1, name2);
        assert!(name1.starts_with("nftlink-test-test-"));
    }
}
