//! Async nftables library for Linux packet filtering.
//!
//! This crate talks to the kernel's nftables subsystem over
//! `NETLINK_NETFILTER`. It manages tables and stateful objects, appends and
//! deletes rules, and streams ruleset change notifications.
//!
//! # Features
//!
//! - `serde` - `Serialize` for tables, objects, rules and monitor event payloads
//!
//! # Example
//!
//! ```ignore
//! use nftlink::netlink::Connection;
//! use nftlink::netlink::nftables::{QuotaObj, Table, TableFamily};
//!
//! #[tokio::main]
//! async fn main() -> nftlink::Result<()> {
//!     let conn = Connection::new()?;
//!
//!     let table = Table::new("filter", TableFamily::Inet);
//!     conn.add_table(&table);
//!     conn.add_obj(&QuotaObj::new(table.clone(), "monthly", 10 << 30).into());
//!     conn.flush().await?;
//!
//!     for table in conn.list_tables().await? {
//!         println!("{} {}", table.family, table.name);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod netlink;

// Re-export common types at crate root for convenience
pub use netlink::{Connection, Error, Result};
