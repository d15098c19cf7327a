//! Async nftables client over `NETLINK_NETFILTER`.
//!
//! Mutating calls only queue requests; [`Connection::flush`] commits the
//! queue to the kernel as one transaction.
//!
//! # Quick Start
//!
//! ```ignore
//! use nftlink::netlink::Connection;
//! use nftlink::netlink::nftables::{Table, TableFamily};
//!
//! let conn = Connection::new()?;
//!
//! conn.add_table(&Table::new("filter", TableFamily::Inet));
//! conn.flush().await?;
//!
//! for table in conn.list_tables().await? {
//!     println!("{} {} ({} chains)", table.family, table.name, table.use_count);
//! }
//! ```
//!
//! # Event Monitoring
//!
//! ```ignore
//! use nftlink::netlink::nftables::{Monitor, MonitorAction, MonitorObject};
//!
//! let monitor = Monitor::builder()
//!     .action(MonitorAction::New)
//!     .object(MonitorObject::Tables)
//!     .build();
//!
//! let mut events = conn.add_monitor(&monitor)?;
//! while let Some(event) = events.recv().await {
//!     println!("{:?}: {:?}", event.event_type, event.data);
//! }
//! ```

pub mod attr;
mod builder;
pub mod connection;
mod error;
#[cfg(test)]
mod fixtures;
pub mod message;
pub mod nftables;
pub mod parse;
mod socket;

pub use attr::{AttrIter, NlAttr};
pub use builder::{MessageBuilder, NestToken};
pub use connection::Connection;
pub use error::{Error, Result};
pub use message::{MessageIter, NLMSG_HDRLEN, NlMsgHdr, NlMsgType};
pub use socket::{NetlinkSocket, Transport};
