//! nftables object model, request builders and decoders.
//!
//! Every nftables message type is `(NFNL_SUBSYS_NFTABLES << 8) | NFT_MSG_*`
//! and every body starts with the 4-byte [`NfGenMsg`] header.

pub mod chain;
pub mod compat;
pub mod expr;
pub mod header;
pub mod monitor;
pub mod obj;
pub mod quota;
pub mod rule;
pub mod set;
pub mod table;

pub use chain::Chain;
pub use compat::{CompatPolicy, get_compat_policy};
pub use expr::Expr;
pub use header::{NfGenMsg, extra_header};
pub use monitor::{
    Monitor, MonitorAction, MonitorBuilder, MonitorEvent, MonitorEventData, MonitorEventType,
    MonitorEvents, MonitorFlagTable, MonitorObject, MonitorOption,
};
pub use obj::Obj;
pub use quota::QuotaObj;
pub use rule::Rule;
pub use set::{Set, SetElement};
pub use table::{Table, TableFamily};

/// nfnetlink subsystem ID of nftables.
pub const NFNL_SUBSYS_NFTABLES: u8 = 10;

/// nfnetlink protocol version.
pub const NFNETLINK_V0: u8 = 0;

/// Multicast group carrying all nftables notifications.
pub const NFNLGRP_NFTABLES: u32 = 7;

/// nftables message types (low byte of the netlink message type).
pub mod msg {
    pub const NEWTABLE: u8 = 0;
    pub const GETTABLE: u8 = 1;
    pub const DELTABLE: u8 = 2;
    pub const NEWCHAIN: u8 = 3;
    pub const GETCHAIN: u8 = 4;
    pub const DELCHAIN: u8 = 5;
    pub const NEWRULE: u8 = 6;
    pub const GETRULE: u8 = 7;
    pub const DELRULE: u8 = 8;
    pub const NEWSET: u8 = 9;
    pub const GETSET: u8 = 10;
    pub const DELSET: u8 = 11;
    pub const NEWSETELEM: u8 = 12;
    pub const GETSETELEM: u8 = 13;
    pub const DELSETELEM: u8 = 14;
    pub const NEWGEN: u8 = 15;
    pub const GETGEN: u8 = 16;
    pub const TRACE: u8 = 17;
    pub const NEWOBJ: u8 = 18;
    pub const GETOBJ: u8 = 19;
    pub const DELOBJ: u8 = 20;
}

/// Full netlink message type for an nftables message.
#[inline]
pub const fn nft_msg_type(msg: u8) -> u16 {
    ((NFNL_SUBSYS_NFTABLES as u16) << 8) | msg as u16
}

/// Generic list element attribute, used by expression and element lists.
pub(crate) const NFTA_LIST_ELEM: u16 = 1;

/// Payload attribute of `NFTA_*_DATA` nests.
pub(crate) const NFTA_DATA_VALUE: u16 = 1;
