//! Chains.

use super::header::split_body;
use super::msg;
use super::table::{Table, TableFamily};
use crate::netlink::attr::get;
use crate::netlink::error::Result;
use crate::netlink::message::NlMsgHdr;
use crate::netlink::parse::attributes;

// Chain attributes
const NFTA_CHAIN_TABLE: u16 = 1;
const NFTA_CHAIN_HANDLE: u16 = 2;
const NFTA_CHAIN_NAME: u16 = 3;
const NFTA_CHAIN_HOOK: u16 = 4;
const NFTA_CHAIN_POLICY: u16 = 5;
const NFTA_CHAIN_USE: u16 = 6;
const NFTA_CHAIN_TYPE: u16 = 7;
const NFTA_CHAIN_FLAGS: u16 = 10;

// Hook attributes
const NFTA_HOOK_HOOKNUM: u16 = 1;
const NFTA_HOOK_PRIORITY: u16 = 2;

/// An nftables chain. Base chains carry hook, priority, type and policy.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Chain {
    /// Table the chain lives in.
    pub table: Table,
    /// Chain name.
    pub name: String,
    /// Kernel-assigned handle.
    pub handle: u64,
    /// Netfilter hook (`NF_INET_*`) of a base chain.
    pub hooknum: Option<u32>,
    /// Hook priority of a base chain.
    pub priority: Option<i32>,
    /// Chain type (`filter`, `nat`, `route`).
    pub chain_type: Option<String>,
    /// Default verdict of a base chain.
    pub policy: Option<u32>,
    /// Number of references (rules jumping here).
    pub use_count: u32,
    /// Chain flags.
    pub flags: u32,
}

impl Chain {
    /// Whether the chain is attached to a netfilter hook.
    pub fn is_base_chain(&self) -> bool {
        self.hooknum.is_some()
    }
}

/// Decode a `NEWCHAIN`/`DELCHAIN` message.
pub fn chain_from_msg(hdr: &NlMsgHdr, payload: &[u8]) -> Result<Chain> {
    let (genmsg, attrs) = split_body(hdr, payload, &[msg::NEWCHAIN, msg::DELCHAIN])?;

    let mut chain = Chain {
        table: Table::new("", TableFamily::from_u8(genmsg.family)),
        ..Default::default()
    };

    for (attr_type, data) in attrs {
        match attr_type {
            NFTA_CHAIN_TABLE => chain.table.name = get::string(data)?.to_string(),
            NFTA_CHAIN_NAME => chain.name = get::string(data)?.to_string(),
            NFTA_CHAIN_HANDLE => chain.handle = get::u64_be(data)?,
            NFTA_CHAIN_POLICY => chain.policy = Some(get::u32_be(data)?),
            NFTA_CHAIN_USE => chain.use_count = get::u32_be(data)?,
            NFTA_CHAIN_TYPE => chain.chain_type = Some(get::string(data)?.to_string()),
            NFTA_CHAIN_FLAGS => chain.flags = get::u32_be(data)?,
            NFTA_CHAIN_HOOK => {
                for (hook_type, value) in attributes(data)? {
                    match hook_type {
                        NFTA_HOOK_HOOKNUM => chain.hooknum = Some(get::u32_be(value)?),
                        NFTA_HOOK_PRIORITY => chain.priority = Some(get::i32_be(value)?),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::error::Error;
    use crate::netlink::nftables::header::request;
    use crate::netlink::nftables::nft_msg_type;

    #[test]
    fn decodes_base_chain() {
        let mut builder = request(msg::NEWCHAIN, 0, TableFamily::Inet.as_u8());
        builder.append_attr_str(NFTA_CHAIN_TABLE, "filter");
        builder.append_attr_str(NFTA_CHAIN_NAME, "input");
        builder.append_attr_u64_be(NFTA_CHAIN_HANDLE, 1);
        let hook = builder.nest_start(NFTA_CHAIN_HOOK);
        builder.append_attr_u32_be(NFTA_HOOK_HOOKNUM, 1);
        builder.append_attr_u32_be(NFTA_HOOK_PRIORITY, (-150i32) as u32);
        builder.nest_end(hook);
        builder.append_attr_u32_be(NFTA_CHAIN_POLICY, 1);
        builder.append_attr_str(NFTA_CHAIN_TYPE, "filter");
        builder.append_attr_u32_be(NFTA_CHAIN_USE, 2);

        let hdr = NlMsgHdr::new(nft_msg_type(msg::NEWCHAIN), 0);
        let chain = chain_from_msg(&hdr, builder.payload()).unwrap();
        assert_eq!(chain.table.name, "filter");
        assert_eq!(chain.table.family, TableFamily::Inet);
        assert_eq!(chain.name, "input");
        assert_eq!(chain.hooknum, Some(1));
        assert_eq!(chain.priority, Some(-150));
        assert_eq!(chain.chain_type.as_deref(), Some("filter"));
        assert_eq!(chain.use_count, 2);
        assert!(chain.is_base_chain());
    }

    #[test]
    fn regular_chain_has_no_hook() {
        let mut builder = request(msg::DELCHAIN, 0, TableFamily::Ipv4.as_u8());
        builder.append_attr_str(NFTA_CHAIN_TABLE, "filter");
        builder.append_attr_str(NFTA_CHAIN_NAME, "ssh");

        let hdr = NlMsgHdr::new(nft_msg_type(msg::DELCHAIN), 0);
        let chain = chain_from_msg(&hdr, builder.payload()).unwrap();
        assert!(!chain.is_base_chain());
        assert_eq!(chain.policy, None);
    }

    #[test]
    fn rejects_table_message() {
        let builder = request(msg::NEWTABLE, 0, 0);
        let hdr = NlMsgHdr::new(nft_msg_type(msg::NEWTABLE), 0);
        assert!(matches!(
            chain_from_msg(&hdr, builder.payload()),
            Err(Error::UnexpectedHeaderType { .. })
        ));
    }
}
