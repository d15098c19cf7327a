//! Sets and set elements.

use std::time::Duration;

use super::header::split_body;
use super::table::{Table, TableFamily};
use super::{NFTA_DATA_VALUE, NFTA_LIST_ELEM, msg};
use crate::netlink::attr::get;
use crate::netlink::error::Result;
use crate::netlink::message::NlMsgHdr;
use crate::netlink::parse::attributes;

// Set attributes
const NFTA_SET_TABLE: u16 = 1;
const NFTA_SET_NAME: u16 = 2;
const NFTA_SET_FLAGS: u16 = 3;
const NFTA_SET_KEY_TYPE: u16 = 4;
const NFTA_SET_KEY_LEN: u16 = 5;
const NFTA_SET_DATA_TYPE: u16 = 6;
const NFTA_SET_DATA_LEN: u16 = 7;
const NFTA_SET_ID: u16 = 10;
const NFTA_SET_TIMEOUT: u16 = 11;
const NFTA_SET_HANDLE: u16 = 16;

// Set element list attributes
const NFTA_SET_ELEM_LIST_ELEMENTS: u16 = 3;

// Set element attributes
const NFTA_SET_ELEM_KEY: u16 = 1;
const NFTA_SET_ELEM_DATA: u16 = 2;
const NFTA_SET_ELEM_FLAGS: u16 = 3;
const NFTA_SET_ELEM_TIMEOUT: u16 = 4;
const NFTA_SET_ELEM_EXPIRATION: u16 = 5;

/// Element closes an interval.
const NFT_SET_ELEM_INTERVAL_END: u32 = 1 << 0;

/// An nftables set or map.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Set {
    /// Table the set lives in.
    pub table: Table,
    /// Set name. Anonymous sets get a kernel generated name.
    pub name: String,
    /// Transaction-local set id.
    pub id: u32,
    /// Kernel-assigned handle.
    pub handle: u64,
    /// `NFT_SET_*` flags.
    pub flags: u32,
    /// Key data type.
    pub key_type: u32,
    /// Key length in bytes.
    pub key_len: u32,
    /// Value data type of a map.
    pub data_type: u32,
    /// Value length of a map.
    pub data_len: u32,
    /// Default element timeout.
    pub timeout: Option<Duration>,
}

/// One element of a set or map.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SetElement {
    /// Key bytes.
    pub key: Vec<u8>,
    /// Mapped value bytes (maps only).
    pub value: Vec<u8>,
    /// `NFT_SET_ELEM_*` flags.
    pub flags: u32,
    /// Element timeout.
    pub timeout: Option<Duration>,
    /// Time left until the element expires.
    pub expires: Option<Duration>,
}

impl SetElement {
    /// Whether this element closes an interval.
    pub fn is_interval_end(&self) -> bool {
        self.flags & NFT_SET_ELEM_INTERVAL_END != 0
    }
}

/// Decode a `NEWSET`/`DELSET` message.
pub fn set_from_msg(hdr: &NlMsgHdr, payload: &[u8]) -> Result<Set> {
    let (genmsg, attrs) = split_body(hdr, payload, &[msg::NEWSET, msg::DELSET])?;

    let mut set = Set {
        table: Table::new("", TableFamily::from_u8(genmsg.family)),
        ..Default::default()
    };

    for (attr_type, data) in attrs {
        match attr_type {
            NFTA_SET_TABLE => set.table.name = get::string(data)?.to_string(),
            NFTA_SET_NAME => set.name = get::string(data)?.to_string(),
            NFTA_SET_FLAGS => set.flags = get::u32_be(data)?,
            NFTA_SET_KEY_TYPE => set.key_type = get::u32_be(data)?,
            NFTA_SET_KEY_LEN => set.key_len = get::u32_be(data)?,
            NFTA_SET_DATA_TYPE => set.data_type = get::u32_be(data)?,
            NFTA_SET_DATA_LEN => set.data_len = get::u32_be(data)?,
            NFTA_SET_ID => set.id = get::u32_be(data)?,
            NFTA_SET_HANDLE => set.handle = get::u64_be(data)?,
            NFTA_SET_TIMEOUT => set.timeout = Some(millis(data)?),
            _ => {}
        }
    }

    Ok(set)
}

/// Decode the elements carried by a `NEWSETELEM`/`DELSETELEM` message.
pub fn elements_from_msg(hdr: &NlMsgHdr, payload: &[u8]) -> Result<Vec<SetElement>> {
    let (_, attrs) = split_body(hdr, payload, &[msg::NEWSETELEM, msg::DELSETELEM])?;

    let mut elements = Vec::new();
    for (attr_type, data) in attrs {
        if attr_type != NFTA_SET_ELEM_LIST_ELEMENTS {
            continue;
        }
        for (elem_type, elem) in attributes(data)? {
            if elem_type == NFTA_LIST_ELEM {
                elements.push(element_from_attr(elem)?);
            }
        }
    }

    Ok(elements)
}

fn element_from_attr(data: &[u8]) -> Result<SetElement> {
    let mut element = SetElement::default();

    for (attr_type, value) in attributes(data)? {
        match attr_type {
            NFTA_SET_ELEM_KEY => element.key = data_value(value)?,
            NFTA_SET_ELEM_DATA => element.value = data_value(value)?,
            NFTA_SET_ELEM_FLAGS => element.flags = get::u32_be(value)?,
            NFTA_SET_ELEM_TIMEOUT => element.timeout = Some(millis(value)?),
            NFTA_SET_ELEM_EXPIRATION => element.expires = Some(millis(value)?),
            _ => {}
        }
    }

    Ok(element)
}

/// Contents of an `NFTA_DATA_VALUE` nest. Verdict data is kept raw.
fn data_value(data: &[u8]) -> Result<Vec<u8>> {
    let attrs = attributes(data)?;
    Ok(attrs
        .iter()
        .find(|(t, _)| *t == NFTA_DATA_VALUE)
        .map(|(_, v)| v.to_vec())
        .unwrap_or_else(|| data.to_vec()))
}

fn millis(data: &[u8]) -> Result<Duration> {
    get::u64_be(data).map(Duration::from_millis)
}
