//! Quota stateful objects.

use super::obj::{NFT_OBJECT_QUOTA, NFTA_OBJ_DATA, NFTA_OBJ_NAME, NFTA_OBJ_TABLE, NFTA_OBJ_TYPE};
use super::table::Table;
use crate::netlink::attr::get;
use crate::netlink::builder::MessageBuilder;
use crate::netlink::error::Result;
use crate::netlink::parse::attributes;

// Quota attributes
const NFTA_QUOTA_BYTES: u16 = 1;
const NFTA_QUOTA_FLAGS: u16 = 2;
const NFTA_QUOTA_CONSUMED: u16 = 4;

/// Quota matches once the limit is exceeded instead of while under it.
const NFT_QUOTA_F_INV: u32 = 1 << 0;

/// A named byte quota.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct QuotaObj {
    /// Table the quota lives in.
    pub table: Table,
    /// Object name, unique within the table.
    pub name: String,
    /// Limit in bytes.
    pub bytes: u64,
    /// Bytes accounted so far.
    pub consumed: u64,
    /// Inverted match: fire once the quota is exceeded.
    pub over: bool,
}

impl QuotaObj {
    /// Create a quota of `bytes` in `table`.
    pub fn new(table: Table, name: impl Into<String>, bytes: u64) -> Self {
        Self {
            table,
            name: name.into(),
            bytes,
            ..Default::default()
        }
    }

    /// Match traffic over the quota rather than under it.
    pub fn over(mut self, over: bool) -> Self {
        self.over = over;
        self
    }

    fn flags(&self) -> u32 {
        if self.over { NFT_QUOTA_F_INV } else { 0 }
    }

    /// Fill the limit, usage and flags from `NFTA_OBJ_DATA` contents.
    pub fn unmarshal(&mut self, data: &[u8]) -> Result<()> {
        for (attr_type, payload) in attributes(data)? {
            match attr_type {
                NFTA_QUOTA_BYTES => self.bytes = get::u64_be(payload)?,
                NFTA_QUOTA_CONSUMED => self.consumed = get::u64_be(payload)?,
                NFTA_QUOTA_FLAGS => {
                    self.over = get::u32_be(payload)? & NFT_QUOTA_F_INV != 0;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Append the object attributes.
    ///
    /// Without data only the identity (table, name, type) is written, which
    /// is what deletion by name needs.
    pub fn marshal(&self, builder: &mut MessageBuilder, with_data: bool) {
        builder.append_attr_str(NFTA_OBJ_TABLE, &self.table.name);
        builder.append_attr_str(NFTA_OBJ_NAME, &self.name);
        builder.append_attr_u32_be(NFTA_OBJ_TYPE, NFT_OBJECT_QUOTA);

        if with_data {
            let nest = builder.nest_start(NFTA_OBJ_DATA);
            builder.append_attr_u64_be(NFTA_QUOTA_BYTES, self.bytes);
            builder.append_attr_u64_be(NFTA_QUOTA_CONSUMED, self.consumed);
            builder.append_attr_u32_be(NFTA_QUOTA_FLAGS, self.flags());
            builder.nest_end(nest);
        }
    }
}
