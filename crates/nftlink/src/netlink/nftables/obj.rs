//! Stateful objects (quotas, counters, ...).

use super::header::{request, split_body};
use super::msg;
use super::quota::QuotaObj;
use super::table::{Table, TableFamily};
use crate::netlink::attr::{NLA_F_NESTED, get};
use crate::netlink::builder::MessageBuilder;
use crate::netlink::connection::Connection;
use crate::netlink::error::Result;
use crate::netlink::message::{NLM_F_ACK, NLM_F_CREATE, NLM_F_DUMP, NLM_F_REQUEST, NlMsgHdr};
use crate::netlink::socket::Transport;

// Object attributes
pub(crate) const NFTA_OBJ_TABLE: u16 = 1;
pub(crate) const NFTA_OBJ_NAME: u16 = 2;
pub(crate) const NFTA_OBJ_TYPE: u16 = 3;
pub(crate) const NFTA_OBJ_DATA: u16 = 4;

// Object types
pub(crate) const NFT_OBJECT_QUOTA: u32 = 2;

/// A stateful object.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "lowercase"))]
pub enum Obj {
    /// A byte quota.
    Quota(QuotaObj),
    /// Any other object type, kept as raw `NFTA_OBJ_DATA` contents.
    Other {
        /// Table the object lives in.
        table: Table,
        /// Object name.
        name: String,
        /// `NFT_OBJECT_*` type.
        obj_type: u32,
        /// Raw attribute stream of the object's data.
        data: Vec<u8>,
    },
}

impl Obj {
    /// Table the object lives in.
    pub fn table(&self) -> &Table {
        match self {
            Self::Quota(q) => &q.table,
            Self::Other { table, .. } => table,
        }
    }

    /// Object name.
    pub fn name(&self) -> &str {
        match self {
            Self::Quota(q) => &q.name,
            Self::Other { name, .. } => name,
        }
    }

    /// `NFT_OBJECT_*` type.
    pub fn obj_type(&self) -> u32 {
        match self {
            Self::Quota(_) => NFT_OBJECT_QUOTA,
            Self::Other { obj_type, .. } => *obj_type,
        }
    }

    fn marshal(&self, builder: &mut MessageBuilder, with_data: bool) {
        match self {
            Self::Quota(q) => q.marshal(builder, with_data),
            Self::Other {
                table,
                name,
                obj_type,
                data,
            } => {
                builder.append_attr_str(NFTA_OBJ_TABLE, &table.name);
                builder.append_attr_str(NFTA_OBJ_NAME, name);
                builder.append_attr_u32_be(NFTA_OBJ_TYPE, *obj_type);
                if with_data {
                    builder.append_attr(NFTA_OBJ_DATA | NLA_F_NESTED, data);
                }
            }
        }
    }
}

impl From<QuotaObj> for Obj {
    fn from(quota: QuotaObj) -> Self {
        Self::Quota(quota)
    }
}

impl<T: Transport> Connection<T> {
    /// Queue creation of `obj`. An existing object is updated in place.
    pub fn add_obj(&self, obj: &Obj) {
        let mut builder = request(
            msg::NEWOBJ,
            NLM_F_REQUEST | NLM_F_ACK | NLM_F_CREATE,
            obj.table().family.as_u8(),
        );
        obj.marshal(&mut builder, true);
        self.queue(builder);
    }

    /// Queue deletion of `obj`. Only its identity is sent.
    pub fn del_obj(&self, obj: &Obj) {
        let mut builder = request(
            msg::DELOBJ,
            NLM_F_REQUEST | NLM_F_ACK,
            obj.table().family.as_u8(),
        );
        obj.marshal(&mut builder, false);
        self.queue(builder);
    }

    /// List the stateful objects of `table`.
    pub async fn list_objs(&self, table: &Table) -> Result<Vec<Obj>> {
        let mut builder = request(
            msg::GETOBJ,
            NLM_F_REQUEST | NLM_F_DUMP,
            table.family.as_u8(),
        );
        builder.append_attr_str(NFTA_OBJ_TABLE, &table.name);

        let responses = self.dump(builder).await?;

        responses
            .iter()
            .map(|(hdr, payload)| obj_from_msg(hdr, payload))
            .collect()
    }
}

/// Decode a `NEWOBJ`/`DELOBJ` message.
pub fn obj_from_msg(hdr: &NlMsgHdr, payload: &[u8]) -> Result<Obj> {
    let (genmsg, attrs) = split_body(hdr, payload, &[msg::NEWOBJ, msg::DELOBJ])?;

    let mut table = Table::new("", TableFamily::from_u8(genmsg.family));
    let mut name = String::new();
    let mut obj_type = 0;
    let mut data: &[u8] = &[];

    for (attr_type, value) in attrs {
        match attr_type {
            NFTA_OBJ_TABLE => table.name = get::string(value)?.to_string(),
            NFTA_OBJ_NAME => name = get::string(value)?.to_string(),
            NFTA_OBJ_TYPE => obj_type = get::u32_be(value)?,
            NFTA_OBJ_DATA => data = value,
            _ => {}
        }
    }

    match obj_type {
        NFT_OBJECT_QUOTA => {
            let mut quota = QuotaObj {
                table,
                name,
                ..Default::default()
            };
            quota.unmarshal(data)?;
            Ok(Obj::Quota(quota))
        }
        _ => Ok(Obj::Other {
            table,
            name,
            obj_type,
            data: data.to_vec(),
        }),
    }
}
