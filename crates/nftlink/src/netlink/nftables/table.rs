//! nftables tables.
//!
//! A table is the top-level container for chains, sets and stateful
//! objects, scoped to one address family.

use std::fmt;
use std::str::FromStr;

use super::header::{request, split_body};
use super::msg;
use crate::netlink::attr::get;
use crate::netlink::connection::Connection;
use crate::netlink::error::{Error, Result};
use crate::netlink::message::{
    NLM_F_ACK, NLM_F_CREATE, NLM_F_DUMP, NLM_F_EXCL, NLM_F_REQUEST, NlMsgHdr,
};
use crate::netlink::socket::Transport;

// Table attributes
const NFTA_TABLE_NAME: u16 = 1;
const NFTA_TABLE_FLAGS: u16 = 2;
const NFTA_TABLE_USE: u16 = 3;

// Rule attribute used to scope a flush
const NFTA_RULE_TABLE: u16 = 1;

/// Address family of a table (`NFPROTO_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TableFamily {
    /// Any family (0). Only meaningful for listing.
    #[default]
    Unspecified,
    /// Dual-stack IPv4/IPv6 (1).
    Inet,
    /// IPv4 (2).
    Ipv4,
    /// ARP (3).
    Arp,
    /// Ingress/egress of a single device (5).
    Netdev,
    /// Bridge (7).
    Bridge,
    /// IPv6 (10).
    Ipv6,
    /// A family this crate does not know.
    Other(u8),
}

impl TableFamily {
    /// Every family a table can be created in.
    pub const ALL: [TableFamily; 6] = [
        Self::Inet,
        Self::Ipv4,
        Self::Ipv6,
        Self::Arp,
        Self::Netdev,
        Self::Bridge,
    ];

    /// Convert from the wire value.
    pub fn from_u8(val: u8) -> Self {
        match val {
            0 => Self::Unspecified,
            1 => Self::Inet,
            2 => Self::Ipv4,
            3 => Self::Arp,
            5 => Self::Netdev,
            7 => Self::Bridge,
            10 => Self::Ipv6,
            other => Self::Other(other),
        }
    }

    /// Get the wire value.
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::Unspecified => 0,
            Self::Inet => 1,
            Self::Ipv4 => 2,
            Self::Arp => 3,
            Self::Netdev => 5,
            Self::Bridge => 7,
            Self::Ipv6 => 10,
            Self::Other(n) => *n,
        }
    }

    /// Name as used by the `nft` tool.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unspecified => "unspec",
            Self::Inet => "inet",
            Self::Ipv4 => "ip",
            Self::Arp => "arp",
            Self::Netdev => "netdev",
            Self::Bridge => "bridge",
            Self::Ipv6 => "ip6",
            Self::Other(_) => "unknown",
        }
    }
}

impl From<u8> for TableFamily {
    fn from(val: u8) -> Self {
        Self::from_u8(val)
    }
}

impl fmt::Display for TableFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(n) => write!(f, "family {}", n),
            other => f.write_str(other.name()),
        }
    }
}

impl FromStr for TableFamily {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ip" | "ipv4" => Ok(Self::Ipv4),
            "ip6" | "ipv6" => Ok(Self::Ipv6),
            "inet" => Ok(Self::Inet),
            "arp" => Ok(Self::Arp),
            "bridge" => Ok(Self::Bridge),
            "netdev" => Ok(Self::Netdev),
            "unspec" | "any" => Ok(Self::Unspecified),
            _ => Err(Error::Parse(format!("unknown table family '{}'", s))),
        }
    }
}

/// An nftables table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Table {
    /// Table name.
    pub name: String,
    /// Number of chains in the table. Computed by the kernel.
    pub use_count: u32,
    /// Table flags (`NFT_TABLE_F_*`).
    pub flags: u32,
    /// Address family.
    pub family: TableFamily,
}

impl Table {
    /// Create a table description.
    pub fn new(name: impl Into<String>, family: TableFamily) -> Self {
        Self {
            name: name.into(),
            family,
            ..Default::default()
        }
    }
}

impl<T: Transport> Connection<T> {
    /// Queue creation of `table`. An existing table of the same name is kept.
    pub fn add_table(&self, table: &Table) {
        self.queue_new_table(table, NLM_F_CREATE);
    }

    /// Queue creation of `table`, failing at [`flush`](Self::flush) with
    /// `EEXIST` if it already exists.
    pub fn create_table(&self, table: &Table) {
        self.queue_new_table(table, NLM_F_EXCL);
    }

    fn queue_new_table(&self, table: &Table, flag: u16) {
        let mut builder = request(
            msg::NEWTABLE,
            NLM_F_REQUEST | NLM_F_ACK | flag,
            table.family.as_u8(),
        );
        builder.append_attr_str(NFTA_TABLE_NAME, &table.name);
        builder.append_attr_u32_be(NFTA_TABLE_FLAGS, 0);
        self.queue(builder);
    }

    /// Queue deletion of `table` together with everything it contains.
    pub fn del_table(&self, table: &Table) {
        let mut builder = request(
            msg::DELTABLE,
            NLM_F_REQUEST | NLM_F_ACK,
            table.family.as_u8(),
        );
        builder.append_attr_str(NFTA_TABLE_NAME, &table.name);
        builder.append_attr_u32_be(NFTA_TABLE_FLAGS, 0);
        self.queue(builder);
    }

    /// Queue removal of every rule in `table`. Chains, sets and objects stay.
    pub fn flush_table(&self, table: &Table) {
        let mut builder = request(
            msg::DELRULE,
            NLM_F_REQUEST | NLM_F_ACK,
            table.family.as_u8(),
        );
        builder.append_attr_str(NFTA_RULE_TABLE, &table.name);
        self.queue(builder);
    }

    /// Get the IPv4 table called `name`.
    pub async fn list_table(&self, name: &str) -> Result<Table> {
        self.list_table_of_family(name, TableFamily::Ipv4).await
    }

    /// Get the table called `name` in `family`.
    ///
    /// Exactly one table must match; otherwise an
    /// [`Error::UnexpectedCount`] is returned.
    pub async fn list_table_of_family(&self, name: &str, family: TableFamily) -> Result<Table> {
        let mut tables = match self.list_tables_of_name_and_family(name, family).await {
            Ok(tables) => tables,
            // The kernel answers a lookup of a missing table with ENOENT.
            Err(e) if e.errno() == Some(libc::ENOENT) => Vec::new(),
            Err(e) => return Err(e),
        };

        if tables.len() != 1 {
            return Err(Error::UnexpectedCount {
                kind: "table",
                expected: 1,
                actual: tables.len(),
            });
        }
        Ok(tables.remove(0))
    }

    /// List the tables of every family.
    pub async fn list_tables(&self) -> Result<Vec<Table>> {
        self.list_tables_of_family(TableFamily::Unspecified).await
    }

    /// List the tables of `family`.
    pub async fn list_tables_of_family(&self, family: TableFamily) -> Result<Vec<Table>> {
        self.list_tables_of_name_and_family("", family).await
    }

    async fn list_tables_of_name_and_family(
        &self,
        name: &str,
        family: TableFamily,
    ) -> Result<Vec<Table>> {
        // A named lookup returns at most one table, so it is not a dump.
        let flags = if name.is_empty() {
            NLM_F_REQUEST | NLM_F_DUMP
        } else {
            NLM_F_REQUEST
        };

        let mut builder = request(msg::GETTABLE, flags, family.as_u8());
        if !name.is_empty() {
            builder.append_attr_str(NFTA_TABLE_NAME, name);
        }

        let responses = self.dump(builder).await?;

        responses
            .iter()
            .map(|(hdr, payload)| table_from_msg(hdr, payload))
            .collect()
    }
}

/// Decode a `NEWTABLE`/`DELTABLE` message.
pub fn table_from_msg(hdr: &NlMsgHdr, payload: &[u8]) -> Result<Table> {
    let (genmsg, attrs) = split_body(hdr, payload, &[msg::NEWTABLE, msg::DELTABLE])?;

    let mut table = Table {
        family: TableFamily::from_u8(genmsg.family),
        ..Default::default()
    };

    for (attr_type, data) in attrs {
        match attr_type {
            NFTA_TABLE_NAME => table.name = get::string(data)?.to_string(),
            NFTA_TABLE_USE => table.use_count = get::u32_be(data)?,
            NFTA_TABLE_FLAGS => table.flags = get::u32_be(data)?,
            _ => {}
        }
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::attr::AttrIter;
    use crate::netlink::builder::MessageBuilder;
    use crate::netlink::fixtures::{MockTransport, done, error_reply, reply};
    use crate::netlink::message::{MessageIter, NLM_F_MULTI};
    use crate::netlink::nftables::nft_msg_type;

    fn header_of(builder: &MessageBuilder) -> NlMsgHdr {
        NlMsgHdr::new(builder.msg_type(), builder.flags())
    }

    /// A kernel NEWTABLE notification body.
    fn table_payload(name: &str, family: TableFamily, use_count: u32) -> Vec<u8> {
        let mut builder = request(msg::NEWTABLE, 0, family.as_u8());
        builder.append_attr_str(NFTA_TABLE_NAME, name);
        builder.append_attr_u32_be(NFTA_TABLE_FLAGS, 0);
        builder.append_attr_u32_be(NFTA_TABLE_USE, use_count);
        // Unknown attribute (NFTA_TABLE_HANDLE) must be skipped.
        builder.append_attr_u64_be(4, 99);
        builder.payload().to_vec()
    }

    #[test]
    fn family_wire_values() {
        assert_eq!(TableFamily::Inet.as_u8(), 1);
        assert_eq!(TableFamily::Ipv4.as_u8(), 2);
        assert_eq!(TableFamily::Ipv6.as_u8(), 10);
        assert_eq!(TableFamily::from_u8(7), TableFamily::Bridge);
        assert_eq!(TableFamily::from_u8(42), TableFamily::Other(42));
        assert_eq!("ip6".parse::<TableFamily>().unwrap(), TableFamily::Ipv6);
        assert!("ipx".parse::<TableFamily>().is_err());
        assert_eq!(TableFamily::Ipv4.to_string(), "ip");
    }

    #[test]
    fn add_table_round_trips_through_decoder() {
        let conn = Connection::from_transport(MockTransport::new());

        for family in TableFamily::ALL {
            let table = Table::new(format!("t-{}", family), family);
            conn.add_table(&table);

            let builder = conn.take_pending().remove(0);
            assert_eq!(builder.msg_type(), nft_msg_type(msg::NEWTABLE));
            assert_eq!(builder.flags(), NLM_F_REQUEST | NLM_F_ACK | NLM_F_CREATE);

            let decoded = table_from_msg(&header_of(&builder), builder.payload()).unwrap();
            assert_eq!(decoded.name, table.name);
            assert_eq!(decoded.family, family);
            assert_eq!(decoded.flags, 0);
        }
    }

    #[test]
    fn create_table_is_exclusive() {
        let conn = Connection::from_transport(MockTransport::new());
        conn.create_table(&Table::new("filter", TableFamily::Inet));
        let builder = conn.take_pending().remove(0);
        assert_eq!(builder.flags(), NLM_F_REQUEST | NLM_F_ACK | NLM_F_EXCL);
    }

    #[test]
    fn del_table_is_keyed_by_name() {
        let conn = Connection::from_transport(MockTransport::new());
        conn.del_table(&Table::new("nat", TableFamily::Ipv6));
        let builder = conn.take_pending().remove(0);
        assert_eq!(builder.msg_type(), nft_msg_type(msg::DELTABLE));
        assert_eq!(builder.payload()[0], 10);

        let attrs: Vec<_> = AttrIter::new(&builder.payload()[4..]).collect();
        assert_eq!(attrs[0], (NFTA_TABLE_NAME, &b"nat\0"[..]));
    }

    #[test]
    fn flush_table_deletes_rules_by_table() {
        let conn = Connection::from_transport(MockTransport::new());
        conn.flush_table(&Table::new("filter", TableFamily::Ipv4));
        let builder = conn.take_pending().remove(0);
        assert_eq!(builder.msg_type(), nft_msg_type(msg::DELRULE));

        let attrs: Vec<_> = AttrIter::new(&builder.payload()[4..]).collect();
        assert_eq!(attrs, vec![(NFTA_RULE_TABLE, &b"filter\0"[..])]);
    }

    #[test]
    fn decoder_reads_use_and_rejects_other_types() {
        let payload = table_payload("filter", TableFamily::Inet, 3);
        let hdr = NlMsgHdr::new(nft_msg_type(msg::DELTABLE), 0);
        let table = table_from_msg(&hdr, &payload).unwrap();
        assert_eq!(table.use_count, 3);
        assert_eq!(table.family, TableFamily::Inet);

        let hdr = NlMsgHdr::new(nft_msg_type(msg::NEWCHAIN), 0);
        assert!(matches!(
            table_from_msg(&hdr, &payload),
            Err(Error::UnexpectedHeaderType { .. })
        ));

        let hdr = NlMsgHdr::new(nft_msg_type(msg::NEWTABLE), 0);
        assert!(table_from_msg(&hdr, &[1]).is_err());
    }

    #[tokio::test]
    async fn list_tables_dumps_every_family() {
        let mock = MockTransport::new();
        let conn = Connection::from_transport(mock.clone());

        let mut data = reply(
            nft_msg_type(msg::NEWTABLE),
            NLM_F_MULTI,
            1,
            &table_payload("filter", TableFamily::Inet, 2),
        );
        data.extend(reply(
            nft_msg_type(msg::NEWTABLE),
            NLM_F_MULTI,
            1,
            &table_payload("nat", TableFamily::Ipv4, 0),
        ));
        mock.push_recv(data);
        mock.push_recv(done(1));

        let tables = conn.list_tables().await.unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].name, "filter");
        assert_eq!(tables[1].family, TableFamily::Ipv4);

        let sent = mock.sent();
        let (hdr, payload) = MessageIter::new(&sent[0]).next().unwrap().unwrap();
        assert_eq!(hdr.nlmsg_type, nft_msg_type(msg::GETTABLE));
        assert_eq!(hdr.nlmsg_flags, NLM_F_REQUEST | NLM_F_DUMP);
        assert_eq!(payload, &[0u8, 0, 0, 0][..]);
    }

    #[tokio::test]
    async fn list_table_by_name_is_not_a_dump() {
        let mock = MockTransport::new();
        let conn = Connection::from_transport(mock.clone());

        mock.push_recv(reply(
            nft_msg_type(msg::NEWTABLE),
            0,
            1,
            &table_payload("filter", TableFamily::Ipv4, 1),
        ));

        let table = conn.list_table("filter").await.unwrap();
        assert_eq!(table.name, "filter");

        let sent = mock.sent();
        let (hdr, payload) = MessageIter::new(&sent[0]).next().unwrap().unwrap();
        assert_eq!(hdr.nlmsg_flags, NLM_F_REQUEST);
        assert_eq!(payload[0], TableFamily::Ipv4.as_u8());
    }

    #[tokio::test]
    async fn list_table_of_family_requires_exactly_one() {
        let mock = MockTransport::new();
        let conn = Connection::from_transport(mock.clone());
        mock.push_recv(done(1));

        let err = conn
            .list_table_of_family("missing", TableFamily::Ipv4)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("expected table count 1, got 0"));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn list_table_maps_enoent_to_count_error() {
        let mock = MockTransport::new();
        let conn = Connection::from_transport(mock.clone());
        mock.push_recv(error_reply(1, -libc::ENOENT));

        let err = conn.list_table("missing").await.unwrap_err();
        assert_eq!(err.to_string(), "expected table count 1, got 0");
    }
}
