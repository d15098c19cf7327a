//! The nfgenmsg header that prefixes every nftables message body.

use winnow::binary::{be_u16, le_u8};
use winnow::prelude::*;

use super::{NFNETLINK_V0, nft_msg_type};
use crate::netlink::builder::MessageBuilder;
use crate::netlink::error::{Error, Result};
use crate::netlink::message::NlMsgHdr;
use crate::netlink::parse::{PResult, attributes};

/// Size of the nfgenmsg header.
pub const NFGENMSG_LEN: usize = 4;

/// Encode the nfgenmsg header: family, version, resource id (big endian).
pub fn extra_header(family: u8, res_id: u16) -> [u8; NFGENMSG_LEN] {
    let [hi, lo] = res_id.to_be_bytes();
    [family, NFNETLINK_V0, hi, lo]
}

/// nfgenmsg header (mirrors struct nfgenmsg).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NfGenMsg {
    /// Address family (`NFPROTO_*`).
    pub family: u8,
    /// Protocol version, always `NFNETLINK_V0`.
    pub version: u8,
    /// Resource id, big endian on the wire.
    pub res_id: u16,
}

impl NfGenMsg {
    /// Fill the header from `b`.
    ///
    /// Buffers shorter than 16 bytes are ignored and leave the header
    /// untouched. Decoders use [`NfGenMsg::parse`], which only needs the
    /// four header bytes.
    pub fn decode(&mut self, b: &[u8]) {
        if b.len() < 16 {
            return;
        }
        self.family = b[0];
        self.version = b[1];
        self.res_id = u16::from_be_bytes([b[2], b[3]]);
    }

    /// Parse the header from the front of a message body.
    pub fn parse(input: &mut &[u8]) -> PResult<Self> {
        let family = le_u8.parse_next(input)?;
        let version = le_u8.parse_next(input)?;
        let res_id = be_u16.parse_next(input)?;
        Ok(Self {
            family,
            version,
            res_id,
        })
    }
}

/// Start an nftables request for `family`.
pub(crate) fn request(msg: u8, flags: u16, family: u8) -> MessageBuilder {
    let mut builder = MessageBuilder::new(nft_msg_type(msg), flags);
    builder.append_bytes(&extra_header(family, 0));
    builder
}

/// Check that `hdr` is one of `accepted` and split the body into its
/// nfgenmsg header and attribute list.
pub(crate) fn split_body<'a>(
    hdr: &NlMsgHdr,
    payload: &'a [u8],
    accepted: &[u8],
) -> Result<(NfGenMsg, Vec<(u16, &'a [u8])>)> {
    if !accepted.iter().any(|&m| nft_msg_type(m) == hdr.nlmsg_type) {
        return Err(Error::UnexpectedHeaderType {
            got: hdr.nlmsg_type,
            expected: accepted.iter().map(|&m| nft_msg_type(m)).collect(),
        });
    }

    let mut input = payload;
    let genmsg = NfGenMsg::parse(&mut input).map_err(|_| Error::Truncated {
        expected: NFGENMSG_LEN,
        actual: payload.len(),
    })?;

    Ok((genmsg, attributes(input)?))
}
