//! Parser combinators for netlink attribute streams.
//!
//! [`AttrIter`](super::attr::AttrIter) is lenient and simply stops at the first
//! malformed attribute. Decoders for kernel replies use [`attributes`] instead,
//! which reports truncated or overlong attributes as errors so that a corrupt
//! message surfaces to the caller rather than decoding as a half-empty object.

use winnow::binary::le_u16;
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::take;

use super::attr::{NLA_HDRLEN, NLA_TYPE_MASK, nla_align};
use super::error::{Error, Result};

/// Result type for winnow parsers.
pub type PResult<T> = core::result::Result<T, ErrMode<ContextError>>;

/// Parse a netlink attribute header and return (type, payload).
///
/// The returned type has the nested and byte-order flags stripped.
pub fn parse_attr<'a>(input: &mut &'a [u8]) -> PResult<(u16, &'a [u8])> {
    let len = le_u16.parse_next(input)? as usize;
    let attr_type = le_u16.parse_next(input)?;

    if len < NLA_HDRLEN {
        return Err(ErrMode::Cut(ContextError::new()));
    }

    let payload_len = len - NLA_HDRLEN;
    let payload: &[u8] = take(payload_len).parse_next(input)?;

    // The last attribute may omit its padding.
    let padding = nla_align(len) - len;
    if input.len() >= padding {
        let _: &[u8] = take(padding).parse_next(input)?;
    } else {
        *input = &[];
    }

    Ok((attr_type & NLA_TYPE_MASK, payload))
}

/// Parse every attribute in `data`, failing on malformed input.
pub fn attributes(data: &[u8]) -> Result<Vec<(u16, &[u8])>> {
    let mut input = data;
    let mut attrs = Vec::new();

    while !input.is_empty() {
        if input.len() < NLA_HDRLEN {
            return Err(Error::InvalidAttribute(format!(
                "{} trailing bytes after last attribute",
                input.len()
            )));
        }
        let offset = data.len() - input.len();
        let attr = parse_attr(&mut input).map_err(|_| {
            Error::InvalidAttribute(format!("malformed attribute at offset {}", offset))
        })?;
        attrs.push(attr);
    }

    Ok(attrs)
}
