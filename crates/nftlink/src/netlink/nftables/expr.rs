//! Rule expressions.
//!
//! Only the legacy xtables `match` and `target` expressions are modelled;
//! everything else is carried as its raw attribute stream.

use std::fmt;

use super::NFTA_LIST_ELEM;
use crate::netlink::attr::get;
use crate::netlink::builder::MessageBuilder;
use crate::netlink::error::{Error, Result};
use crate::netlink::parse::attributes;

// Expression attributes
const NFTA_EXPR_NAME: u16 = 1;
const NFTA_EXPR_DATA: u16 = 2;

// Match and target attributes share their layout.
const NFTA_XT_NAME: u16 = 1;
const NFTA_XT_REV: u16 = 2;
const NFTA_XT_INFO: u16 = 3;

/// One expression of a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "expr", rename_all = "lowercase"))]
pub enum Expr {
    /// xtables match run through `nft_compat`.
    Match {
        /// Extension name, e.g. `tcp`.
        name: String,
        /// Extension revision.
        rev: u32,
        /// Extension private data.
        info: Vec<u8>,
    },
    /// xtables target run through `nft_compat`.
    Target {
        /// Extension name, e.g. `TCPMSS`.
        name: String,
        /// Extension revision.
        rev: u32,
        /// Extension private data.
        info: Vec<u8>,
    },
    /// Any native nftables expression.
    Other {
        /// Expression name, e.g. `payload`.
        name: String,
        /// Raw `NFTA_EXPR_DATA` attribute stream.
        data: Vec<u8>,
    },
}

impl Expr {
    /// Create an xtables match expression.
    pub fn xt_match(name: impl Into<String>, rev: u32, info: Vec<u8>) -> Self {
        Self::Match {
            name: name.into(),
            rev,
            info,
        }
    }

    /// Create an xtables target expression.
    pub fn xt_target(name: impl Into<String>, rev: u32, info: Vec<u8>) -> Self {
        Self::Target {
            name: name.into(),
            rev,
            info,
        }
    }

    /// Kernel expression type name.
    pub fn kind(&self) -> &str {
        match self {
            Self::Match { .. } => "match",
            Self::Target { .. } => "target",
            Self::Other { name, .. } => name,
        }
    }

    /// Append this expression as one `NFTA_LIST_ELEM`.
    pub(crate) fn marshal(&self, builder: &mut MessageBuilder) {
        let elem = builder.nest_start(NFTA_LIST_ELEM);
        builder.append_attr_str(NFTA_EXPR_NAME, self.kind());

        match self {
            Self::Match { name, rev, info } | Self::Target { name, rev, info } => {
                let data = builder.nest_start(NFTA_EXPR_DATA);
                builder.append_attr_str(NFTA_XT_NAME, name);
                builder.append_attr_u32_be(NFTA_XT_REV, *rev);
                builder.append_attr(NFTA_XT_INFO, info);
                builder.nest_end(data);
            }
            Self::Other { data, .. } => {
                let nest = builder.nest_start(NFTA_EXPR_DATA);
                builder.append_bytes(data);
                builder.nest_end(nest);
            }
        }

        builder.nest_end(elem);
    }

    /// Decode the contents of one `NFTA_LIST_ELEM`.
    pub(crate) fn unmarshal(elem: &[u8]) -> Result<Self> {
        let mut kind = None;
        let mut data: &[u8] = &[];

        for (attr_type, value) in attributes(elem)? {
            match attr_type {
                NFTA_EXPR_NAME => kind = Some(get::string(value)?),
                NFTA_EXPR_DATA => data = value,
                _ => {}
            }
        }

        let kind =
            kind.ok_or_else(|| Error::InvalidAttribute("expression without a name".into()))?;

        match kind {
            "match" | "target" => {
                let mut name = String::new();
                let mut rev = 0;
                let mut info = Vec::new();
                for (attr_type, value) in attributes(data)? {
                    match attr_type {
                        NFTA_XT_NAME => name = get::string(value)?.to_string(),
                        NFTA_XT_REV => rev = get::u32_be(value)?,
                        NFTA_XT_INFO => info = value.to_vec(),
                        _ => {}
                    }
                }
                Ok(if kind == "match" {
                    Self::Match { name, rev, info }
                } else {
                    Self::Target { name, rev, info }
                })
            }
            other => Ok(Self::Other {
                name: other.to_string(),
                data: data.to_vec(),
            }),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Match { name, rev, .. } => write!(f, "match {} rev {}", name, rev),
            Self::Target { name, rev, .. } => write!(f, "target {} rev {}", name, rev),
            Self::Other { name, .. } => f.write_str(name),
        }
    }
}

/// Decode an `NFTA_RULE_EXPRESSIONS` list.
pub(crate) fn exprs_from_list(data: &[u8]) -> Result<Vec<Expr>> {
    attributes(data)?
        .into_iter()
        .filter(|(attr_type, _)| *attr_type == NFTA_LIST_ELEM)
        .map(|(_, elem)| Expr::unmarshal(elem))
        .collect()
}
