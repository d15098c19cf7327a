//! Rules.

use super::compat::{CompatPolicy, get_compat_policy};
use super::expr::{Expr, exprs_from_list};
use super::header::{request, split_body};
use super::msg;
use super::table::{Table, TableFamily};
use crate::netlink::attr::get;
use crate::netlink::connection::Connection;
use crate::netlink::error::{Error, Result};
use crate::netlink::message::{NLM_F_ACK, NLM_F_APPEND, NLM_F_CREATE, NLM_F_REQUEST, NlMsgHdr};
use crate::netlink::parse::attributes;
use crate::netlink::socket::Transport;

// Rule attributes
const NFTA_RULE_TABLE: u16 = 1;
const NFTA_RULE_CHAIN: u16 = 2;
const NFTA_RULE_HANDLE: u16 = 3;
const NFTA_RULE_EXPRESSIONS: u16 = 4;
const NFTA_RULE_COMPAT: u16 = 5;
const NFTA_RULE_POSITION: u16 = 6;
const NFTA_RULE_USERDATA: u16 = 7;

// Rule compat attributes
const NFTA_RULE_COMPAT_PROTO: u16 = 1;
const NFTA_RULE_COMPAT_FLAGS: u16 = 2;

/// An nftables rule.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Rule {
    /// Table the rule lives in.
    pub table: Table,
    /// Chain name.
    pub chain: String,
    /// Kernel-assigned handle. Zero for rules not yet added.
    pub handle: u64,
    /// Handle of the rule to append after; zero appends at the end.
    pub position: u64,
    /// Expressions in evaluation order.
    pub exprs: Vec<Expr>,
    /// Opaque user data (comments and the like).
    pub user_data: Vec<u8>,
    /// Compat policy reported by the kernel.
    pub compat: Option<CompatPolicy>,
}

impl Rule {
    /// Create an empty rule in `chain` of `table`.
    pub fn new(table: Table, chain: impl Into<String>) -> Self {
        Self {
            table,
            chain: chain.into(),
            ..Default::default()
        }
    }

    /// Append an expression.
    pub fn expr(mut self, expr: Expr) -> Self {
        self.exprs.push(expr);
        self
    }
}

impl<T: Transport> Connection<T> {
    /// Queue appending `rule` to its chain.
    ///
    /// The compat policy is derived from the rule's xtables extensions; a
    /// rule whose extensions need different protocols, or whose attributes
    /// do not fit a netlink length field, is rejected without queueing
    /// anything.
    pub fn add_rule(&self, rule: &Rule) -> Result<()> {
        let compat = get_compat_policy(&rule.exprs)?;

        let mut builder = request(
            msg::NEWRULE,
            NLM_F_REQUEST | NLM_F_ACK | NLM_F_CREATE | NLM_F_APPEND,
            rule.table.family.as_u8(),
        );
        builder.append_attr_str(NFTA_RULE_TABLE, &rule.table.name);
        builder.append_attr_str(NFTA_RULE_CHAIN, &rule.chain);
        if rule.position != 0 {
            builder.append_attr_u64_be(NFTA_RULE_POSITION, rule.position);
        }

        let list = builder.nest_start(NFTA_RULE_EXPRESSIONS);
        for expr in &rule.exprs {
            expr.marshal(&mut builder);
        }
        builder.nest_end(list);

        if let Some(policy) = compat {
            let nest = builder.nest_start(NFTA_RULE_COMPAT);
            builder.append_attr_u32_be(NFTA_RULE_COMPAT_PROTO, policy.proto);
            builder.append_attr_u32_be(NFTA_RULE_COMPAT_FLAGS, policy.flag);
            builder.nest_end(nest);
        }

        if !rule.user_data.is_empty() {
            builder.append_attr(NFTA_RULE_USERDATA, &rule.user_data);
        }

        builder.validate()?;
        self.queue(builder);
        Ok(())
    }

    /// Queue deletion of `rule`, identified by its handle.
    pub fn del_rule(&self, rule: &Rule) -> Result<()> {
        if rule.handle == 0 {
            return Err(Error::InvalidMessage(
                "cannot delete a rule without a handle".into(),
            ));
        }

        let mut builder = request(
            msg::DELRULE,
            NLM_F_REQUEST | NLM_F_ACK,
            rule.table.family.as_u8(),
        );
        builder.append_attr_str(NFTA_RULE_TABLE, &rule.table.name);
        builder.append_attr_str(NFTA_RULE_CHAIN, &rule.chain);
        builder.append_attr_u64_be(NFTA_RULE_HANDLE, rule.handle);
        self.queue(builder);
        Ok(())
    }
}

/// Decode a `NEWRULE`/`DELRULE` message.
pub fn rule_from_msg(hdr: &NlMsgHdr, payload: &[u8]) -> Result<Rule> {
    let (genmsg, attrs) = split_body(hdr, payload, &[msg::NEWRULE, msg::DELRULE])?;

    let mut rule = Rule {
        table: Table::new("", TableFamily::from_u8(genmsg.family)),
        ..Default::default()
    };

    for (attr_type, data) in attrs {
        match attr_type {
            NFTA_RULE_TABLE => rule.table.name = get::string(data)?.to_string(),
            NFTA_RULE_CHAIN => rule.chain = get::string(data)?.to_string(),
            NFTA_RULE_HANDLE => rule.handle = get::u64_be(data)?,
            NFTA_RULE_POSITION => rule.position = get::u64_be(data)?,
            NFTA_RULE_EXPRESSIONS => rule.exprs = exprs_from_list(data)?,
            NFTA_RULE_USERDATA => rule.user_data = data.to_vec(),
            NFTA_RULE_COMPAT => rule.compat = Some(compat_from_attr(data)?),
            _ => {}
        }
    }

    Ok(rule)
}

fn compat_from_attr(data: &[u8]) -> Result<CompatPolicy> {
    let mut policy = CompatPolicy { proto: 0, flag: 0 };
    for (attr_type, value) in attributes(data)? {
        match attr_type {
            NFTA_RULE_COMPAT_PROTO => policy.proto = get::u32_be(value)?,
            NFTA_RULE_COMPAT_FLAGS => policy.flag = get::u32_be(value)?,
            _ => {}
        }
    }
    Ok(policy)
}
