//! Protocol constraints implied by legacy xtables extensions.
//!
//! The kernel's `nft_compat` shim runs every xtables match and target of a
//! rule under one layer-4 protocol, sent in `NFTA_RULE_COMPAT`. Extensions
//! such as `tcp` or `TCPMSS` only work for a specific protocol, so a rule
//! mixing `tcp` and `udp` can never be loaded.

use std::fmt;

use super::expr::Expr;
use crate::netlink::error::{Error, Result};

const IPPROTO_TCP: u32 = 6;
const IPPROTO_UDP: u32 = 17;
const IPPROTO_UDPLITE: u32 = 136;
const IPPROTO_SCTP: u32 = 132;
const IPPROTO_COMP: u32 = 108;
const IPPROTO_ESP: u32 = 50;

/// Protocol (and compat flags) a rule must be loaded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CompatPolicy {
    /// IP protocol number (`IPPROTO_*`).
    pub proto: u32,
    /// `NFT_RULE_COMPAT_F_*` flags.
    pub flag: u32,
}

impl CompatPolicy {
    const fn proto(proto: u32) -> Self {
        Self { proto, flag: 0 }
    }
}

impl fmt::Display for CompatPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{proto {} flag {}}}", self.proto, self.flag)
    }
}

fn match_policy(name: &str) -> Option<CompatPolicy> {
    let proto = match name {
        "tcp" | "tcpmss" | "osf" => IPPROTO_TCP,
        "udp" => IPPROTO_UDP,
        "udplite" => IPPROTO_UDPLITE,
        "sctp" => IPPROTO_SCTP,
        "ipcomp" => IPPROTO_COMP,
        "esp" => IPPROTO_ESP,
        _ => return None,
    };
    Some(CompatPolicy::proto(proto))
}

fn target_policy(name: &str) -> Option<CompatPolicy> {
    match name {
        "TCPOPTSTRIP" | "TCPMSS" => Some(CompatPolicy::proto(IPPROTO_TCP)),
        _ => None,
    }
}

/// Find the compat policy required by the xtables extensions in `exprs`.
///
/// Returns `Ok(None)` when no extension constrains the protocol, and
/// [`Error::CompatConflict`] naming the first two disagreeing expressions
/// when the constraints cannot all hold.
pub fn get_compat_policy(exprs: &[Expr]) -> Result<Option<CompatPolicy>> {
    let mut found: Option<(&Expr, CompatPolicy)> = None;

    for expr in exprs {
        let policy = match expr {
            Expr::Match { name, .. } => match_policy(name),
            Expr::Target { name, .. } => target_policy(name),
            Expr::Other { .. } => None,
        };
        let Some(policy) = policy else {
            continue;
        };

        match found {
            None => found = Some((expr, policy)),
            Some((first, first_policy)) if first_policy != policy => {
                return Err(Error::CompatConflict {
                    first: first.to_string(),
                    second: expr.to_string(),
                    first_policy: first_policy.to_string(),
                    second_policy: policy.to_string(),
                });
            }
            Some(_) => {}
        }
    }

    Ok(found.map(|(_, policy)| policy))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicting_matches_name_both() {
        let exprs = [
            Expr::xt_match("tcp", 0, vec![]),
            Expr::xt_match("udp", 0, vec![]),
        ];
        let err = get_compat_policy(&exprs).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("match tcp"), "{}", msg);
        assert!(msg.contains("match udp"), "{}", msg);
    }

    #[test]
    fn agreeing_match_and_target() {
        let exprs = [
            Expr::xt_match("tcp", 0, vec![]),
            Expr::xt_target("TCPMSS", 0, vec![]),
        ];
        assert_eq!(
            get_compat_policy(&exprs).unwrap(),
            Some(CompatPolicy {
                proto: IPPROTO_TCP,
                flag: 0
            })
        );
    }

    #[test]
    fn unconstrained_expressions() {
        let exprs = [
            Expr::xt_match("conntrack", 3, vec![]),
            Expr::xt_target("LOG", 0, vec![]),
            Expr::Other {
                name: "tcp".into(),
                data: vec![],
            },
        ];
        assert_eq!(get_compat_policy(&exprs).unwrap(), None);
        assert_eq!(get_compat_policy(&[]).unwrap(), None);
    }

    #[test]
    fn target_names_are_case_sensitive() {
        // The lowercase `tcpmss` is a match; as a target it is unknown.
        let exprs = [Expr::xt_target("tcpmss", 0, vec![])];
        assert_eq!(get_compat_policy(&exprs).unwrap(), None);
    }

    #[test]
    fn protocol_table() {
        for (name, proto) in [
            ("udplite", IPPROTO_UDPLITE),
            ("sctp", IPPROTO_SCTP),
            ("osf", IPPROTO_TCP),
            ("ipcomp", IPPROTO_COMP),
            ("esp", IPPROTO_ESP),
        ] {
            let policy = get_compat_policy(&[Expr::xt_match(name, 0, vec![])]).unwrap();
            assert_eq!(policy.map(|p| p.proto), Some(proto), "{}", name);
        }
        let policy = get_compat_policy(&[Expr::xt_target("TCPOPTSTRIP", 0, vec![])]).unwrap();
        assert_eq!(policy.map(|p| p.proto), Some(IPPROTO_TCP));
    }
}
