/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Access policies stored in configuration trees.
//!
//! A [`Policy`] is a type tag plus a nested, Borsh-serialized policy body. Two kinds of policy body are
//! understood by this library:
//! 1. [`ImplicitMetaPolicy`]: a policy that is satisfied when `ANY`, `ALL`, or a `MAJORITY` of the
//!    same-named sub-policies of the child groups are satisfied, written as e.g. `"MAJORITY Admins"`.
//! 2. [`SignaturePolicyEnvelope`]: a threshold tree over signatures by principals, written in the policy
//!    language, e.g. `"OR('Org1MSP.admin', 'Org2MSP.admin')"`, `"AND('A.member', 'B.member')"`,
//!    or `"OutOf(2, 'A.peer', 'B.peer', 'C.peer')"`.

use std::{
    fmt::{self, Display, Formatter},
    io::{self, Read, Write},
    str::FromStr,
};

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use super::encoding::serialize;

/// The kind of policy body that a [`Policy`] carries.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyType {
    Unknown,
    Signature,
    Msp,
    ImplicitMeta,
}

/// A policy as stored in a configuration tree: a type tag and the serialized policy body.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Policy {
    pub policy_type: PolicyType,
    pub value: Vec<u8>,
}

impl Policy {
    /// Create a `Policy` wrapping an implicit meta policy.
    pub fn implicit_meta(policy: &ImplicitMetaPolicy) -> Policy {
        Policy {
            policy_type: PolicyType::ImplicitMeta,
            value: serialize(policy),
        }
    }

    /// Create a `Policy` wrapping a signature policy.
    pub fn signature(policy: &SignaturePolicyEnvelope) -> Policy {
        Policy {
            policy_type: PolicyType::Signature,
            value: serialize(policy),
        }
    }

    /// Parse `rule` as a policy of the given `policy_type`. Only [`PolicyType::ImplicitMeta`] and
    /// [`PolicyType::Signature`] rules can be parsed.
    pub fn from_rule(policy_type: PolicyType, rule: &str) -> Result<Policy, PolicyParseError> {
        match policy_type {
            PolicyType::ImplicitMeta => Ok(Policy::implicit_meta(&rule.parse()?)),
            PolicyType::Signature => Ok(Policy::signature(&rule.parse()?)),
            other => Err(PolicyParseError::UnsupportedPolicyType(other)),
        }
    }
}

/* ↓↓↓ Implicit meta policies ↓↓↓ */

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImplicitMetaRule {
    Any,
    All,
    Majority,
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct ImplicitMetaPolicy {
    pub sub_policy: String,
    pub rule: ImplicitMetaRule,
}

impl FromStr for ImplicitMetaPolicy {
    type Err = PolicyParseError;

    fn from_str(rule: &str) -> Result<Self, Self::Err> {
        let mut words = rule.split_whitespace();
        let (Some(rule_word), Some(sub_policy), None) = (words.next(), words.next(), words.next())
        else {
            return Err(PolicyParseError::MalformedImplicitMeta(rule.to_string()));
        };
        let rule = match rule_word.to_ascii_uppercase().as_str() {
            "ANY" => ImplicitMetaRule::Any,
            "ALL" => ImplicitMetaRule::All,
            "MAJORITY" => ImplicitMetaRule::Majority,
            _ => return Err(PolicyParseError::UnknownImplicitMetaRule(rule_word.to_string())),
        };
        Ok(ImplicitMetaPolicy {
            sub_policy: sub_policy.to_string(),
            rule,
        })
    }
}

impl Display for ImplicitMetaPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let rule = match self.rule {
            ImplicitMetaRule::Any => "ANY",
            ImplicitMetaRule::All => "ALL",
            ImplicitMetaRule::Majority => "MAJORITY",
        };
        write!(f, "{} {}", rule, self.sub_policy)
    }
}

/* ↓↓↓ Signature policies ↓↓↓ */

/// Role that a signing identity must hold within its organization to satisfy an [`MspPrincipal`].
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MspRole {
    Member,
    Admin,
    Client,
    Peer,
    Orderer,
}

impl FromStr for MspRole {
    type Err = PolicyParseError;

    fn from_str(role: &str) -> Result<Self, Self::Err> {
        match role {
            "member" => Ok(MspRole::Member),
            "admin" => Ok(MspRole::Admin),
            "client" => Ok(MspRole::Client),
            "peer" => Ok(MspRole::Peer),
            "orderer" => Ok(MspRole::Orderer),
            _ => Err(PolicyParseError::UnknownRole(role.to_string())),
        }
    }
}

/// An identity (organization plus role) whose signature a [`SignaturePolicy`] may require.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct MspPrincipal {
    pub msp_identifier: String,
    pub role: MspRole,
}

/// Threshold tree over the principals of a [`SignaturePolicyEnvelope`].
///
/// The Borsh encoding is written out by hand because the type is recursive. It matches the derived
/// layout: a one-byte variant index followed by the variant's fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignaturePolicy {
    /// Satisfied by a signature from the principal at this index of `identities`.
    SignedBy(u32),

    /// Satisfied when at least `n` of `rules` are satisfied.
    NOutOf { n: u32, rules: Vec<SignaturePolicy> },
}

/// Deepest nesting of `NOutOf` gates that a decoded signature policy may have.
pub const MAX_RULE_DEPTH: usize = 64;

impl BorshSerialize for SignaturePolicy {
    fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        match self {
            SignaturePolicy::SignedBy(index) => {
                BorshSerialize::serialize(&0u8, writer)?;
                BorshSerialize::serialize(index, writer)
            }
            SignaturePolicy::NOutOf { n, rules } => {
                BorshSerialize::serialize(&1u8, writer)?;
                BorshSerialize::serialize(n, writer)?;
                BorshSerialize::serialize(rules, writer)
            }
        }
    }
}

impl BorshDeserialize for SignaturePolicy {
    fn deserialize_reader<R: Read>(reader: &mut R) -> io::Result<Self> {
        SignaturePolicy::deserialize_at_depth(reader, 0)
    }
}

impl SignaturePolicy {
    fn deserialize_at_depth<R: Read>(reader: &mut R, depth: usize) -> io::Result<Self> {
        match u8::deserialize_reader(reader)? {
            0 => Ok(SignaturePolicy::SignedBy(u32::deserialize_reader(reader)?)),
            1 => {
                if depth >= MAX_RULE_DEPTH {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!(
                            "signature policy gates are nested deeper than {MAX_RULE_DEPTH} levels"
                        ),
                    ));
                }
                let n = u32::deserialize_reader(reader)?;
                let len = u32::deserialize_reader(reader)?;
                let mut rules = Vec::new();
                for _ in 0..len {
                    rules.push(SignaturePolicy::deserialize_at_depth(reader, depth + 1)?);
                }
                Ok(SignaturePolicy::NOutOf { n, rules })
            }
            variant => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unexpected SignaturePolicy variant {variant}"),
            )),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct SignaturePolicyEnvelope {
    pub version: i32,
    pub rule: SignaturePolicy,
    pub identities: Vec<MspPrincipal>,
}

impl FromStr for SignaturePolicyEnvelope {
    type Err = PolicyParseError;

    fn from_str(rule: &str) -> Result<Self, Self::Err> {
        let mut parser = RuleParser {
            chars: rule.chars().collect(),
            position: 0,
            identities: Vec::new(),
        };
        let rule = parser.expression()?;
        parser.skip_whitespace();
        if let Some(&found) = parser.chars.get(parser.position) {
            return Err(PolicyParseError::UnexpectedCharacter {
                found,
                position: parser.position,
            });
        }
        Ok(SignaturePolicyEnvelope {
            version: 0,
            rule,
            identities: parser.identities,
        })
    }
}

/// Recursive-descent parser for the signature policy language.
///
/// ```text
/// expression := gate "(" [ integer "," ] expression { "," expression } ")" | principal
/// gate       := "OR" | "AND" | "OutOf"
/// principal  := "'" msp_id "." role "'"
/// ```
struct RuleParser {
    chars: Vec<char>,
    position: usize,
    // Principals in order of first appearance. Repeated principals share an index.
    identities: Vec<MspPrincipal>,
}

impl RuleParser {
    fn expression(&mut self) -> Result<SignaturePolicy, PolicyParseError> {
        self.skip_whitespace();
        match self.peek()? {
            '\'' | '"' => {
                let principal = self.principal()?;
                Ok(SignaturePolicy::SignedBy(self.index_of(principal)))
            }
            _ => self.gate(),
        }
    }

    fn gate(&mut self) -> Result<SignaturePolicy, PolicyParseError> {
        let name = self.identifier();
        self.expect('(')?;
        let threshold = match name.as_str() {
            "OR" | "AND" => None,
            "OutOf" => {
                let n = self.integer()?;
                self.expect(',')?;
                Some(n)
            }
            _ => return Err(PolicyParseError::UnknownGate(name)),
        };

        let mut rules = vec![self.expression()?];
        loop {
            self.skip_whitespace();
            match self.peek()? {
                ',' => {
                    self.position += 1;
                    rules.push(self.expression()?);
                }
                ')' => {
                    self.position += 1;
                    break;
                }
                found => {
                    return Err(PolicyParseError::UnexpectedCharacter {
                        found,
                        position: self.position,
                    })
                }
            }
        }

        let n = match threshold {
            Some(n) => n,
            None if name == "OR" => 1,
            None => rules.len() as u32,
        };
        if n == 0 || n as usize > rules.len() {
            return Err(PolicyParseError::InvalidThreshold {
                n,
                rules: rules.len(),
            });
        }
        Ok(SignaturePolicy::NOutOf { n, rules })
    }

    fn principal(&mut self) -> Result<MspPrincipal, PolicyParseError> {
        let quote = self.peek()?;
        self.position += 1;
        let start = self.position;
        while self.peek()? != quote {
            self.position += 1;
        }
        let principal: String = self.chars[start..self.position].iter().collect();
        self.position += 1;

        let (msp_identifier, role) = principal
            .rsplit_once('.')
            .filter(|(msp_identifier, _)| !msp_identifier.is_empty())
            .ok_or_else(|| PolicyParseError::InvalidPrincipal(principal.clone()))?;
        Ok(MspPrincipal {
            msp_identifier: msp_identifier.to_string(),
            role: role.parse()?,
        })
    }

    fn index_of(&mut self, principal: MspPrincipal) -> u32 {
        match self.identities.iter().position(|p| *p == principal) {
            Some(index) => index as u32,
            None => {
                self.identities.push(principal);
                (self.identities.len() - 1) as u32
            }
        }
    }

    fn identifier(&mut self) -> String {
        self.skip_whitespace();
        let start = self.position;
        while let Some(c) = self.chars.get(self.position) {
            if !c.is_ascii_alphabetic() {
                break;
            }
            self.position += 1;
        }
        self.chars[start..self.position].iter().collect()
    }

    fn integer(&mut self) -> Result<u32, PolicyParseError> {
        self.skip_whitespace();
        let start = self.position;
        while let Some(c) = self.chars.get(self.position) {
            if !c.is_ascii_digit() {
                break;
            }
            self.position += 1;
        }
        let digits: String = self.chars[start..self.position].iter().collect();
        digits.parse().map_err(|_| match self.chars.get(start) {
            Some(&found) => PolicyParseError::UnexpectedCharacter {
                found,
                position: start,
            },
            None => PolicyParseError::UnexpectedEnd,
        })
    }

    fn expect(&mut self, expected: char) -> Result<(), PolicyParseError> {
        self.skip_whitespace();
        let found = self.peek()?;
        if found != expected {
            return Err(PolicyParseError::UnexpectedCharacter {
                found,
                position: self.position,
            });
        }
        self.position += 1;
        Ok(())
    }

    fn peek(&self) -> Result<char, PolicyParseError> {
        self.chars
            .get(self.position)
            .copied()
            .ok_or(PolicyParseError::UnexpectedEnd)
    }

    fn skip_whitespace(&mut self) {
        while self
            .chars
            .get(self.position)
            .is_some_and(|c| c.is_whitespace())
        {
            self.position += 1;
        }
    }
}

/// Error when parsing a policy rule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyParseError {
    #[error("policy rule ended unexpectedly")]
    UnexpectedEnd,

    #[error("unexpected character '{found}' at position {position} of policy rule")]
    UnexpectedCharacter { found: char, position: usize },

    #[error("unknown policy gate '{0}', expected OR, AND, or OutOf")]
    UnknownGate(String),

    #[error("threshold {n} is not satisfiable by {rules} sub-rules")]
    InvalidThreshold { n: u32, rules: usize },

    #[error("principal '{0}' is not of the form 'MSPID.role'")]
    InvalidPrincipal(String),

    #[error("unknown principal role '{0}'")]
    UnknownRole(String),

    #[error("implicit meta policy '{0}' is not of the form 'RULE SubPolicy'")]
    MalformedImplicitMeta(String),

    #[error("unknown implicit meta rule '{0}', expected ANY, ALL, or MAJORITY")]
    UnknownImplicitMetaRule(String),

    #[error("policies of type {0:?} cannot be parsed from a rule")]
    UnsupportedPolicyType(PolicyType),
}
