//! Signature policy DSL
//!
//! Parses expressions such as `OR('Org1MSP.member', AND('Org2MSP.peer', 'Org3MSP.admin'))`
//! or `OutOf(2, 'A.member', 'B.member', 'C.member')` into a policy envelope with
//! de-duplicated identities and an n-out-of rule tree.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::{DomainError, DomainResult};

/// Role an identity must hold within its MSP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MspRole {
    Member,
    Admin,
    Client,
    Peer,
    Orderer,
}

impl MspRole {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "member" => Some(Self::Member),
            "admin" => Some(Self::Admin),
            "client" => Some(Self::Client),
            "peer" => Some(Self::Peer),
            "orderer" => Some(Self::Orderer),
            _ => None,
        }
    }
}

/// An MSP identity with a role, e.g. `Org1MSP.member`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub msp_id: String,
    pub role: MspRole,
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = match self.role {
            MspRole::Member => "member",
            MspRole::Admin => "admin",
            MspRole::Client => "client",
            MspRole::Peer => "peer",
            MspRole::Orderer => "orderer",
        };
        write!(f, "{}.{}", self.msp_id, role)
    }
}

/// Rule tree; `SignedBy` indexes into `SignaturePolicy::identities`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PolicyRule {
    SignedBy(usize),
    NOutOf { n: usize, rules: Vec<PolicyRule> },
}

/// A signature policy envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignaturePolicy {
    pub version: u32,
    pub rule: PolicyRule,
    pub identities: Vec<Principal>,
}

impl SignaturePolicy {
    /// Policy satisfied by anyone (0 out of nothing).
    pub fn accept_all() -> Self {
        Self {
            version: 0,
            rule: PolicyRule::NOutOf {
                n: 0,
                rules: vec![],
            },
            identities: vec![],
        }
    }

    /// Parse a policy expression.
    pub fn parse(expr: &str) -> DomainResult<Self> {
        let invalid = |reason: String| DomainError::InvalidPolicy {
            policy: expr.to_string(),
            reason,
        };

        let tokens = tokenize(expr).map_err(invalid)?;
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            identities: Vec::new(),
        };
        let rule = parser.expression().map_err(invalid)?;
        if parser.pos != tokens.len() {
            return Err(invalid(format!(
                "unexpected trailing input at token {}",
                parser.pos
            )));
        }

        Ok(Self {
            version: 0,
            rule,
            identities: parser.identities,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Quoted(String),
    Number(usize),
    LParen,
    RParen,
    Comma,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(i, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                tokens.push(Token::LParen);
                chars.next();
            }
            ')' => {
                tokens.push(Token::RParen);
                chars.next();
            }
            ',' => {
                tokens.push(Token::Comma);
                chars.next();
            }
            '\'' | '"' => {
                let quote = c;
                chars.next();
                let mut value = String::new();
                let mut closed = false;
                for (_, ch) in chars.by_ref() {
                    if ch == quote {
                        closed = true;
                        break;
                    }
                    value.push(ch);
                }
                if !closed {
                    return Err(format!("unterminated quote at offset {i}"));
                }
                tokens.push(Token::Quoted(value));
            }
            c if c.is_ascii_digit() => {
                let mut digits = String::new();
                while let Some(&(_, d)) = chars.peek() {
                    if !d.is_ascii_digit() {
                        break;
                    }
                    digits.push(d);
                    chars.next();
                }
                let n = digits
                    .parse::<usize>()
                    .map_err(|e| format!("invalid number '{digits}': {e}"))?;
                tokens.push(Token::Number(n));
            }
            c if c.is_ascii_alphabetic() => {
                let mut ident = String::new();
                while let Some(&(_, d)) = chars.peek() {
                    if !d.is_ascii_alphanumeric() {
                        break;
                    }
                    ident.push(d);
                    chars.next();
                }
                tokens.push(Token::Ident(ident));
            }
            other => return Err(format!("unexpected character '{other}' at offset {i}")),
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    identities: Vec<Principal>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos);
        self.pos += 1;
        tok
    }

    fn expect(&mut self, expected: Token) -> Result<(), String> {
        match self.next() {
            Some(tok) if *tok == expected => Ok(()),
            Some(tok) => Err(format!("expected {expected:?}, found {tok:?}")),
            None => Err(format!("expected {expected:?}, found end of input")),
        }
    }

    /// expression := IDENT '(' [NUMBER ','] arg (',' arg)* ')'
    fn expression(&mut self) -> Result<PolicyRule, String> {
        let op = match self.next() {
            Some(Token::Ident(name)) => name.clone(),
            Some(tok) => return Err(format!("expected AND, OR or OutOf, found {tok:?}")),
            None => return Err("empty policy".to_string()),
        };
        self.expect(Token::LParen)?;

        let threshold = if op.eq_ignore_ascii_case("outof") {
            let n = match self.next() {
                Some(Token::Number(n)) => *n,
                Some(Token::Quoted(s)) => s
                    .parse::<usize>()
                    .map_err(|_| format!("OutOf threshold must be a number, found '{s}'"))?,
                other => return Err(format!("OutOf threshold must be a number, found {other:?}")),
            };
            self.expect(Token::Comma)?;
            Some(n)
        } else if op.eq_ignore_ascii_case("and") || op.eq_ignore_ascii_case("or") {
            None
        } else {
            return Err(format!("unknown operator '{op}'"));
        };

        let mut rules = vec![self.argument()?];
        loop {
            match self.next() {
                Some(Token::Comma) => rules.push(self.argument()?),
                Some(Token::RParen) => break,
                Some(tok) => return Err(format!("expected ',' or ')', found {tok:?}")),
                None => return Err("missing ')'".to_string()),
            }
        }

        let n = match threshold {
            Some(n) => n,
            None if op.eq_ignore_ascii_case("and") => rules.len(),
            None => 1,
        };
        if n > rules.len() {
            return Err(format!(
                "threshold {} exceeds number of sub-policies {}",
                n,
                rules.len()
            ));
        }

        Ok(PolicyRule::NOutOf { n, rules })
    }

    fn argument(&mut self) -> Result<PolicyRule, String> {
        match self.peek() {
            Some(Token::Ident(_)) => self.expression(),
            Some(Token::Quoted(s)) => {
                let s = s.clone();
                self.pos += 1;
                let principal = parse_principal(&s)?;
                Ok(PolicyRule::SignedBy(self.identity_index(principal)))
            }
            Some(tok) => Err(format!("expected principal or sub-policy, found {tok:?}")),
            None => Err("unexpected end of input".to_string()),
        }
    }

    fn identity_index(&mut self, principal: Principal) -> usize {
        if let Some(idx) = self.identities.iter().position(|p| *p == principal) {
            return idx;
        }
        self.identities.push(principal);
        self.identities.len() - 1
    }
}

fn parse_principal(s: &str) -> Result<Principal, String> {
    let re = Regex::new(r"^([[:alnum:].\-]+)\.(member|admin|client|peer|orderer)$")
        .map_err(|e| format!("invalid principal pattern: {e}"))?;
    let caps = re
        .captures(s)
        .ok_or_else(|| format!("invalid principal '{s}', expected 'MSPID.role'"))?;
    let role = MspRole::parse(&caps[2]).ok_or_else(|| format!("invalid role in '{s}'"))?;
    Ok(Principal {
        msp_id: caps[1].to_string(),
        role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or() {
        let policy = SignaturePolicy::parse("OR('Org1MSP.member','Org2MSP.member')").unwrap();
        assert_eq!(policy.identities.len(), 2);
        assert_eq!(policy.identities[0].to_string(), "Org1MSP.member");
        assert_eq!(
            policy.rule,
            PolicyRule::NOutOf {
                n: 1,
                rules: vec![PolicyRule::SignedBy(0), PolicyRule::SignedBy(1)]
            }
        );
    }

    #[test]
    fn test_parse_nested_dedups_identities() {
        let policy =
            SignaturePolicy::parse("AND('A.peer', OR('A.peer', 'B.admin'))").unwrap();
        assert_eq!(policy.identities.len(), 2);
        assert_eq!(
            policy.rule,
            PolicyRule::NOutOf {
                n: 2,
                rules: vec![
                    PolicyRule::SignedBy(0),
                    PolicyRule::NOutOf {
                        n: 1,
                        rules: vec![PolicyRule::SignedBy(0), PolicyRule::SignedBy(1)]
                    }
                ]
            }
        );
    }

    #[test]
    fn test_parse_out_of() {
        let policy =
            SignaturePolicy::parse("OutOf(2, 'A.member', 'B.member', 'C.member')").unwrap();
        match policy.rule {
            PolicyRule::NOutOf { n, rules } => {
                assert_eq!(n, 2);
                assert_eq!(rules.len(), 3);
            }
            other => panic!("unexpected rule {other:?}"),
        }
    }

    #[test]
    fn test_parse_errors() {
        for bad in [
            "",
            "OR(",
            "XOR('A.member')",
            "OR('A.superuser')",
            "OutOf(3, 'A.member', 'B.member')",
            "OR('A.member') junk",
            "OR('A.member'",
        ] {
            assert!(SignaturePolicy::parse(bad).is_err(), "expected error for {bad:?}");
        }
    }

    #[test]
    fn test_serialized_shape() {
        let policy = SignaturePolicy::parse("OR('Org1MSP.member')").unwrap();
        let json = serde_json::to_value(&policy).unwrap();
        assert_eq!(json["identities"][0]["mspId"], "Org1MSP");
        assert_eq!(json["identities"][0]["role"], "MEMBER");
        assert_eq!(json["rule"]["nOutOf"]["n"], 1);
        assert_eq!(json["rule"]["nOutOf"]["rules"][0]["signedBy"], 0);
    }
}
