//! Canonical entity identifiers.
//!
//! Every id encodes the entity's kind plus a local code. Two string forms
//! exist and convert losslessly: the qualified form `cg:<kind>:<local>`
//! (e.g. `cg:concept:74a1`) and the short form `<K>-<local>` with a
//! single-letter kind code (e.g. `C-74a1`). This module is the only place
//! that parses or formats either form.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::{ContentGraphError, Result};

/// Namespace scheme of the qualified id form.
const ID_SCHEME: &str = "cg";

/// Kind of a content entity, as encoded in its canonical id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Concept,
    Resource,
    Topic,
    Predicate,
}

impl EntityKind {
    /// All kinds, in classification order.
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Concept,
        EntityKind::Resource,
        EntityKind::Topic,
        EntityKind::Predicate,
    ];

    /// Namespace segment used in the qualified id form.
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Concept => "concept",
            EntityKind::Resource => "resource",
            EntityKind::Topic => "topic",
            EntityKind::Predicate => "predicate",
        }
    }

    /// Single-letter code used in the short id form.
    pub fn code(&self) -> char {
        match self {
            EntityKind::Concept => 'C',
            EntityKind::Resource => 'R',
            EntityKind::Topic => 'T',
            EntityKind::Predicate => 'P',
        }
    }

    fn from_name(name: &str) -> Option<EntityKind> {
        EntityKind::ALL.into_iter().find(|k| k.name() == name)
    }

    fn from_code(code: char) -> Option<EntityKind> {
        EntityKind::ALL.into_iter().find(|k| k.code() == code)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntityKind {
    type Err = ContentGraphError;

    fn from_str(s: &str) -> Result<Self> {
        EntityKind::from_name(s)
            .ok_or_else(|| ContentGraphError::InvalidId(format!("unknown entity kind: {}", s)))
    }
}

impl Serialize for EntityKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for EntityKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

fn local_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("Invalid regex pattern")
    })
}

/// Canonical identifier: an entity kind plus a local code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalId {
    kind: EntityKind,
    local: String,
}

impl CanonicalId {
    /// Build an id from a kind and an explicit local code.
    pub fn new(kind: EntityKind, local: impl Into<String>) -> Result<Self> {
        let local = local.into();
        if !local_code_re().is_match(&local) {
            return Err(ContentGraphError::InvalidId(format!(
                "local code {:?} does not match [A-Za-z0-9][A-Za-z0-9._-]*",
                local
            )));
        }
        Ok(Self { kind, local })
    }

    /// Mint a fresh id with a UUID v4 local code.
    pub fn generate(kind: EntityKind) -> Self {
        Self {
            kind,
            local: Uuid::new_v4().to_string(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn local(&self) -> &str {
        &self.local
    }

    /// Fully-qualified form, e.g. `cg:concept:74a1`.
    pub fn qualified(&self) -> String {
        format!("{}:{}:{}", ID_SCHEME, self.kind.name(), self.local)
    }

    /// Short form, e.g. `C-74a1`.
    pub fn short(&self) -> String {
        format!("{}-{}", self.kind.code(), self.local)
    }

    /// Parse either id form.
    pub fn parse(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((scheme, rest)) if scheme == ID_SCHEME => {
                let (kind_name, local) = rest.split_once(':').ok_or_else(|| {
                    ContentGraphError::InvalidId(format!("malformed qualified id: {}", s))
                })?;
                let kind = EntityKind::from_name(kind_name).ok_or_else(|| {
                    ContentGraphError::InvalidId(format!("unknown entity kind in id: {}", s))
                })?;
                CanonicalId::new(kind, local)
            }
            Some(_) => Err(ContentGraphError::InvalidId(format!(
                "not a canonical id: {}",
                s
            ))),
            None => {
                // Short form: single-letter kind code, a dash, then the local code.
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(code), Some('-')) => {
                        let kind = EntityKind::from_code(code).ok_or_else(|| {
                            ContentGraphError::InvalidId(format!("unknown kind code in id: {}", s))
                        })?;
                        CanonicalId::new(kind, &s[2..])
                    }
                    _ => Err(ContentGraphError::InvalidId(format!(
                        "not a canonical id: {}",
                        s
                    ))),
                }
            }
        }
    }
}

impl fmt::Display for CanonicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", ID_SCHEME, self.kind.name(), self.local)
    }
}

impl FromStr for CanonicalId {
    type Err = ContentGraphError;

    fn from_str(s: &str) -> Result<Self> {
        CanonicalId::parse(s)
    }
}

impl Serialize for CanonicalId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.qualified())
    }
}

impl<'de> Deserialize<'de> for CanonicalId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        CanonicalId::parse(&s).map_err(de::Error::custom)
    }
}

impl ToSql for CanonicalId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.qualified()))
    }
}

impl FromSql for CanonicalId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        CanonicalId::parse(s).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}
