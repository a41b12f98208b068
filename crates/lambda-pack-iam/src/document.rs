//! Policy documents
//!
//! `Statement` is decoded from either a single object or an array of objects
//! and always encoded as an array.

use serde::de::value::{MapAccessDeserializer, SeqAccessDeserializer};
use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::error::IamError;
use crate::principal::Principal;
use crate::statement::Statement;
use crate::POLICY_VERSION;

/// An ordered list of statements plus an optional version tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyDocument {
    /// Policy language version, usually `2012-10-17`
    #[serde(
        rename = "Version",
        default,
        skip_serializing_if = "is_blank"
    )]
    pub version: Option<String>,

    /// Statements in caller order
    #[serde(rename = "Statement", deserialize_with = "deserialize_statements")]
    pub statements: Vec<Statement>,
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

impl PolicyDocument {
    /// Create an empty document with the given version
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: Some(version.into()),
            statements: Vec::new(),
        }
    }

    /// Append a statement
    pub fn with_statement(mut self, statement: Statement) -> Self {
        self.statements.push(statement);
        self
    }

    /// Append a statement in place
    pub fn add_statement(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    /// Trust policy letting the given services assume a role.
    ///
    /// This is the document attached to Lambda and Step Functions execution
    /// roles.
    pub fn assume_role<I, S>(services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(POLICY_VERSION).with_statement(
            Statement::allow(["sts:AssumeRole"], Vec::<String>::new())
                .with_principal(Principal::service(services)),
        )
    }

    /// Serialize to compact JSON
    pub fn to_json(&self) -> Result<String, IamError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialize to indented JSON
    pub fn to_json_pretty(&self) -> Result<String, IamError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Serialize to compact JSON bytes
    pub fn to_vec(&self) -> Result<Vec<u8>, IamError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse from a JSON string
    pub fn from_json(json: &str) -> Result<Self, IamError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse from JSON bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, IamError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

fn deserialize_statements<'de, D>(deserializer: D) -> Result<Vec<Statement>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(StatementsVisitor)
}

struct StatementsVisitor;

impl<'de> Visitor<'de> for StatementsVisitor {
    type Value = Vec<Statement>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a statement object or an array of statement objects")
    }

    // Single-statement shape is tried first and canonicalized to a list.
    fn visit_map<A>(self, map: A) -> Result<Vec<Statement>, A::Error>
    where
        A: MapAccess<'de>,
    {
        Statement::deserialize(MapAccessDeserializer::new(map)).map(|statement| vec![statement])
    }

    fn visit_seq<A>(self, seq: A) -> Result<Vec<Statement>, A::Error>
    where
        A: SeqAccess<'de>,
    {
        Vec::<Statement>::deserialize(SeqAccessDeserializer::new(seq))
    }
}
