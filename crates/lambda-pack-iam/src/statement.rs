//! Policy statements

use serde::{Deserialize, Serialize};

use crate::principal::Principal;
use crate::string_list;

/// Conventional effect values. The codec does not enforce them.
pub const EFFECT_ALLOW: &str = "Allow";
pub const EFFECT_DENY: &str = "Deny";

/// A single access rule.
///
/// Every key is optional on the wire and omitted when empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    /// Statement ID
    #[serde(default, skip_serializing_if = "is_blank")]
    pub sid: Option<String>,

    /// `Allow` or `Deny`, passed through unvalidated
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub effect: String,

    #[serde(default, skip_serializing_if = "is_absent")]
    pub principal: Option<Principal>,

    #[serde(default, skip_serializing_if = "is_absent")]
    pub not_principal: Option<Principal>,

    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "string_list::deserialize"
    )]
    pub action: Vec<String>,

    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "string_list::deserialize"
    )]
    pub not_action: Vec<String>,

    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "string_list::deserialize"
    )]
    pub resource: Vec<String>,

    /// Condition block, kept verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<serde_json::Value>,
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

fn is_absent(value: &Option<Principal>) -> bool {
    value.as_ref().map_or(true, Principal::is_empty)
}

impl Statement {
    /// Create a statement with the given effect, actions and resources
    pub fn new<A, R>(effect: impl Into<String>, actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Statement {
            effect: effect.into(),
            action: actions.into_iter().map(Into::into).collect(),
            resource: resources.into_iter().map(Into::into).collect(),
            ..Statement::default()
        }
    }

    /// `Allow` statement over the given actions and resources
    pub fn allow<A, R>(actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self::new(EFFECT_ALLOW, actions, resources)
    }

    /// `Deny` statement over the given actions and resources
    pub fn deny<A, R>(actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self::new(EFFECT_DENY, actions, resources)
    }

    pub fn with_sid(mut self, sid: impl Into<String>) -> Self {
        self.sid = Some(sid.into());
        self
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn with_condition(mut self, condition: serde_json::Value) -> Self {
        self.condition = Some(condition);
        self
    }
}
