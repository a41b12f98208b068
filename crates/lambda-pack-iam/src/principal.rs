//! Statement principals
//!
//! On the wire a principal is either the bare string `"*"` or an object with
//! any subset of the keys `AWS`, `CanonicalUser`, `Federated` and `Service`.
//! In memory it is always the structured form.

use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::IamError;
use crate::string_list::StringList;

/// Wildcard principal value.
pub const WILDCARD: &str = "*";

const KEY_AWS: &str = "AWS";
const KEY_CANONICAL_USER: &str = "CanonicalUser";
const KEY_FEDERATED: &str = "Federated";
const KEY_SERVICE: &str = "Service";

/// The "who" of a policy statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Principal {
    /// AWS account, user or role ARNs (or `*`)
    pub aws: Vec<String>,
    /// Canonical user IDs (S3 bucket policies)
    pub canonical_user: Vec<String>,
    /// Federated identity providers
    pub federated: Vec<String>,
    /// AWS service principals, e.g. `lambda.amazonaws.com`
    pub service: Vec<String>,
}

impl Principal {
    /// Everyone.
    pub fn wildcard() -> Self {
        Self::aws([WILDCARD])
    }

    /// Principal with the given AWS identities.
    pub fn aws<I, S>(identities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            aws: identities.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Principal with the given service identities.
    pub fn service<I, S>(services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            service: services.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// True when this principal encodes as the bare string `"*"`.
    ///
    /// Holds only for `AWS == ["*"]` with every other list empty.
    pub fn is_wildcard(&self) -> bool {
        self.aws.len() == 1
            && self.aws[0] == WILDCARD
            && self.canonical_user.is_empty()
            && self.federated.is_empty()
            && self.service.is_empty()
    }

    /// True when all four lists are empty.
    pub fn is_empty(&self) -> bool {
        self.aws.is_empty()
            && self.canonical_user.is_empty()
            && self.federated.is_empty()
            && self.service.is_empty()
    }

    /// Serialize to a compact JSON string
    pub fn to_json(&self) -> Result<String, IamError> {
        Ok(serde_json::to_string(self)?)
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

impl Serialize for Principal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if self.is_wildcard() {
            return serializer.serialize_str(WILDCARD);
        }

        let fields = [
            (KEY_AWS, &self.aws),
            (KEY_CANONICAL_USER, &self.canonical_user),
            (KEY_FEDERATED, &self.federated),
            (KEY_SERVICE, &self.service),
        ];
        let present = fields.iter().filter(|(_, list)| !list.is_empty()).count();

        let mut map = serializer.serialize_map(Some(present))?;
        for (key, list) in fields.iter().filter(|(_, list)| !list.is_empty()) {
            map.serialize_entry(key, list)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Principal {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(PrincipalVisitor)
    }
}

struct PrincipalVisitor;

impl<'de> Visitor<'de> for PrincipalVisitor {
    type Value = Principal;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a principal string or an object of identity lists")
    }

    // Any bare string lands in AWS; "*" is the only value AWS accepts here.
    fn visit_str<E>(self, value: &str) -> Result<Principal, E>
    where
        E: de::Error,
    {
        Ok(Principal::aws([value]))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Principal, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut principal = Principal::default();
        while let Some(key) = map.next_key::<String>()? {
            let slot = match key.as_str() {
                KEY_AWS => &mut principal.aws,
                KEY_CANONICAL_USER => &mut principal.canonical_user,
                KEY_FEDERATED => &mut principal.federated,
                KEY_SERVICE => &mut principal.service,
                _ => {
                    map.next_value::<IgnoredAny>()?;
                    continue;
                }
            };
            *slot = map.next_value::<StringList>()?.0;
        }
        Ok(principal)
    }
}
