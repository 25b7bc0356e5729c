use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use libris_core_types::Sensitive;
use serde::{Deserialize, Serialize, Serializer};

use crate::credentials::TOKEN_PLAINTEXT_LEN;
use crate::errors::LibrisError;
use crate::rules::validation::Validator;

/// Purpose a token was issued for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenScope {
    Activation,
    Authentication,
}

impl TokenScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenScope::Activation => "activation",
            TokenScope::Authentication => "authentication",
        }
    }
}

impl fmt::Display for TokenScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenScope {
    type Err = LibrisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "activation" => Ok(TokenScope::Activation),
            "authentication" => Ok(TokenScope::Authentication),
            other => Err(LibrisError::Serialization {
                message: format!("unknown token scope: {}", other),
            }),
        }
    }
}

/// Scoped token issued to a user
///
/// Only `hash` is persisted. `plaintext` is handed to the caller once, at
/// generation time, and is empty on tokens read back from storage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    #[serde(serialize_with = "expose_plaintext")]
    pub plaintext: Sensitive<String>,

    #[serde(skip)]
    pub hash: Vec<u8>,

    #[serde(skip_serializing_if = "is_unset")]
    pub user_id: i64,

    pub expiry: DateTime<Utc>,

    #[serde(skip)]
    pub scope: TokenScope,
}

fn expose_plaintext<S: Serializer>(
    plaintext: &Sensitive<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(plaintext.expose())
}

fn is_unset(id: &i64) -> bool {
    *id == 0
}

impl Token {
    /// True while the expiry lies in the future
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expiry > now
    }
}

/// Record every violated rule for a presented token plaintext
pub fn validate_token_plaintext(v: &mut Validator, plaintext: &str) {
    v.check(!plaintext.is_empty(), "token", "must be provided");
    v.check(
        plaintext.len() == TOKEN_PLAINTEXT_LEN,
        "token",
        "must be 26 bytes long",
    );
}
