//! Write policies
//!
//! [`WritePolicy`] is both a configuration section (the client's default write
//! policy) and the per-call result of converting a host policy dictionary.
//! Fields missing from the dictionary fall back to the client's default.

mod expression;

pub use expression::*;

#[cfg(test)]
mod expression_test;

use serde::Deserialize;
use serde::Serialize;

use crate::PolicyError;
use crate::Value;

/// How the user key is handled on writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPolicy {
    /// Send the digest only
    #[default]
    Digest,
    /// Send and store the user key alongside the digest
    Send,
}

/// Behavior when the record already exists (or does not)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExistsPolicy {
    /// Create or update
    #[default]
    Ignore,
    /// Create only, fail if the record exists
    Create,
    /// Update only, fail if the record is missing
    Update,
    /// Replace only, fail if the record is missing
    Replace,
    /// Create, or replace all bins of an existing record
    CreateOrReplace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationPolicy {
    #[default]
    Ignore,
    /// Write only if the stored generation equals the record generation
    Eq,
    /// Write only if the record generation is greater than the stored one
    Gt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitLevel {
    #[default]
    All,
    Master,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WritePolicy {
    /// Socket idle timeout for a single attempt
    /// Default: 30 seconds
    #[serde(default = "default_socket_timeout_in_ms")]
    pub socket_timeout_in_ms: u32,

    /// Total transaction timeout, passed through to the transport
    /// Default: 1 second
    #[serde(default = "default_total_timeout_in_ms")]
    pub total_timeout_in_ms: u32,

    /// Transport level retries. The binding itself never retries.
    /// Default: 0
    #[serde(default)]
    pub max_retries: u32,

    #[serde(default)]
    pub key: KeyPolicy,

    #[serde(default)]
    pub exists: ExistsPolicy,

    #[serde(default)]
    pub generation: GenerationPolicy,

    #[serde(default)]
    pub commit_level: CommitLevel,

    #[serde(default)]
    pub durable_delete: bool,

    #[serde(default)]
    pub compress: bool,

    /// Compiled filter expression; only ever set per call
    #[serde(skip)]
    pub expression: Option<Expression>,
}

fn default_socket_timeout_in_ms() -> u32 {
    30_000
}

fn default_total_timeout_in_ms() -> u32 {
    1_000
}

impl Default for WritePolicy {
    fn default() -> Self {
        Self {
            socket_timeout_in_ms: default_socket_timeout_in_ms(),
            total_timeout_in_ms: default_total_timeout_in_ms(),
            max_retries: 0,
            key: KeyPolicy::default(),
            exists: ExistsPolicy::default(),
            generation: GenerationPolicy::default(),
            commit_level: CommitLevel::default(),
            durable_delete: false,
            compress: false,
            expression: None,
        }
    }
}

impl WritePolicy {
    /// Converts a host policy descriptor, resolving unset fields against
    /// `default`
    ///
    /// `None` and `Nil` yield a copy of `default`. A map overrides the fields
    /// it names; unknown entries are ignored. Enum fields use the host
    /// integer constants:
    /// - `key`: 0 digest, 1 send
    /// - `exists`: 0 ignore, 1 create, 2 update, 3 replace, 4 create-or-replace
    /// - `gen`: 0 ignore, 1 eq, 2 gt
    /// - `commit_level`: 0 all, 1 master
    ///
    /// # Errors
    /// - [`PolicyError::NotMap`] for any other descriptor shape
    /// - [`PolicyError::Field`] when a known field has the wrong type
    /// - [`PolicyError::OutOfRange`] for unknown enum constants or negative
    ///   timeouts
    /// - [`PolicyError::Expression`] when `expressions` does not compile
    pub fn from_value(
        descriptor: Option<&Value>,
        default: &WritePolicy,
    ) -> std::result::Result<WritePolicy, PolicyError> {
        let mut policy = default.clone();
        let fields = match descriptor {
            None | Some(Value::Nil) => return Ok(policy),
            Some(Value::Map(fields)) => fields,
            Some(other) => {
                return Err(PolicyError::NotMap {
                    found: other.type_name(),
                })
            }
        };

        if let Some(v) = fields.get("socket_timeout") {
            policy.socket_timeout_in_ms = u32_field("socket_timeout", v)?;
        }
        if let Some(v) = fields.get("total_timeout") {
            policy.total_timeout_in_ms = u32_field("total_timeout", v)?;
        }
        if let Some(v) = fields.get("max_retries") {
            policy.max_retries = u32_field("max_retries", v)?;
        }
        if let Some(v) = fields.get("key") {
            policy.key = match int_field("key", v)? {
                0 => KeyPolicy::Digest,
                1 => KeyPolicy::Send,
                other => return Err(out_of_range("key", other)),
            };
        }
        if let Some(v) = fields.get("exists") {
            policy.exists = match int_field("exists", v)? {
                0 => ExistsPolicy::Ignore,
                1 => ExistsPolicy::Create,
                2 => ExistsPolicy::Update,
                3 => ExistsPolicy::Replace,
                4 => ExistsPolicy::CreateOrReplace,
                other => return Err(out_of_range("exists", other)),
            };
        }
        if let Some(v) = fields.get("gen") {
            policy.generation = match int_field("gen", v)? {
                0 => GenerationPolicy::Ignore,
                1 => GenerationPolicy::Eq,
                2 => GenerationPolicy::Gt,
                other => return Err(out_of_range("gen", other)),
            };
        }
        if let Some(v) = fields.get("commit_level") {
            policy.commit_level = match int_field("commit_level", v)? {
                0 => CommitLevel::All,
                1 => CommitLevel::Master,
                other => return Err(out_of_range("commit_level", other)),
            };
        }
        if let Some(v) = fields.get("durable_delete") {
            policy.durable_delete = bool_field("durable_delete", v)?;
        }
        if let Some(v) = fields.get("compress") {
            policy.compress = bool_field("compress", v)?;
        }
        if let Some(v) = fields.get("expressions") {
            policy.expression = Expression::compile(v)?;
        }

        Ok(policy)
    }
}

fn int_field(
    name: &'static str,
    value: &Value,
) -> std::result::Result<i64, PolicyError> {
    value.as_int().ok_or(PolicyError::Field { name })
}

fn u32_field(
    name: &'static str,
    value: &Value,
) -> std::result::Result<u32, PolicyError> {
    let v = int_field(name, value)?;
    u32::try_from(v).map_err(|_| out_of_range(name, v))
}

/// Host booleans are integers too
fn bool_field(
    name: &'static str,
    value: &Value,
) -> std::result::Result<bool, PolicyError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Int(i) => Ok(*i != 0),
        _ => Err(PolicyError::Field { name }),
    }
}

fn out_of_range(
    name: &'static str,
    value: i64,
) -> PolicyError {
    PolicyError::OutOfRange { name, value }
}
