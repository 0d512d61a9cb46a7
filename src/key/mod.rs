//! Record identifiers
//!
//! A [`Key`] names one record: namespace, optional set, and a user key or a
//! precomputed digest. Hosts pass keys either as a tuple
//! `(ns, set, key[, digest])` or as a dict `{"ns", "set", "key", "digest"}`.


use crate::partition::partition_id;
use crate::partition::DIGEST_VALUE_SIZE;
use crate::KeyError;
use crate::Value;

pub const NAMESPACE_MAX_LEN: usize = 31;
pub const SET_MAX_LEN: usize = 63;

pub type Digest = [u8; DIGEST_VALUE_SIZE];

static NIL: Value = Value::Nil;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UserKey {
    Int(i64),
    Str(String),
    Bytes(Vec<u8>),
}

impl From<&UserKey> for Value {
    fn from(key: &UserKey) -> Self {
        match key {
            UserKey::Int(i) => Value::Int(*i),
            UserKey::Str(s) => Value::Str(s.clone()),
            UserKey::Bytes(b) => Value::Bytes(b.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    namespace: String,
    set: Option<String>,
    user_key: Option<UserKey>,
    digest: Option<Digest>,
}

impl Key {
    pub fn new(
        namespace: impl Into<String>,
        set: Option<String>,
        user_key: UserKey,
    ) -> std::result::Result<Self, KeyError> {
        let key = Self {
            namespace: namespace.into(),
            set,
            user_key: Some(user_key),
            digest: None,
        };
        key.validate()?;
        Ok(key)
    }

    pub fn with_digest(
        namespace: impl Into<String>,
        set: Option<String>,
        digest: Digest,
    ) -> std::result::Result<Self, KeyError> {
        let key = Self {
            namespace: namespace.into(),
            set,
            user_key: None,
            digest: Some(digest),
        };
        key.validate()?;
        Ok(key)
    }

    /// Converts a host key descriptor
    ///
    /// # Errors
    /// Any [`KeyError`]; every one of them maps to a `PARAM` result.
    pub fn from_value(descriptor: &Value) -> std::result::Result<Self, KeyError> {
        let (ns, set, user_key, digest) = match descriptor {
            Value::Tuple(parts) | Value::List(parts) => {
                let at = |i: usize| parts.get(i).unwrap_or(&NIL);
                (at(0), at(1), at(2), at(3))
            }
            Value::Map(_) => {
                let at = |name: &str| descriptor.get(name).unwrap_or(&NIL);
                (at("ns"), at("set"), at("key"), at("digest"))
            }
            other => {
                return Err(KeyError::InvalidShape {
                    found: other.type_name(),
                })
            }
        };

        let namespace = ns.as_str().ok_or(KeyError::Namespace)?.to_string();

        let set = match set {
            Value::Nil => None,
            Value::Str(s) if s.is_empty() => None,
            Value::Str(s) => Some(s.clone()),
            _ => return Err(KeyError::Set),
        };

        let user_key = match user_key {
            Value::Nil => None,
            Value::Int(i) => Some(UserKey::Int(*i)),
            Value::Str(s) => Some(UserKey::Str(s.clone())),
            Value::Bytes(b) => Some(UserKey::Bytes(b.clone())),
            other => {
                return Err(KeyError::UserKey {
                    found: other.type_name(),
                })
            }
        };

        let digest = match digest {
            Value::Nil => None,
            Value::Bytes(b) => Some(Digest::try_from(b.as_slice()).map_err(|_| KeyError::Digest {
                expected: DIGEST_VALUE_SIZE,
            })?),
            _ => {
                return Err(KeyError::Digest {
                    expected: DIGEST_VALUE_SIZE,
                })
            }
        };

        let key = Self {
            namespace,
            set,
            user_key,
            digest,
        };
        key.validate()?;
        Ok(key)
    }

    fn validate(&self) -> std::result::Result<(), KeyError> {
        if self.namespace.is_empty() {
            return Err(KeyError::Namespace);
        }
        if self.namespace.len() > NAMESPACE_MAX_LEN {
            return Err(KeyError::NamespaceTooLong {
                len: self.namespace.len(),
                max: NAMESPACE_MAX_LEN,
            });
        }
        if let Some(set) = &self.set {
            if set.len() > SET_MAX_LEN {
                return Err(KeyError::SetTooLong {
                    len: set.len(),
                    max: SET_MAX_LEN,
                });
            }
        }
        if self.user_key.is_none() && self.digest.is_none() {
            return Err(KeyError::MissingKeyOrDigest);
        }
        Ok(())
    }

    /// Host representation: `{"ns", "set", "key"}` plus `"digest"` when the
    /// digest is known. Missing set and user key are `Nil`.
    pub fn to_value(&self) -> Value {
        let mut entries = vec![
            ("ns", Value::Str(self.namespace.clone())),
            ("set", Value::from(self.set.clone())),
            ("key", self.user_key.as_ref().map(Value::from).unwrap_or_default()),
        ];
        if let Some(digest) = &self.digest {
            entries.push(("digest", Value::Bytes(digest.to_vec())));
        }
        Value::map(entries)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn set(&self) -> Option<&str> {
        self.set.as_deref()
    }

    pub fn user_key(&self) -> Option<&UserKey> {
        self.user_key.as_ref()
    }

    pub fn digest(&self) -> Option<&Digest> {
        self.digest.as_ref()
    }

    /// Partition owning this key, when the digest is known
    pub fn partition_id(&self) -> Option<u16> {
        self.digest.as_ref().map(partition_id)
    }
}
