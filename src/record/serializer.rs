use std::fmt::Debug;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use super::BinValue;
use super::BlobKind;
use crate::RecordError;
use crate::Value;

/// Strategy used for host values the record model cannot store natively
///
/// Chosen per call; a call that does not choose falls back to the client's
/// configured default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Serializer {
    /// Reject values that need serializing
    None,
    /// bincode encoding of the host value
    #[default]
    Builtin,
    /// The user serializer registered on the client
    User,
}

/// User supplied serializer callback
pub type UserSerializer = Arc<dyn Fn(&Value) -> std::result::Result<Vec<u8>, String> + Send + Sync>;

/// A resolved serializer choice plus the user callback it may need
#[derive(Clone)]
pub struct SerializerStrategy<'a> {
    choice: Serializer,
    user: Option<&'a UserSerializer>,
}

impl Debug for SerializerStrategy<'_> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("SerializerStrategy")
            .field("choice", &self.choice)
            .field("user", &self.user.is_some())
            .finish()
    }
}

impl<'a> SerializerStrategy<'a> {
    pub fn new(
        choice: Serializer,
        user: Option<&'a UserSerializer>,
    ) -> Self {
        Self { choice, user }
    }

    pub fn choice(&self) -> Serializer {
        self.choice
    }

    /// Encodes `value`, destined for bin `bin`, as a blob
    pub(crate) fn serialize(
        &self,
        bin: &str,
        value: &Value,
    ) -> std::result::Result<BinValue, RecordError> {
        match self.choice {
            Serializer::None => Err(RecordError::Unserializable {
                bin: bin.to_string(),
                type_name: value.type_name(),
            }),
            Serializer::Builtin => bincode::serialize(value)
                .map(|data| BinValue::Blob {
                    kind: BlobKind::Builtin,
                    data,
                })
                .map_err(|e| RecordError::Serialize {
                    bin: bin.to_string(),
                    reason: e.to_string(),
                }),
            Serializer::User => {
                let user = self.user.ok_or_else(|| RecordError::NoUserSerializer {
                    bin: bin.to_string(),
                })?;
                user(value)
                    .map(|data| BinValue::Blob {
                        kind: BlobKind::User,
                        data,
                    })
                    .map_err(|reason| RecordError::Serialize {
                        bin: bin.to_string(),
                        reason,
                    })
            }
        }
    }
}

/// Decodes a blob written with [`Serializer::Builtin`]
pub fn deserialize_builtin(data: &[u8]) -> std::result::Result<Value, bincode::Error> {
    bincode::deserialize(data)
}
