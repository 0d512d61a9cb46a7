//! Record model and bin conversion
//!
//! Converts the host's bin dictionary and metadata into a [`Record`]. Host
//! values with no native bin type go through the caller's
//! [`SerializerStrategy`].

mod serializer;

pub use serializer::*;


use crate::RecordError;
use crate::Value;

/// Longest bin name the store accepts
pub const BIN_NAME_MAX_LEN: usize = 15;

/// Use the namespace default TTL
pub const TTL_NAMESPACE_DEFAULT: u32 = 0;
/// Host value `-1`
pub const TTL_NEVER_EXPIRE: u32 = u32::MAX;
/// Host value `-2`
pub const TTL_DONT_UPDATE: u32 = u32::MAX - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobKind {
    Builtin,
    User,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BinValue {
    /// Removes the bin on write
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Blob { kind: BlobKind, data: Vec<u8> },
    List(Vec<BinValue>),
    Map(Vec<(BinValue, BinValue)>),
}

impl BinValue {
    /// Rough wire footprint, used for record size limits
    pub fn estimated_size(&self) -> usize {
        match self {
            BinValue::Nil => 1,
            BinValue::Bool(_) => 1,
            BinValue::Int(_) | BinValue::Float(_) => 8,
            BinValue::Str(s) => s.len(),
            BinValue::Bytes(b) => b.len(),
            BinValue::Blob { data, .. } => data.len() + 1,
            BinValue::List(items) => 4 + items.iter().map(BinValue::estimated_size).sum::<usize>(),
            BinValue::Map(entries) => {
                4 + entries
                    .iter()
                    .map(|(k, v)| k.estimated_size() + v.estimated_size())
                    .sum::<usize>()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bin {
    pub name: String,
    pub value: BinValue,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub bins: Vec<Bin>,
    pub ttl: u32,
    /// Expected generation, checked when the policy asks for it
    pub generation: u16,
}

impl Record {
    /// Builds a record from the host's bins and optional metadata
    ///
    /// # Errors
    /// - [`RecordError::BinsNotMap`] if `bins` is not a dict
    /// - [`RecordError::BinNameTooLong`] for names over [`BIN_NAME_MAX_LEN`]
    /// - [`RecordError::MetaNotMap`], [`RecordError::Ttl`],
    ///   [`RecordError::Generation`] for malformed metadata
    /// - serializer errors for values that need serializing
    pub fn from_values(
        bins: &Value,
        meta: Option<&Value>,
        serializer: &SerializerStrategy<'_>,
    ) -> std::result::Result<Record, RecordError> {
        let entries = bins.as_map().ok_or(RecordError::BinsNotMap {
            found: bins.type_name(),
        })?;

        let mut record = Record::default();
        for (name, value) in entries {
            if name.len() > BIN_NAME_MAX_LEN {
                return Err(RecordError::BinNameTooLong {
                    name: name.clone(),
                    max: BIN_NAME_MAX_LEN,
                });
            }
            record.bins.push(Bin {
                name: name.clone(),
                value: to_bin_value(name, value, serializer)?,
            });
        }

        if let Some(meta) = meta {
            record.apply_meta(meta)?;
        }
        Ok(record)
    }

    fn apply_meta(
        &mut self,
        meta: &Value,
    ) -> std::result::Result<(), RecordError> {
        let fields = match meta {
            Value::Nil => return Ok(()),
            Value::Map(fields) => fields,
            _ => return Err(RecordError::MetaNotMap),
        };

        if let Some(ttl) = fields.get("ttl") {
            self.ttl = match ttl.as_int().ok_or(RecordError::Ttl)? {
                -1 => TTL_NEVER_EXPIRE,
                -2 => TTL_DONT_UPDATE,
                v => u32::try_from(v)
                    .ok()
                    .filter(|v| *v < TTL_DONT_UPDATE)
                    .ok_or(RecordError::Ttl)?,
            };
        }
        if let Some(gen) = fields.get("gen") {
            let gen = gen.as_int().ok_or(RecordError::Generation)?;
            self.generation = u16::try_from(gen).map_err(|_| RecordError::Generation)?;
        }
        Ok(())
    }

    pub fn bin(
        &self,
        name: &str,
    ) -> Option<&BinValue> {
        self.bins.iter().find(|b| b.name == name).map(|b| &b.value)
    }

    pub fn estimated_size(&self) -> usize {
        self.bins
            .iter()
            .map(|b| b.name.len() + b.value.estimated_size())
            .sum()
    }
}

fn to_bin_value(
    bin: &str,
    value: &Value,
    serializer: &SerializerStrategy<'_>,
) -> std::result::Result<BinValue, RecordError> {
    Ok(match value {
        Value::Nil => BinValue::Nil,
        Value::Bool(b) => BinValue::Bool(*b),
        Value::Int(i) => BinValue::Int(*i),
        Value::Float(f) => BinValue::Float(*f),
        Value::Str(s) => BinValue::Str(s.clone()),
        Value::Bytes(b) => BinValue::Bytes(b.clone()),
        Value::List(items) => BinValue::List(
            items
                .iter()
                .map(|v| to_bin_value(bin, v, serializer))
                .collect::<std::result::Result<_, _>>()?,
        ),
        Value::Map(entries) => BinValue::Map(
            entries
                .iter()
                .map(|(k, v)| Ok((BinValue::Str(k.clone()), to_bin_value(bin, v, serializer)?)))
                .collect::<std::result::Result<_, RecordError>>()?,
        ),
        Value::Tuple(_) => serializer.serialize(bin, value)?,
    })
}

/// Converts values that have a native bin representation, `None` otherwise
pub(crate) fn native_bin_value(value: &Value) -> Option<BinValue> {
    to_bin_value("", value, &SerializerStrategy::new(Serializer::None, None)).ok()
}
