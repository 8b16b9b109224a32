//! Value model for quad terms
//!
//! A [`Value`] is a named node (IRI), a blank node or a typed literal.
//! Values compare by their canonical form and order by a total order that is
//! lexicographic for strings and numeric for numeric literals. The same order
//! is reproduced byte-for-byte by the key encoding used by the indexes, so a
//! prefix scan over an index yields quads in value order.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Datatype IRI written in the canonical form of float literals
pub const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
/// Datatype IRI written in the canonical form of boolean literals
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
/// Datatype IRI written in the canonical form of timestamp literals
pub const XSD_DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";

// Key encoding tags. The numeric order of the tags is the order of the kinds.
pub(crate) const TAG_NONE: u8 = 0x00;
const TAG_IRI: u8 = 0x01;
const TAG_BLANK: u8 = 0x02;
const TAG_STRING: u8 = 0x03;
const TAG_FLOAT: u8 = 0x04;
const TAG_BOOLEAN: u8 = 0x05;
const TAG_TIMESTAMP: u8 = 0x06;

/// Value errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    /// The native value has no literal representation
    #[error("Unsupported value kind: {0}")]
    UnsupportedValueKind(String),

    /// A stored key could not be decoded
    #[error("Invalid value encoding: {0}")]
    InvalidEncoding(String),
}

pub type ValueResult<T> = Result<T, ValueError>;

/// Typed scalar literal
#[derive(Debug, Clone)]
pub enum Literal {
    String(String),
    Float(f64),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
}

impl Literal {
    fn tag(&self) -> u8 {
        match self {
            Literal::String(_) => TAG_STRING,
            Literal::Float(_) => TAG_FLOAT,
            Literal::Boolean(_) => TAG_BOOLEAN,
            Literal::Timestamp(_) => TAG_TIMESTAMP,
        }
    }

    /// Get type name as string
    pub fn type_name(&self) -> &'static str {
        match self {
            Literal::String(_) => "String",
            Literal::Float(_) => "Float",
            Literal::Boolean(_) => "Boolean",
            Literal::Timestamp(_) => "Timestamp",
        }
    }
}

/// A node or literal appearing in a quad
#[derive(Debug, Clone)]
pub enum Value {
    /// Named node identifier (opaque string)
    Iri(String),
    /// Anonymous node, identified within one store
    BlankNode(String),
    /// Typed scalar
    Literal(Literal),
}

impl Value {
    /// Create a named node
    pub fn iri(iri: impl Into<String>) -> Self {
        Value::Iri(iri.into())
    }

    /// Create a blank node with the given identifier
    pub fn blank(id: impl Into<String>) -> Self {
        Value::BlankNode(id.into())
    }

    /// Create a blank node with a fresh random identifier
    pub fn new_blank() -> Self {
        Value::BlankNode(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Create a string literal
    pub fn string(s: impl Into<String>) -> Self {
        Value::Literal(Literal::String(s.into()))
    }

    /// Create a float literal. All NaNs collapse to a single canonical NaN.
    pub fn float(f: f64) -> Self {
        Value::Literal(Literal::Float(canonical_float(f)))
    }

    /// Create a boolean literal
    pub fn boolean(b: bool) -> Self {
        Value::Literal(Literal::Boolean(b))
    }

    /// Create a timestamp literal
    pub fn timestamp(ts: DateTime<Utc>) -> Self {
        Value::Literal(Literal::Timestamp(ts))
    }

    /// Check if this is a named node
    pub fn is_iri(&self) -> bool {
        matches!(self, Value::Iri(_))
    }

    /// Check if this is a blank node
    pub fn is_blank_node(&self) -> bool {
        matches!(self, Value::BlankNode(_))
    }

    /// Check if this is a literal
    pub fn is_literal(&self) -> bool {
        matches!(self, Value::Literal(_))
    }

    /// The unquoted text of an IRI, blank node id or string literal
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Iri(s) | Value::BlankNode(s) => Some(s),
            Value::Literal(Literal::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Get float value if this is a float literal
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Literal(Literal::Float(f)) => Some(*f),
            _ => None,
        }
    }

    /// Get boolean value if this is a boolean literal
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Literal(Literal::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    /// Get timestamp value if this is a timestamp literal
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Literal(Literal::Timestamp(ts)) => Some(*ts),
            _ => None,
        }
    }

    /// Convert a JSON scalar into a literal.
    ///
    /// Strings, numbers and booleans are supported; null, arrays and objects
    /// fail with [`ValueError::UnsupportedValueKind`].
    pub fn from_json(value: serde_json::Value) -> ValueResult<Self> {
        match value {
            serde_json::Value::String(s) => Ok(Value::string(s)),
            serde_json::Value::Bool(b) => Ok(Value::boolean(b)),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(Value::float)
                .ok_or_else(|| ValueError::UnsupportedValueKind(format!("number {}", n))),
            serde_json::Value::Null => Err(ValueError::UnsupportedValueKind("null".to_string())),
            serde_json::Value::Array(_) => Err(ValueError::UnsupportedValueKind("array".to_string())),
            serde_json::Value::Object(_) => Err(ValueError::UnsupportedValueKind("object".to_string())),
        }
    }

    /// Convert a literal back into its JSON scalar.
    ///
    /// Nodes have no native scalar form and fail with
    /// [`ValueError::UnsupportedValueKind`]; timestamps become RFC 3339 strings.
    pub fn to_json(&self) -> ValueResult<serde_json::Value> {
        match self {
            Value::Literal(Literal::String(s)) => Ok(serde_json::Value::String(s.clone())),
            Value::Literal(Literal::Boolean(b)) => Ok(serde_json::Value::Bool(*b)),
            Value::Literal(Literal::Float(f)) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .ok_or_else(|| ValueError::UnsupportedValueKind(format!("float {}", f))),
            Value::Literal(Literal::Timestamp(ts)) => Ok(serde_json::Value::String(ts.to_rfc3339())),
            Value::Iri(_) => Err(ValueError::UnsupportedValueKind("iri".to_string())),
            Value::BlankNode(_) => Err(ValueError::UnsupportedValueKind("blank node".to_string())),
        }
    }

    fn tag(&self) -> u8 {
        match self {
            Value::Iri(_) => TAG_IRI,
            Value::BlankNode(_) => TAG_BLANK,
            Value::Literal(lit) => lit.tag(),
        }
    }

    /// Append the order-preserving key encoding of this value to `buf`
    pub(crate) fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.push(self.tag());
        match self {
            Value::Iri(s) | Value::BlankNode(s) | Value::Literal(Literal::String(s)) => {
                encode_bytes(s.as_bytes(), buf);
            }
            Value::Literal(Literal::Float(f)) => {
                let bits = canonical_float(*f).to_bits();
                let ordered = if bits >> 63 == 1 { !bits } else { bits ^ (1 << 63) };
                buf.extend_from_slice(&ordered.to_be_bytes());
            }
            Value::Literal(Literal::Boolean(b)) => buf.push(u8::from(*b)),
            Value::Literal(Literal::Timestamp(ts)) => {
                let secs = (ts.timestamp() as u64) ^ (1 << 63);
                buf.extend_from_slice(&secs.to_be_bytes());
                buf.extend_from_slice(&ts.timestamp_subsec_nanos().to_be_bytes());
            }
        }
    }

    /// Encode this value as a standalone key
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf);
        buf
    }

    /// Decode one value from the front of `bytes`, returning it with the
    /// number of bytes consumed.
    pub(crate) fn decode_prefix(bytes: &[u8]) -> ValueResult<(Self, usize)> {
        let (&tag, rest) = bytes
            .split_first()
            .ok_or_else(|| ValueError::InvalidEncoding("empty key".to_string()))?;
        match tag {
            TAG_IRI | TAG_BLANK | TAG_STRING => {
                let (raw, used) = decode_bytes(rest)?;
                let s = String::from_utf8(raw)
                    .map_err(|e| ValueError::InvalidEncoding(e.to_string()))?;
                let value = match tag {
                    TAG_IRI => Value::Iri(s),
                    TAG_BLANK => Value::BlankNode(s),
                    _ => Value::Literal(Literal::String(s)),
                };
                Ok((value, 1 + used))
            }
            TAG_FLOAT => {
                let ordered = u64::from_be_bytes(take::<8>(rest)?);
                let bits = if ordered >> 63 == 1 { ordered ^ (1 << 63) } else { !ordered };
                Ok((Value::Literal(Literal::Float(f64::from_bits(bits))), 9))
            }
            TAG_BOOLEAN => {
                let [b] = take::<1>(rest)?;
                Ok((Value::boolean(b != 0), 2))
            }
            TAG_TIMESTAMP => {
                let secs = (u64::from_be_bytes(take::<8>(rest)?) ^ (1 << 63)) as i64;
                let nanos = u32::from_be_bytes(take::<4>(&rest[8..])?);
                let ts = DateTime::from_timestamp(secs, nanos).ok_or_else(|| {
                    ValueError::InvalidEncoding(format!("timestamp {}.{}", secs, nanos))
                })?;
                Ok((Value::timestamp(ts), 13))
            }
            other => Err(ValueError::InvalidEncoding(format!("unknown tag {:#04x}", other))),
        }
    }

    /// Decode a standalone key produced by [`Value::encode`]
    pub fn decode(bytes: &[u8]) -> ValueResult<Self> {
        let (value, used) = Self::decode_prefix(bytes)?;
        if used != bytes.len() {
            return Err(ValueError::InvalidEncoding(format!(
                "{} trailing bytes",
                bytes.len() - used
            )));
        }
        Ok(value)
    }
}

/// Strings are escaped so that 0x00 never appears unescaped, then terminated
/// by 0x00 0x01. Escaped zero is 0x00 0xFF, which sorts after the terminator.
fn encode_bytes(raw: &[u8], buf: &mut Vec<u8>) {
    for &b in raw {
        if b == 0 {
            buf.extend_from_slice(&[0x00, 0xFF]);
        } else {
            buf.push(b);
        }
    }
    buf.extend_from_slice(&[0x00, 0x01]);
}

fn decode_bytes(bytes: &[u8]) -> ValueResult<(Vec<u8>, usize)> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != 0 {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        match bytes.get(i + 1) {
            Some(0x01) => return Ok((out, i + 2)),
            Some(0xFF) => {
                out.push(0);
                i += 2;
            }
            _ => break,
        }
    }
    Err(ValueError::InvalidEncoding("unterminated string".to_string()))
}

/// Every NaN payload and sign maps to `f64::NAN`, so literals built directly
/// from `Literal::Float` encode, compare and hash like `Value::float`
fn canonical_float(f: f64) -> f64 {
    if f.is_nan() {
        f64::NAN
    } else {
        f
    }
}

fn take<const N: usize>(bytes: &[u8]) -> ValueResult<[u8; N]> {
    bytes
        .get(..N)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| ValueError::InvalidEncoding(format!("expected {} bytes", N)))
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Iri(a), Value::Iri(b)) | (Value::BlankNode(a), Value::BlankNode(b)) => {
                a.as_bytes().cmp(b.as_bytes())
            }
            (Value::Literal(a), Value::Literal(b)) => match (a, b) {
                (Literal::String(x), Literal::String(y)) => x.as_bytes().cmp(y.as_bytes()),
                (Literal::Float(x), Literal::Float(y)) => {
                    canonical_float(*x).total_cmp(&canonical_float(*y))
                }
                (Literal::Boolean(x), Literal::Boolean(y)) => x.cmp(y),
                (Literal::Timestamp(x), Literal::Timestamp(y)) => x.cmp(y),
                _ => a.tag().cmp(&b.tag()),
            },
            _ => self.tag().cmp(&other.tag()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tag().hash(state);
        match self {
            Value::Iri(s) | Value::BlankNode(s) | Value::Literal(Literal::String(s)) => s.hash(state),
            Value::Literal(Literal::Float(f)) => canonical_float(*f).to_bits().hash(state),
            Value::Literal(Literal::Boolean(b)) => b.hash(state),
            Value::Literal(Literal::Timestamp(ts)) => ts.hash(state),
        }
    }
}

/// Canonical form: `<iri>`, `_:id`, `"text"` or `"lexical"^^<datatype>`
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Iri(iri) => write!(f, "<{}>", iri),
            Value::BlankNode(id) => write!(f, "_:{}", id),
            Value::Literal(Literal::String(s)) => {
                write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
            }
            Value::Literal(Literal::Float(x)) => {
                write!(f, "\"{}\"^^<{}>", canonical_float(*x), XSD_DOUBLE)
            }
            Value::Literal(Literal::Boolean(b)) => write!(f, "\"{}\"^^<{}>", b, XSD_BOOLEAN),
            Value::Literal(Literal::Timestamp(ts)) => {
                write!(f, "\"{}\"^^<{}>", ts.to_rfc3339(), XSD_DATE_TIME)
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// Convenience conversions
impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::string(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::float(f)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::float(f64::from(f))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::boolean(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(ts: DateTime<Utc>) -> Self {
        Value::timestamp(ts)
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = ValueError;

    fn try_from(value: serde_json::Value) -> ValueResult<Self> {
        Value::from_json(value)
    }
}
