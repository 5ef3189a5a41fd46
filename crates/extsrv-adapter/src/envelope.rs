//! Self-describing message envelopes.
//!
//! An [`Envelope`] pairs the serialized bytes of a message with a type URL
//! (`type.googleapis.com/<full name>`). It has the same wire layout as
//! `google.protobuf.Any`, so hosts can hand it straight to their protobuf
//! runtime.

use prost::{Message, Name};

/// Prefix of every type URL produced by [`to_envelope`].
pub const TYPE_URL_PREFIX: &str = "type.googleapis.com/";

/// Protobuf's hard ceiling for a single encoded message (2 GiB - 1).
pub const MAX_MESSAGE_BYTES: usize = i32::MAX as usize;

/// A type URL plus the serialized message it names.
#[derive(Clone, PartialEq, Eq, Hash, prost::Message)]
pub struct Envelope {
    #[prost(string, tag = "1")]
    pub type_url: String,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
}

/// Why a message could not be serialized.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("encoded size {size} exceeds limit {max}")]
    TooLarge { size: usize, max: usize },

    #[error(transparent)]
    Encode(#[from] prost::EncodeError),

    /// Failure reported by a hand-written [`Serializable`] implementation.
    #[error("{0}")]
    Custom(Box<dyn std::error::Error + Send + Sync>),
}

/// Errors from building or opening an envelope.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// The message could not be serialized; no envelope was produced.
    #[error("failed to serialize {type_name} into an envelope: {source}")]
    SerializationFailed {
        type_name: String,
        #[source]
        source: SerializeError,
    },

    /// The envelope holds a different message type than requested.
    #[error("envelope holds {actual}, expected {expected}")]
    TypeMismatch { expected: String, actual: String },

    /// The type matched but the bytes did not decode.
    #[error("failed to decode {type_url}: {source}")]
    DecodeFailed {
        type_url: String,
        #[source]
        source: prost::DecodeError,
    },
}

/// A message that knows its fully-qualified type name and its canonical bytes.
///
/// Every generated-style protobuf type (`prost::Message + prost::Name`) gets
/// this for free. Implement it by hand only for types that serialize some
/// other way.
pub trait Serializable {
    /// Fully-qualified type name, e.g. `grpc.health.v1.HealthCheckResponse`.
    fn type_name(&self) -> String;

    /// Canonical, deterministic binary encoding.
    fn serialize(&self) -> Result<Vec<u8>, SerializeError>;
}

impl<M: Message + Name> Serializable for M {
    fn type_name(&self) -> String {
        M::full_name()
    }

    fn serialize(&self) -> Result<Vec<u8>, SerializeError> {
        let size = self.encoded_len();
        if size > MAX_MESSAGE_BYTES {
            return Err(SerializeError::TooLarge {
                size,
                max: MAX_MESSAGE_BYTES,
            });
        }
        let mut buf = Vec::with_capacity(size);
        self.encode(&mut buf)?;
        Ok(buf)
    }
}

/// Wrap `msg` in an envelope.
pub fn to_envelope<M: Serializable + ?Sized>(msg: &M) -> Result<Envelope, EnvelopeError> {
    to_envelope_within(msg, MAX_MESSAGE_BYTES)
}

/// Wrap `msg` in an envelope whose payload is at most `max_bytes` long.
pub fn to_envelope_within<M: Serializable + ?Sized>(
    msg: &M,
    max_bytes: usize,
) -> Result<Envelope, EnvelopeError> {
    let type_name = msg.type_name();
    let value = msg
        .serialize()
        .and_then(|value| {
            if value.len() > max_bytes {
                Err(SerializeError::TooLarge {
                    size: value.len(),
                    max: max_bytes,
                })
            } else {
                Ok(value)
            }
        })
        .map_err(|source| EnvelopeError::SerializationFailed {
            type_name: type_name.clone(),
            source,
        })?;

    Ok(Envelope {
        type_url: format!("{TYPE_URL_PREFIX}{type_name}"),
        value,
    })
}

impl Envelope {
    /// Type name without the URL prefix.
    ///
    /// Like `google.protobuf.Any`, anything up to the last `/` is treated as
    /// the prefix.
    pub fn type_name(&self) -> &str {
        self.type_url
            .rsplit_once('/')
            .map_or(self.type_url.as_str(), |(_, name)| name)
    }

    /// True when the envelope holds an `M`.
    pub fn is<M: Name>(&self) -> bool {
        self.type_name() == M::full_name()
    }

    /// Decode the wrapped message as an `M`.
    pub fn unpack<M: Message + Name + Default>(&self) -> Result<M, EnvelopeError> {
        if !self.is::<M>() {
            return Err(EnvelopeError::TypeMismatch {
                expected: M::full_name(),
                actual: self.type_name().to_string(),
            });
        }
        M::decode(self.value.as_slice()).map_err(|source| EnvelopeError::DecodeFailed {
            type_url: self.type_url.clone(),
            source,
        })
    }
}
