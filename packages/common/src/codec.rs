//! Wire encoding for protocol objects.
//!
//! Everything on the wire is borsh: little-endian integers, `u32` length
//! prefixes on strings, byte vectors and lists, fixed-size arrays written
//! raw. Field order is part of the format. Decoding goes through
//! [`borsh::from_slice`], which rejects truncated input, trailing bytes,
//! invalid UTF-8 and unknown status codes, so every accepted byte string
//! re-encodes to itself.

use borsh::{BorshDeserialize, BorshSerialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum CodecError {
    #[error("Malformed encoding: {reason}")]
    Malformed { reason: String },
}

impl From<borsh::io::Error> for CodecError {
    fn from(err: borsh::io::Error) -> Self {
        CodecError::Malformed {
            reason: err.to_string(),
        }
    }
}

pub trait Encode {
    fn encode(&self) -> Vec<u8>;
}

impl<T: BorshSerialize + ?Sized> Encode for T {
    fn encode(&self) -> Vec<u8> {
        // Writing into a Vec only fails for collections longer than u32::MAX
        borsh::to_vec(self).expect("in-memory borsh encoding")
    }
}

pub trait Decode: Sized {
    /// Decode a complete value; trailing bytes are an error.
    fn decode(bytes: &[u8]) -> Result<Self, CodecError>;
}

impl<T: BorshDeserialize> Decode for T {
    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(borsh::from_slice(bytes)?)
    }
}
