//! ChaCha20 stream cipher engine.
//!
//! Takes a 32-byte key and a 16-byte nonce/counter block (a little-endian 32-bit block counter
//! followed by a 96-bit nonce) and XORs arbitrary-length input with the keystream, one 64-byte
//! block at a time. No authentication is provided; pair it with a MAC.

use thiserror::Error as DeriveError;

pub mod chacha20;
pub mod counter;
pub mod stream;

pub use crate::chacha20::{block, BLOCK_LEN, KEY_LEN, NONCE_COUNTER_LEN};
pub use crate::stream::{
    keystream, stream_xor, stream_xor_in_place, stream_xor_with_scratch, ChaCha20,
};

#[derive(DeriveError, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("key must be 32 bytes, got {0}")]
    InvalidKeyLength(usize),
    #[error("nonce/counter block must be 16 bytes, got {0}")]
    InvalidNonceCounterLength(usize),
    #[error("output of {output} bytes is shorter than input of {input} bytes")]
    OutputTooShort { input: usize, output: usize },
    #[error("counter range {pos}+{len} does not fit in a {buf}-byte buffer")]
    InvalidCounterRange { pos: usize, len: usize, buf: usize },
    #[error("ChaCha: counter overflow after {processed} bytes")]
    CounterOverflow { processed: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
