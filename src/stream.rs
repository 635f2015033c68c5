//! Streaming XOR over arbitrary-length input, one 64-byte keystream block at a time.
//!
//! Encryption and decryption are the same operation. Every call advances the block counter in the
//! caller's nonce/counter block once per window processed (a partial final window included), so a
//! follow-up call with the same nonce/counter block continues the keystream where the previous call
//! stopped.
//!
//! A (key, nonce) pair must never be used for two different messages. Nothing here can detect that;
//! it is up to the caller.

use std::cmp;
use std::convert::TryFrom;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::chacha20::{self, BLOCK_LEN, KEY_LEN, NONCE_COUNTER_LEN};
use crate::counter;
use crate::{Error, Result};

/// Keystream block that is wiped however the driver returns.
struct Scratch<'a>(&'a mut [u8; BLOCK_LEN]);

impl Drop for Scratch<'_> {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// XORs `input` with the keystream into the first `input.len()` bytes of `output`.
///
/// Returns the number of bytes processed. On [`Error::CounterOverflow`], `processed` bytes of
/// `output` are valid and the counter is left at its maximum.
pub fn stream_xor(
    key: &[u8],
    nonce_counter: &mut [u8],
    input: &[u8],
    output: &mut [u8],
) -> Result<usize> {
    let (key, nonce_counter) = check_params(key, nonce_counter)?;
    let mut scratch = [0; BLOCK_LEN];
    stream_xor_with_scratch(key, nonce_counter, input, output, &mut scratch)
}

/// Like [`stream_xor`], with input and output sharing `buf`.
pub fn stream_xor_in_place(key: &[u8], nonce_counter: &mut [u8], buf: &mut [u8]) -> Result<usize> {
    let (key, nonce_counter) = check_params(key, nonce_counter)?;
    let mut scratch = [0; BLOCK_LEN];
    xor_in_place(key, nonce_counter, buf, &mut scratch)
}

/// Fills `output` with raw keystream.
pub fn keystream(key: &[u8], nonce_counter: &mut [u8], output: &mut [u8]) -> Result<usize> {
    let (key, nonce_counter) = check_params(key, nonce_counter)?;
    let mut scratch = [0; BLOCK_LEN];
    fill(key, nonce_counter, output, &mut scratch)
}

/// The driver behind [`stream_xor`], using a caller-supplied keystream block.
///
/// `scratch` holds all zeros when this returns, on success and on error alike.
pub fn stream_xor_with_scratch(
    key: &[u8; KEY_LEN],
    nonce_counter: &mut [u8; NONCE_COUNTER_LEN],
    input: &[u8],
    output: &mut [u8],
    scratch: &mut [u8; BLOCK_LEN],
) -> Result<usize> {
    if output.len() < input.len() {
        return Err(Error::OutputTooShort {
            input: input.len(),
            output: output.len(),
        });
    }
    drive(key, nonce_counter, input.len(), scratch, |offset, keystream| {
        let end = offset + keystream.len();
        for (o, (x, y)) in output[offset..end]
            .iter_mut()
            .zip(input[offset..end].iter().zip(keystream))
        {
            *o = x ^ y;
        }
    })
}

fn xor_in_place(
    key: &[u8; KEY_LEN],
    nonce_counter: &mut [u8; NONCE_COUNTER_LEN],
    buf: &mut [u8],
    scratch: &mut [u8; BLOCK_LEN],
) -> Result<usize> {
    let len = buf.len();
    drive(key, nonce_counter, len, scratch, |offset, keystream| {
        for (x, y) in buf[offset..].iter_mut().zip(keystream) {
            *x ^= y;
        }
    })
}

fn fill(
    key: &[u8; KEY_LEN],
    nonce_counter: &mut [u8; NONCE_COUNTER_LEN],
    output: &mut [u8],
    scratch: &mut [u8; BLOCK_LEN],
) -> Result<usize> {
    for byte in output.iter_mut() {
        *byte = 0;
    }
    xor_in_place(key, nonce_counter, output, scratch)
}

/// Runs the block function over `len` bytes in 64-byte windows, handing each window's offset and
/// keystream (truncated for a partial final window) to `apply`.
fn drive<F>(
    key: &[u8; KEY_LEN],
    nonce_counter: &mut [u8; NONCE_COUNTER_LEN],
    len: usize,
    scratch: &mut [u8; BLOCK_LEN],
    mut apply: F,
) -> Result<usize>
where
    F: FnMut(usize, &[u8]),
{
    log::trace!("chacha20: processing {} bytes", len);
    let mut scratch = Scratch(scratch);
    let mut offset = 0;
    while offset < len {
        chacha20::write_block(key, nonce_counter, &mut *scratch.0);
        let window = cmp::min(BLOCK_LEN, len - offset);
        apply(offset, &scratch.0[..window]);
        offset += window;
        counter::increment(nonce_counter).map_err(|err| match err {
            Error::CounterOverflow { .. } => {
                log::debug!("chacha20: block counter exhausted after {} bytes", offset);
                Error::CounterOverflow { processed: offset }
            }
            other => other,
        })?;
    }
    Ok(len)
}

fn check_params<'a, 'b>(
    key: &'a [u8],
    nonce_counter: &'b mut [u8],
) -> Result<(&'a [u8; KEY_LEN], &'b mut [u8; NONCE_COUNTER_LEN])> {
    let key = <&[u8; KEY_LEN]>::try_from(key).map_err(|_| Error::InvalidKeyLength(key.len()))?;
    let len = nonce_counter.len();
    let nonce_counter = <&mut [u8; NONCE_COUNTER_LEN]>::try_from(nonce_counter)
        .map_err(|_| Error::InvalidNonceCounterLength(len))?;
    Ok((key, nonce_counter))
}

/// A ChaCha20 cipher that owns its key and nonce/counter block.
///
/// Successive calls continue the keystream, so a message can be processed in pieces. Key material
/// is wiped on drop.
///
/// # Overflow Behavior
///
/// The block counter covers 2^32 blocks (256 GiB). Once a call fails with
/// [`Error::CounterOverflow`], the cipher is exhausted and every later call fails the same way.
#[derive(Zeroize)]
pub struct ChaCha20 {
    key: [u8; KEY_LEN],
    nonce_counter: [u8; NONCE_COUNTER_LEN],
    exhausted: bool,
}

impl ChaCha20 {
    pub fn new(key: &[u8], nonce_counter: &[u8]) -> Result<Self> {
        if key.len() != KEY_LEN {
            return Err(Error::InvalidKeyLength(key.len()));
        }
        if nonce_counter.len() != NONCE_COUNTER_LEN {
            return Err(Error::InvalidNonceCounterLength(nonce_counter.len()));
        }
        let mut cipher = Self {
            key: [0; KEY_LEN],
            nonce_counter: [0; NONCE_COUNTER_LEN],
            exhausted: false,
        };
        cipher.key.copy_from_slice(key);
        cipher.nonce_counter.copy_from_slice(nonce_counter);
        Ok(cipher)
    }

    pub fn apply_keystream(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.check_exhausted()?;
        let mut scratch = [0; BLOCK_LEN];
        let result = xor_in_place(&self.key, &mut self.nonce_counter, buf, &mut scratch);
        self.record(result)
    }

    pub fn xor_into(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        self.check_exhausted()?;
        let mut scratch = [0; BLOCK_LEN];
        let result = stream_xor_with_scratch(
            &self.key,
            &mut self.nonce_counter,
            input,
            output,
            &mut scratch,
        );
        self.record(result)
    }

    pub fn fill_keystream(&mut self, output: &mut [u8]) -> Result<usize> {
        self.check_exhausted()?;
        let mut scratch = [0; BLOCK_LEN];
        let result = fill(&self.key, &mut self.nonce_counter, output, &mut scratch);
        self.record(result)
    }

    pub fn nonce_counter(&self) -> &[u8; NONCE_COUNTER_LEN] {
        &self.nonce_counter
    }

    pub fn counter(&self) -> u32 {
        counter::counter(&self.nonce_counter)
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    fn check_exhausted(&self) -> Result<()> {
        if self.exhausted {
            Err(Error::CounterOverflow { processed: 0 })
        } else {
            Ok(())
        }
    }

    fn record(&mut self, result: Result<usize>) -> Result<usize> {
        if let Err(Error::CounterOverflow { .. }) = result {
            self.exhausted = true;
        }
        result
    }
}

impl Drop for ChaCha20 {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl ZeroizeOnDrop for ChaCha20 {}
