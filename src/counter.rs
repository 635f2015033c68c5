//! Block counter arithmetic over the nonce/counter block.

use byteorder::{ByteOrder, LittleEndian};

use crate::chacha20::NONCE_COUNTER_LEN;
use crate::{Error, Result};

/// Offset of the block counter within the nonce/counter block.
pub const COUNTER_POS: usize = 0;
/// Width in bytes of the block counter.
pub const COUNTER_LEN: usize = 4;

/// Adds one to the little-endian counter stored in `buf[pos..pos + len]`.
///
/// # Overflow Behavior
///
/// If the counter is already at its maximum, `buf` is left as it was and
/// [`Error::CounterOverflow`] is returned. A wrapped counter would repeat keystream.
pub fn increment_counter(buf: &mut [u8], pos: usize, len: usize) -> Result<()> {
    let end = match pos.checked_add(len) {
        Some(end) if end <= buf.len() => end,
        _ => {
            return Err(Error::InvalidCounterRange {
                pos,
                len,
                buf: buf.len(),
            })
        }
    };
    let counter = &mut buf[pos..end];
    if counter.iter().all(|&b| b == 0xff) {
        return Err(Error::CounterOverflow { processed: 0 });
    }
    let mut carry = 1u16;
    for byte in counter.iter_mut() {
        carry += u16::from(*byte);
        *byte = carry as u8;
        carry >>= 8;
    }
    debug_assert_eq!(0, carry);
    Ok(())
}

/// Advances the block counter of a nonce/counter block by one.
pub fn increment(nonce_counter: &mut [u8; NONCE_COUNTER_LEN]) -> Result<()> {
    increment_counter(nonce_counter, COUNTER_POS, COUNTER_LEN)
}

/// Reads the block counter.
pub fn counter(nonce_counter: &[u8; NONCE_COUNTER_LEN]) -> u32 {
    LittleEndian::read_u32(&nonce_counter[COUNTER_POS..COUNTER_POS + COUNTER_LEN])
}

/// Positions the block counter, leaving the nonce words alone.
pub fn set_counter(nonce_counter: &mut [u8; NONCE_COUNTER_LEN], value: u32) {
    LittleEndian::write_u32(
        &mut nonce_counter[COUNTER_POS..COUNTER_POS + COUNTER_LEN],
        value,
    );
}
