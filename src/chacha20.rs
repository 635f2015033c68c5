//! The ChaCha20 block function.
//!
//! The 16-byte nonce/counter block is laid out as one little-endian counter word followed by three
//! nonce words, matching the state words 12 through 15.

use byteorder::{ByteOrder, LittleEndian};
use zeroize::Zeroizing;

pub const KEY_LEN: usize = 32;
pub const NONCE_COUNTER_LEN: usize = 16;
pub const BLOCK_LEN: usize = 64;

/// "expand 32-byte k" as little-endian words.
pub const CONSTANTS: [u32; 4] = [0x61707865, 0x3320646e, 0x79622d32, 0x6b206574];

const DOUBLE_ROUNDS: usize = 10;

/// Computes the keystream block for the given key and nonce/counter.
///
/// This is a pure function of its inputs. It can be used directly to derive one-time keys, e.g. by
/// taking the first 32 bytes of the block at counter 0.
pub fn block(key: &[u8; KEY_LEN], nonce_counter: &[u8; NONCE_COUNTER_LEN]) -> [u8; BLOCK_LEN] {
    let mut out = [0; BLOCK_LEN];
    write_block(key, nonce_counter, &mut out);
    out
}

/// Same as [`block`], writing into a caller-owned buffer.
pub(crate) fn write_block(
    key: &[u8; KEY_LEN],
    nonce_counter: &[u8; NONCE_COUNTER_LEN],
    out: &mut [u8; BLOCK_LEN],
) {
    let mut initial = Zeroizing::new([0u32; 16]);
    setup_state(&mut initial, key, nonce_counter);
    let mut state = Zeroizing::new([0u32; 16]);
    transform_state(&mut state, &initial);
    serialize_block(&state, out);
}

fn setup_state(state: &mut [u32; 16], key: &[u8], nonce_counter: &[u8]) {
    state[..4].copy_from_slice(&CONSTANTS);
    to_le(&mut state[4..12], key);
    to_le(&mut state[12..], nonce_counter);
}

fn transform_state(state: &mut [u32; 16], initial: &[u32; 16]) {
    state.copy_from_slice(initial);
    for _ in 0..DOUBLE_ROUNDS {
        inner_block(state);
    }
    // feedforward
    for (x, &y) in state.iter_mut().zip(initial) {
        *x = x.wrapping_add(y);
    }
}

fn inner_block(state: &mut [u32; 16]) {
    quarter_round(state, 0, 4, 8, 12);
    quarter_round(state, 1, 5, 9, 13);
    quarter_round(state, 2, 6, 10, 14);
    quarter_round(state, 3, 7, 11, 15);
    quarter_round(state, 0, 5, 10, 15);
    quarter_round(state, 1, 6, 11, 12);
    quarter_round(state, 2, 7, 8, 13);
    quarter_round(state, 3, 4, 9, 14);
}

fn quarter_round(state: &mut [u32; 16], i: usize, j: usize, k: usize, l: usize) {
    let mut a = state[i];
    let mut b = state[j];
    let mut c = state[k];
    let mut d = state[l];
    a = a.wrapping_add(b);
    d ^= a;
    d = d.rotate_left(16);
    c = c.wrapping_add(d);
    b ^= c;
    b = b.rotate_left(12);
    a = a.wrapping_add(b);
    d ^= a;
    d = d.rotate_left(8);
    c = c.wrapping_add(d);
    b ^= c;
    b = b.rotate_left(7);
    state[i] = a;
    state[j] = b;
    state[k] = c;
    state[l] = d;
}

fn to_le(words: &mut [u32], bytes: &[u8]) {
    for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(4)) {
        *word = LittleEndian::read_u32(chunk);
    }
}

fn serialize_block(block: &[u32; 16], bytes: &mut [u8; BLOCK_LEN]) {
    for (chunk, &word) in bytes.chunks_exact_mut(4).zip(block) {
        LittleEndian::write_u32(chunk, word);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; KEY_LEN] = [
        0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
        0x0f, 0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1a, 0x1b, 0x1c, 0x1d,
        0x1e, 0x1f,
    ];
    // counter 1, nonce 00:00:00:09:00:00:00:4a:00:00:00:00
    const NONCE_COUNTER: [u8; NONCE_COUNTER_LEN] = [
        0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x09, 0x00, 0x00, 0x00, 0x4a, 0x00, 0x00, 0x00,
        0x00,
    ];
    const BLOCK_ONE: [u8; BLOCK_LEN] = [
        0x10, 0xf1, 0xe7, 0xe4, 0xd1, 0x3b, 0x59, 0x15, 0x50, 0x0f, 0xdd, 0x1f, 0xa3, 0x20, 0x71,
        0xc4, 0xc7, 0xd1, 0xf4, 0xc7, 0x33, 0xc0, 0x68, 0x03, 0x04, 0x22, 0xaa, 0x9a, 0xc3, 0xd4,
        0x6c, 0x4e, 0xd2, 0x82, 0x64, 0x46, 0x07, 0x9f, 0xaa, 0x09, 0x14, 0xc2, 0xd7, 0x05, 0xd9,
        0x8b, 0x02, 0xa2, 0xb5, 0x12, 0x9c, 0xd1, 0xde, 0x16, 0x4e, 0xb9, 0xcb, 0xd0, 0x83, 0xe8,
        0xa2, 0x50, 0x3c, 0x4e,
    ];
    const SETUP_STATE: [u32; 16] = [
        0x61707865, 0x3320646e, 0x79622d32, 0x6b206574, 0x03020100, 0x07060504, 0x0b0a0908,
        0x0f0e0d0c, 0x13121110, 0x17161514, 0x1b1a1918, 0x1f1e1d1c, 0x00000001, 0x09000000,
        0x4a000000, 0x00000000,
    ];
    const FINAL_STATE: [u32; 16] = [
        0xe4e7f110, 0x15593bd1, 0x1fdd0f50, 0xc47120a3, 0xc7f4d1c7, 0x0368c033, 0x9aaa2204,
        0x4e6cd4c3, 0x466482d2, 0x09aa9f07, 0x05d7c214, 0xa2028bd9, 0xd19c12b5, 0xb94e16de,
        0xe883d0cb, 0x4e3c50a2,
    ];

    #[test]
    fn test_block() {
        assert_eq!(BLOCK_ONE[..], block(&KEY, &NONCE_COUNTER)[..]);
    }

    #[test]
    fn test_block_zero_key() {
        let expected = hex::decode(
            "76b8e0ada0f13d90405d6ae55386bd28bdd219b8a08ded1aa836efcc8b770dc7\
             da41597c5157488d7724e03fb8d84a376a43b8f41518a11cc387b669b2ee6586",
        )
        .unwrap();
        assert_eq!(expected[..], block(&[0; KEY_LEN], &[0; NONCE_COUNTER_LEN])[..]);
    }

    #[test]
    fn test_block_is_deterministic() {
        assert_eq!(
            block(&KEY, &NONCE_COUNTER)[..],
            block(&KEY, &NONCE_COUNTER)[..]
        );
        let mut other = NONCE_COUNTER;
        other[0] = 2;
        assert_ne!(block(&KEY, &NONCE_COUNTER)[..], block(&KEY, &other)[..]);
    }

    #[test]
    fn test_write_block_overwrites() {
        let mut out = [0xff; BLOCK_LEN];
        write_block(&KEY, &NONCE_COUNTER, &mut out);
        assert_eq!(BLOCK_ONE[..], out[..]);
    }

    #[test]
    fn test_setup_state() {
        let mut state = [0; 16];
        setup_state(&mut state, &KEY, &NONCE_COUNTER);
        assert_eq!(SETUP_STATE, state);
    }

    #[test]
    fn test_transform_state() {
        let mut state = [0; 16];
        transform_state(&mut state, &SETUP_STATE);
        assert_eq!(FINAL_STATE, state);
    }

    #[test]
    fn test_inner_block() {
        let mut state = SETUP_STATE;
        for _ in 0..DOUBLE_ROUNDS {
            inner_block(&mut state);
        }
        assert_eq!(
            [
                0x837778ab, 0xe238d763, 0xa67ae21e, 0x5950bb2f, 0xc4f2d0c7, 0xfc62bb2f, 0x8fa018fc,
                0x3f5ec7b7, 0x335271c2, 0xf29489f3, 0xeabda8fc, 0x82e46ebd, 0xd19c12b4, 0xb04e16de,
                0x9e83d0cb, 0x4e3c50a2,
            ],
            state
        );
    }

    #[test]
    fn test_quarter_round() {
        let mut state = [0; 16];
        state[0] = 0x11111111;
        state[1] = 0x01020304;
        state[2] = 0x9b8d6f43;
        state[3] = 0x01234567;
        quarter_round(&mut state, 0, 1, 2, 3);
        assert_eq!([0xea2a92f4, 0xcb1cf8ce, 0x4581472e, 0x5881c4bb], state[..4]);

        state = [
            0x879531e0, 0xc5ecf37d, 0x516461b1, 0xc9a62f8a, 0x44c20ef3, 0x3390af7f, 0xd9fc690b,
            0x2a5f714c, 0x53372767, 0xb00a5631, 0x974c541a, 0x359e9963, 0x5c971061, 0x3d631689,
            0x2098d9d6, 0x91dbd320,
        ];
        quarter_round(&mut state, 2, 7, 8, 13);
        assert_eq!(
            [
                0x879531e0, 0xc5ecf37d, 0xbdb886dc, 0xc9a62f8a, 0x44c20ef3, 0x3390af7f, 0xd9fc690b,
                0xcfacafd2, 0xe46bea80, 0xb00a5631, 0x974c541a, 0x359e9963, 0x5c971061, 0xccc07c79,
                0x2098d9d6, 0x91dbd320,
            ],
            state
        );
    }

    #[test]
    fn test_to_le() {
        let mut key = [0; 8];
        to_le(&mut key, &KEY);
        assert_eq!(
            [
                0x03020100, 0x07060504, 0x0b0a0908, 0x0f0e0d0c, 0x13121110, 0x17161514, 0x1b1a1918,
                0x1f1e1d1c,
            ],
            key
        );

        let mut nonce_counter = [0; 4];
        to_le(&mut nonce_counter, &NONCE_COUNTER);
        assert_eq!([0x00000001, 0x09000000, 0x4a000000, 0x00000000], nonce_counter);
    }

    #[test]
    fn test_serialize_block() {
        let mut bytes = [0; BLOCK_LEN];
        serialize_block(&FINAL_STATE, &mut bytes);
        assert_eq!(BLOCK_ONE[..], bytes[..]);
    }
}
