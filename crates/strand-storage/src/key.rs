//! Order-preserving key encoding for `created` tuples
//!
//! Byte-wise comparison of encoded keys matches [`Created`] ordering, which
//! lets ordered key-value stores serve descending `created` scans directly.
//!
//! ## Format
//!
//! ```text
//! Int:  [0x01][8 bytes: big-endian i64 with the sign bit flipped]
//! Text: [0x02][bytes, 0x00 escaped as 0x00 0xFF][0x00 0x00]
//! ```

use strand_core::{ClockPart, Created};

const TAG_INT: u8 = 0x01;
const TAG_TEXT: u8 = 0x02;

/// Encode a tuple into an order-preserving key
pub fn encode_created(created: &Created) -> Vec<u8> {
    let mut key = Vec::with_capacity(created.len() * 9);
    for part in created.parts() {
        match part {
            ClockPart::Int(value) => {
                key.push(TAG_INT);
                key.extend_from_slice(&((*value as u64) ^ (1 << 63)).to_be_bytes());
            }
            ClockPart::Text(value) => {
                key.push(TAG_TEXT);
                for &byte in value.as_bytes() {
                    key.push(byte);
                    if byte == 0x00 {
                        key.push(0xFF);
                    }
                }
                key.extend_from_slice(&[0x00, 0x00]);
            }
        }
    }
    key
}
