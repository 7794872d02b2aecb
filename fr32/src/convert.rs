/// The amount of bits of raw data carried by one Fr32 element.
pub const FR32_DATA_BITS: u64 = 254;
/// The amount of bits one Fr32 element occupies once padded.
pub const FR32_ELEMENT_BITS: u64 = 256;

/// Array whose little-endian value represents an Fr.
pub type Fr32Ary = [u8; 32];

/// Converts an amount of padded bytes into the amount of raw bytes they carry.
///
/// Every full 32-byte element contributes 254 bits; a trailing partial element
/// contributes its bits up to the 254-bit limit. Partial raw bytes are dropped.
pub fn to_unpadded_bytes(padded_bytes: u64) -> u64 {
    let elements = padded_bytes / 32;
    let rest_bits = ((padded_bytes % 32) * 8).min(FR32_DATA_BITS);

    (elements * FR32_DATA_BITS + rest_bits) / 8
}

/// Converts an amount of raw bytes into the amount of padded bytes needed to hold them.
pub fn to_padded_bytes(unpadded_bytes: u64) -> u64 {
    let bits = unpadded_bytes * 8;
    let elements = bits / FR32_DATA_BITS;
    let rest_bits = bits % FR32_DATA_BITS;

    let padded_bits = elements * FR32_ELEMENT_BITS + rest_bits;
    (padded_bits + 7) / 8
}

/// Zeroes the two most significant bits of a little-endian 32-byte value, so it is
/// guaranteed to be a valid Fr.
#[inline]
pub fn trim_to_fr32(le_bytes: &mut Fr32Ary) {
    le_bytes[31] &= 0b0011_1111;
}
