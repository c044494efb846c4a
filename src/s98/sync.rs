//! S98 sync (delta time) encoding

/// S98 dump commands
pub mod cmd {
    /// Wait one sync unit
    pub const SYNC: u8 = 0xFF;
    /// Wait n+2 sync units, n as a variable-length integer
    pub const SYNC_N: u8 = 0xFE;
    /// End of dump data
    pub const END: u8 = 0xFD;
}

/// Encode a wait of `count` sync units
pub fn generate_sync(count: u64) -> Vec<u8> {
    match count {
        0 => Vec::new(),
        1 => vec![cmd::SYNC],
        _ => {
            let mut data = vec![cmd::SYNC_N];
            data.extend(encode_varint(count - 2));
            data
        }
    }
}

/// 7 bits per byte, least significant group first, 0x80 marks continuation
pub fn encode_varint(mut value: u64) -> Vec<u8> {
    let mut data = Vec::new();
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            data.push(byte);
            return data;
        }
        data.push(byte | 0x80);
    }
}

/// Decode a variable-length integer, returning the value and bytes consumed
pub fn decode_varint(data: &[u8]) -> Option<(u64, usize)> {
    let mut value = 0u64;
    for (i, &byte) in data.iter().enumerate() {
        if i >= 10 {
            return None;
        }
        value |= ((byte & 0x7F) as u64) << (7 * i);
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }
    None
}
