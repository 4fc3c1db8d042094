//! Base64 codec for sensor payloads embedded in RuuviTag URLs.
//!
//! Data formats 2 and 4 pack their payload into the fragment of an Eddystone
//! URL using the standard 64-symbol alphabet (`A-Z a-z 0-9 + /`, `=`
//! padding). The decoder never fails: noisy input degrades to fewer output
//! bytes. See [`decode`] for the exact window rules.

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Encode bytes with the standard base64 alphabet.
///
/// Packs three input bytes into four six-bit symbols per group. A trailing
/// group of one or two bytes is completed with `=` characters, so the output
/// length is always a multiple of four.
pub fn encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(3) * 4);
    let mut pad = 0;
    let mut i = 0;
    while i < data.len() {
        let mut group = u32::from(data[i]) << 16;
        if i + 1 < data.len() {
            group |= u32::from(data[i + 1]) << 8;
        } else {
            pad += 1;
        }
        if i + 2 < data.len() {
            group |= u32::from(data[i + 2]);
        } else {
            pad += 1;
        }
        for _ in 0..4 - pad {
            out.push(ALPHABET[((group >> 18) & 0x3F) as usize] as char);
            group <<= 6;
        }
        i += 3;
    }
    for _ in 0..pad {
        out.push('=');
    }
    out
}

/// Decode base64 input, tolerating noise.
///
/// The scan runs in windows of four symbols. A byte outside the alphabet at
/// the cursor advances the scan by one position. Once a window opens with a
/// valid symbol, up to three further symbols are consumed; invalid ones
/// among them contribute nothing, and the window emits one output byte per
/// valid trailing symbol (2, 3 or 4 valid symbols yield 1, 2 or 3 bytes).
/// The cursor then advances by four regardless of how many symbols were
/// valid, which makes `=` padding harmless but desynchronizes the windowing
/// on invalid bytes in the interior. That alignment behavior is a
/// compatibility target of the wire format and must not change.
///
/// Unparseable input produces an empty result instead of an error.
pub fn decode(input: &str) -> Vec<u8> {
    // 256-entry reverse lookup; -1 marks bytes outside the alphabet.
    let mut table = [-1i32; 256];
    for (value, symbol) in ALPHABET.iter().enumerate() {
        table[*symbol as usize] = value as i32;
    }

    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len() / 4 * 3);
    let mut i = 0;
    while i < bytes.len() {
        let first = table[bytes[i] as usize];
        if first < 0 {
            i += 1;
            continue;
        }

        let mut group = (first as u32) << 18;
        let mut produced = 0;
        for (lookahead, shift) in [(1usize, 12u32), (2, 6), (3, 0)] {
            if i + lookahead < bytes.len() {
                let value = table[bytes[i + lookahead] as usize];
                if value >= 0 {
                    group |= (value as u32) << shift;
                    produced += 1;
                }
            }
        }

        for _ in 0..produced {
            out.push((group >> 16) as u8);
            group <<= 8;
        }
        i += 4;
    }
    out
}
