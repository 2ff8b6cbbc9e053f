//! LZF decompression.
//!
//! The compressed stream is a sequence of runs, each starting with a
//! control byte:
//!
//! ```text
//! 000LLLLL [L+1 bytes]          literal run of L+1 bytes
//! LLLooooo oooooooo             back reference, length L+2 (L in 1..=6)
//! 111ooooo LLLLLLLL oooooooo    back reference, length L+9
//! ```
//!
//! A back reference copies from `distance = o + 1` bytes behind the current
//! output position; source and destination may overlap.

use crate::error::{RdbError, Result};

/// Largest output a single input byte can expand to (a 3-byte back
/// reference yields at most 264 bytes).
const MAX_EXPANSION: usize = 88;

/// Inflates `input` into exactly `expected_len` bytes.
pub fn decompress(input: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    decompress_at(input, expected_len, 0)
}

/// Like [`decompress`], reporting error offsets relative to `base`.
pub fn decompress_at(input: &[u8], expected_len: usize, base: u64) -> Result<Vec<u8>> {
    let corrupted = |at: usize, reason: &str| RdbError::corrupted(base + at as u64, format!("lzf: {reason}"));

    if expected_len > input.len().saturating_mul(MAX_EXPANSION) {
        return Err(corrupted(
            0,
            &format!(
                "{} compressed bytes cannot inflate to {expected_len}",
                input.len()
            ),
        ));
    }

    let mut out = Vec::with_capacity(expected_len);
    let mut ip = 0;
    while ip < input.len() {
        let ctrl = input[ip] as usize;
        ip += 1;

        if ctrl < 1 << 5 {
            let run = ctrl + 1;
            if out.len() + run > expected_len {
                return Err(corrupted(ip, "literal run overflows output"));
            }
            if ip + run > input.len() {
                return Err(corrupted(ip, "literal run past end of input"));
            }
            out.extend_from_slice(&input[ip..ip + run]);
            ip += run;
        } else {
            let mut len = ctrl >> 5;
            if ip >= input.len() {
                return Err(corrupted(ip, "truncated back reference"));
            }
            if len == 7 {
                len += input[ip] as usize;
                ip += 1;
                if ip >= input.len() {
                    return Err(corrupted(ip, "truncated back reference"));
                }
            }
            let distance = ((ctrl & 0x1F) << 8) + input[ip] as usize + 1;
            ip += 1;
            len += 2;

            if out.len() + len > expected_len {
                return Err(corrupted(ip, "back reference overflows output"));
            }
            if distance > out.len() {
                return Err(corrupted(ip, "back reference before start of output"));
            }
            let start = out.len() - distance;
            for i in start..start + len {
                let b = out[i];
                out.push(b);
            }
        }
    }

    if out.len() != expected_len {
        return Err(corrupted(
            input.len(),
            &format!("inflated to {} bytes, expected {expected_len}", out.len()),
        ));
    }
    Ok(out)
}
