//! CRC64 (Jones polynomial, reflected) as used by RDB files and DUMP payloads.

use crc::{Crc, CRC_64_REDIS};

static CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_REDIS);

/// Folds `data` into a running checksum.
///
/// `seed` is the checksum of everything before `data` (0 for an empty
/// prefix), so `crc64(crc64(0, a), b) == crc64(0, a ++ b)`.
pub fn crc64(seed: u64, data: &[u8]) -> u64 {
    // The register of a reflected CRC is stored bit-reversed.
    let mut digest = CRC64.digest_with_initial(seed.reverse_bits());
    digest.update(data);
    digest.finalize()
}
