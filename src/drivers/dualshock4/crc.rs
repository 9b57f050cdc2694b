/// Computes the standard CRC-32 (IEEE 802.3, reflected, complemented) of the
/// given bytes, continuing from `seed`. A seed of `0` starts a new checksum,
/// passing a previous result continues it over more data.
pub fn checksum(seed: u32, bytes: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new_with_initial(seed);
    hasher.update(bytes);
    hasher.finalize()
}
