//! Address decomposition
//!
//! Addresses are 32-bit and look like this:
//! | tag | index | offset |

use std::fmt;

use crate::error::ConfigError;
use crate::error::SimulatorError;
use crate::error::SimulatorResult;

const ADDRESS_WIDTH: u32 = 32;
const MAX_ADDRESS_DIGITS: usize = 8;

pub fn get_log_2(value: u32) -> u32 {
    assert!(value > 0);
    31 - value.leading_zeros()
}

pub fn is_pow_2(value: u32) -> bool {
    value != 0 && value & (value - 1) == 0
}

pub fn get_mask(bits: u32) -> u32 {
    ((1u64 << bits) - 1) as u32
}

/// High-order bits of an address identifying a memory block.
///
/// Two tags compare equal iff their bit patterns are equal. The display
/// form is zero-padded hexadecimal with `width / 4` digits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Tag {
    bits: u32,
    width: u32,
}

impl Tag {
    pub fn new(bits: u32, width: u32) -> Self {
        Self { bits: bits & get_mask(width), width }
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$x}", self.bits, width = (self.width / 4) as usize)
    }
}

/// Splits `address` into its set index and tag.
/// The low `offset_bits` are dropped.
pub fn decompose(
    address: u32,
    tag_bits: u32,
    index_bits: u32,
    offset_bits: u32,
) -> (usize, Tag) {
    assert_eq!(tag_bits + index_bits + offset_bits, ADDRESS_WIDTH);
    let index = (address.checked_shr(offset_bits).unwrap_or(0)
        & get_mask(index_bits)) as usize;
    let tag = address.checked_shr(offset_bits + index_bits).unwrap_or(0);
    (index, Tag::new(tag, tag_bits))
}

/// Field widths of one cache level, validated once at construction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressDecoder {
    pub tag_bits: u32,
    pub index_bits: u32,
    pub offset_bits: u32,
}

impl AddressDecoder {
    pub fn make(
        size: u32,
        associativity: u32,
        block_size: u32,
    ) -> Result<Self, ConfigError> {
        if size == 0 {
            return Err(ConfigError::Zero("cache size"));
        }
        if associativity == 0 {
            return Err(ConfigError::Zero("associativity"));
        }
        if block_size == 0 {
            return Err(ConfigError::Zero("block size"));
        }
        if !is_pow_2(block_size) {
            return Err(ConfigError::NotPowerOfTwo {
                field: "block size",
                value: block_size,
            });
        }

        let set_bytes = associativity as u64 * block_size as u64;
        if size as u64 % set_bytes != 0 {
            return Err(ConfigError::Indivisible {
                size,
                associativity,
                block_size,
            });
        }
        let num_sets = (size as u64 / set_bytes) as u32;
        if !is_pow_2(num_sets) {
            return Err(ConfigError::NotPowerOfTwo {
                field: "number of sets",
                value: num_sets,
            });
        }

        let offset_bits = get_log_2(block_size);
        let index_bits = get_log_2(num_sets);
        Ok(Self {
            tag_bits: ADDRESS_WIDTH - index_bits - offset_bits,
            index_bits,
            offset_bits,
        })
    }

    pub fn num_sets(&self) -> usize {
        1 << self.index_bits
    }

    pub fn decompose(&self, address: u32) -> (usize, Tag) {
        decompose(address, self.tag_bits, self.index_bits, self.offset_bits)
    }

    /// Rebuild the block address (offset zeroed) of a tag stored at `index`
    pub fn get_address(&self, index: usize, tag: Tag) -> u32 {
        let tag_part = tag
            .bits()
            .checked_shl(self.offset_bits + self.index_bits)
            .unwrap_or(0);
        tag_part | ((index as u32) << self.offset_bits)
    }
}

/// Parse a trace address of up to eight hexadecimal digits,
/// with or without a `0x` prefix
pub fn parse_address(text: &str) -> SimulatorResult<u32> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    let well_formed = !digits.is_empty()
        && digits.len() <= MAX_ADDRESS_DIGITS
        && digits.chars().all(|c| c.is_ascii_hexdigit());
    if !well_formed {
        return Err(SimulatorError::MalformedAddress(text.to_string()));
    }

    u32::from_str_radix(digits, 16)
        .map_err(|_| SimulatorError::MalformedAddress(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_log_2() {
        for n in 1..123457 {
            let expected = {
                let mut count = 0;
                let mut t = n;
                while t > 1 {
                    count += 1;
                    t >>= 1;
                }
                count
            };
            assert_eq!(expected, get_log_2(n));
        }
    }

    #[test]
    fn test_is_pow_2() {
        assert!(is_pow_2(1));
        assert!(is_pow_2(1024));
        assert!(!is_pow_2(0));
        assert!(!is_pow_2(48));
    }

    #[test]
    fn test_field_widths() {
        let geometries = [
            (1024, 2, 16),
            (1024, 1, 32),
            (8192, 4, 64),
            (1 << 20, 8, 32),
            (1024, 32, 32),
        ];
        for (size, associativity, block_size) in geometries {
            let decoder =
                AddressDecoder::make(size, associativity, block_size).unwrap();
            assert_eq!(
                decoder.tag_bits + decoder.index_bits + decoder.offset_bits,
                32
            );
            assert_eq!(
                decoder.num_sets() as u32 * associativity * block_size,
                size
            );
        }
    }

    #[test]
    fn test_decompose() {
        // 32 sets of 2 x 16 bytes: 4 offset bits, 5 index bits
        let decoder = AddressDecoder::make(1024, 2, 16).unwrap();
        let (index, tag) = decoder.decompose(0x40007a8c);
        assert_eq!(index, 0x08);
        assert_eq!(tag.bits(), 0x20003d);
        assert_eq!(tag.to_string(), "20003d");
    }

    #[test]
    fn test_round_trip() {
        let decoder = AddressDecoder::make(4096, 4, 32).unwrap();
        for address in [0u32, 0x1f, 0x20, 0xdeadbeef, 0xffffffff, 0x00400040] {
            let (index, tag) = decoder.decompose(address);
            let rebuilt = decoder.get_address(index, tag);
            assert_eq!(rebuilt, address & !get_mask(decoder.offset_bits));
            assert_eq!(decoder.decompose(rebuilt), (index, tag));
        }
    }

    #[test]
    fn test_single_set() {
        // Fully associative: no index bits at all
        let decoder = AddressDecoder::make(256, 8, 32).unwrap();
        assert_eq!(decoder.index_bits, 0);
        let (index, tag) = decoder.decompose(0xffffffe0);
        assert_eq!(index, 0);
        assert_eq!(tag.bits(), 0x07ffffff);
    }

    #[test]
    fn test_invalid_geometry() {
        assert_eq!(
            AddressDecoder::make(1024, 2, 24),
            Err(ConfigError::NotPowerOfTwo {
                field: "block size",
                value: 24
            })
        );
        assert_eq!(
            AddressDecoder::make(1000, 2, 16),
            Err(ConfigError::Indivisible {
                size: 1000,
                associativity: 2,
                block_size: 16
            })
        );
        assert_eq!(
            AddressDecoder::make(1536, 2, 16),
            Err(ConfigError::NotPowerOfTwo {
                field: "number of sets",
                value: 48
            })
        );
        assert_eq!(
            AddressDecoder::make(1024, 0, 16),
            Err(ConfigError::Zero("associativity"))
        );
    }

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("00000010").unwrap(), 0x10);
        assert_eq!(parse_address("0xFFE04540").unwrap(), 0xffe04540);
        assert_eq!(parse_address("40007a").unwrap(), 0x40007a);
        assert!(parse_address("").is_err());
        assert!(parse_address("123456789").is_err());
        assert!(parse_address("+1234").is_err());
        assert!(matches!(
            parse_address("0xzz"),
            Err(SimulatorError::MalformedAddress(_))
        ));
    }
}
