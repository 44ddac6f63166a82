//! Hex helpers for raw packets

use crate::Result;

/// Parse a hex string into bytes
///
/// Accepts an optional `0x` prefix, and ignores whitespace, `:` and `-`
/// separators, so `"01 02 ff"`, `"0102ff"` and `"01:02:FF"` are equivalent.
pub fn parse_hex(input: &str) -> Result<Vec<u8>> {
    let trimmed = input.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    let digits: String = body
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != '-')
        .collect();

    Ok(::hex::decode(digits)?)
}

/// Format bytes as space separated lowercase hex
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|byte| ::hex::encode([*byte]))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Format bytes as a 16-column dump with offsets
pub fn hex_dump(data: &[u8]) -> String {
    data.chunks(16)
        .enumerate()
        .map(|(row, chunk)| format!("{:04x}  {}", row * 16, format_hex(chunk)))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_parse_hex_separators() {
        assert_eq!(parse_hex("01 02 ff").unwrap(), vec![0x01, 0x02, 0xff]);
        assert_eq!(parse_hex("0x0102FF").unwrap(), vec![0x01, 0x02, 0xff]);
        assert_eq!(parse_hex("01:02-ff").unwrap(), vec![0x01, 0x02, 0xff]);
        assert!(parse_hex("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_hex_invalid() {
        assert!(matches!(
            parse_hex("abc"),
            Err(Error::Hex(::hex::FromHexError::OddLength))
        ));
        assert!(matches!(
            parse_hex("zz"),
            Err(Error::Hex(::hex::FromHexError::InvalidHexCharacter { c: 'z', .. }))
        ));
    }

    #[test]
    fn test_format_hex() {
        assert_eq!(format_hex(&[0xab, 0x01]), "ab 01");
        assert_eq!(format_hex(&[]), "");
    }

    #[test]
    fn test_hex_dump_rows() {
        let data: Vec<u8> = (0..20).collect();
        let dump = hex_dump(&data);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("0000  00 01"));
        assert_eq!(lines[1], "0010  10 11 12 13");
    }
}
