//! HID report descriptor scanning
//!
//! This is not a report descriptor parser in the full sense. It walks the item
//! stream one item at a time and only pulls out the first Usage Page and the
//! first Usage it meets, which is enough to tell a device's top-level
//! function apart (e.g. vendor-defined raw HID vs. a keyboard).
//!
//! Two encodings exist (HID 1.11, 6.2.2):
//! - short items: a header byte whose low two bits select a 0, 1, 2 or 4 byte
//!   little-endian payload
//! - long items: `0xFE`, a payload length byte, a tag byte, then the payload
//!
//! Every advance is bounds-checked against the buffer before any payload byte
//! is read; a truncated item ends the scan.

/// Header byte marking a long item
pub const LONG_ITEM_MARKER: u8 = 0xFE;

/// Global item tag: Usage Page
pub const TAG_USAGE_PAGE: u8 = 0x04;

/// Local item tag: Usage
pub const TAG_USAGE: u8 = 0x08;

/// Bytes consumed by a long item beyond its declared payload length
const LONG_ITEM_OVERHEAD: usize = 5;

/// Payload length for each short item size selector
const SHORT_ITEM_SIZES: [usize; 4] = [0, 1, 2, 4];

/// One decoded descriptor item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Item {
    /// Item tag with the size bits cleared (short items) or the long item tag
    pub tag: u8,
    /// Little-endian payload value; always 0 for long items
    pub value: u32,
    /// Total bytes the item occupies in the descriptor
    pub len: usize,
}

/// Cursor over an immutable report descriptor
#[derive(Debug, Clone)]
pub struct ItemCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ItemCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current byte offset into the descriptor
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Decode the item at the cursor and advance past it
    ///
    /// Returns `None` at end of data, or when the item would extend past the
    /// end of the buffer. The cursor does not move in either case.
    pub fn next_item(&mut self) -> Option<Item> {
        let rest = self.data.get(self.pos..)?;
        let header = *rest.first()?;

        let item = if header == LONG_ITEM_MARKER {
            let payload_len = usize::from(*rest.get(1)?);
            let len = payload_len + LONG_ITEM_OVERHEAD;
            if len > rest.len() {
                return None;
            }
            Item {
                tag: rest[2],
                value: 0,
                len,
            }
        } else {
            let payload_len = SHORT_ITEM_SIZES[usize::from(header & 0x03)];
            let payload = rest.get(1..1 + payload_len)?;
            let value = payload
                .iter()
                .rev()
                .fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
            Item {
                tag: header & 0xFC,
                value,
                len: payload_len + 1,
            }
        };

        self.pos += item.len;
        Some(item)
    }
}

impl Iterator for ItemCursor<'_> {
    type Item = Item;

    fn next(&mut self) -> Option<Item> {
        self.next_item()
    }
}

/// Top-level usage declared by a report descriptor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopLevelUsage {
    pub usage_page: Option<u32>,
    pub usage: Option<u32>,
}

impl TopLevelUsage {
    /// Scan `descriptor` for the first Usage Page and first Usage items
    ///
    /// Stops as soon as both are known, or at the first item that cannot be
    /// decoded.
    pub fn scan(descriptor: &[u8]) -> Self {
        let mut found = Self::default();

        for item in ItemCursor::new(descriptor) {
            match item.tag {
                TAG_USAGE_PAGE if found.usage_page.is_none() => found.usage_page = Some(item.value),
                TAG_USAGE if found.usage.is_none() => found.usage = Some(item.value),
                _ => {}
            }
            if found.is_complete() {
                break;
            }
        }

        found
    }

    /// Both the usage page and the usage were found
    pub fn is_complete(&self) -> bool {
        self.usage_page.is_some() && self.usage.is_some()
    }

    /// Return `(usage_page, usage)` when both were found
    pub fn pair(&self) -> Option<(u32, u32)> {
        Some((self.usage_page?, self.usage?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_usage_page_then_usage() {
        let data = [0x05, 0x01, 0x09, 0x02];
        let mut cursor = ItemCursor::new(&data);

        assert_eq!(
            cursor.next_item(),
            Some(Item {
                tag: TAG_USAGE_PAGE,
                value: 1,
                len: 2
            })
        );
        assert_eq!(
            cursor.next_item(),
            Some(Item {
                tag: TAG_USAGE,
                value: 2,
                len: 2
            })
        );
        assert_eq!(cursor.next_item(), None);
        assert_eq!(cursor.position(), 4);

        assert_eq!(TopLevelUsage::scan(&data).pair(), Some((1, 2)));
    }

    #[test]
    fn test_scan_stops_after_both_found() {
        // Raw HID style descriptor: vendor page 0xFFAB, usage 0x0200
        let data = [
            0x06, 0xAB, 0xFF, // Usage Page (0xFFAB)
            0x0A, 0x00, 0x02, // Usage (0x0200)
            0xA1, 0x01, // Collection (Application)
            0x05, 0x01, // Usage Page (Generic Desktop) - must be ignored
            0x09, 0x06, // Usage (Keyboard) - must be ignored
            0xC0, // End Collection
        ];
        let usage = TopLevelUsage::scan(&data);
        assert_eq!(usage.usage_page, Some(0xFFAB));
        assert_eq!(usage.usage, Some(0x0200));
    }

    #[test]
    fn test_truncated_short_item() {
        let data = [0x05];
        let mut cursor = ItemCursor::new(&data);
        assert_eq!(cursor.next_item(), None);
        assert_eq!(cursor.position(), 0);

        let usage = TopLevelUsage::scan(&data);
        assert_eq!(usage, TopLevelUsage::default());
        assert!(!usage.is_complete());
    }

    #[test]
    fn test_truncated_after_first_item() {
        let data = [0x05, 0x0C, 0x0A, 0x01];
        let usage = TopLevelUsage::scan(&data);
        assert_eq!(usage.usage_page, Some(0x0C));
        assert_eq!(usage.usage, None);
        assert_eq!(usage.pair(), None);
    }

    #[test]
    fn test_four_byte_value_little_endian() {
        let data = [0x07, 0x78, 0x56, 0x34, 0x12];
        let item = ItemCursor::new(&data).next_item().unwrap();
        assert_eq!(item.tag, 0x04);
        assert_eq!(item.value, 0x1234_5678);
        assert_eq!(item.len, 5);
    }

    #[test]
    fn test_zero_length_item() {
        let data = [0xC0];
        let item = ItemCursor::new(&data).next_item().unwrap();
        assert_eq!(item.tag, 0xC0);
        assert_eq!(item.value, 0);
        assert_eq!(item.len, 1);
    }

    #[test]
    fn test_long_item() {
        // 0xFE, length 2, tag 0x10, then enough trailing bytes for the item
        let data = [0xFE, 0x02, 0x10, 0xAA, 0xBB, 0x05, 0x01];
        let mut cursor = ItemCursor::new(&data);
        let item = cursor.next_item().unwrap();
        assert_eq!(item.tag, 0x10);
        assert_eq!(item.value, 0);
        assert_eq!(item.len, 7);
        assert_eq!(cursor.next_item(), None);
    }

    #[test]
    fn test_long_item_past_end() {
        let data = [0xFE, 0x20, 0x10, 0xAA];
        let mut cursor = ItemCursor::new(&data);
        assert_eq!(cursor.next_item(), None);
        assert_eq!(cursor.position(), 0);

        // Marker alone, no length byte
        assert_eq!(ItemCursor::new(&[0xFE]).next_item(), None);
    }

    #[test]
    fn test_first_value_wins() {
        let data = [0x05, 0x01, 0x05, 0x0C, 0x09, 0x02];
        assert_eq!(TopLevelUsage::scan(&data).pair(), Some((1, 2)));
    }

    #[test]
    fn test_empty_descriptor() {
        assert_eq!(ItemCursor::new(&[]).next_item(), None);
        assert_eq!(TopLevelUsage::scan(&[]), TopLevelUsage::default());
    }

    proptest! {
        #[test]
        fn prop_cursor_stays_in_bounds(data in proptest::collection::vec(any::<u8>(), 0..256)) {
            let mut cursor = ItemCursor::new(&data);
            while let Some(item) = cursor.next_item() {
                prop_assert!(item.len >= 1);
                prop_assert!(cursor.position() <= data.len());
            }
            prop_assert!(cursor.position() <= data.len());
        }

        #[test]
        fn prop_scan_never_panics(data in proptest::collection::vec(any::<u8>(), 0..1024)) {
            let _ = TopLevelUsage::scan(&data);
        }
    }
}
