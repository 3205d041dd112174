//! UTF-16 offset helpers.
//!
//! Stored documents count offsets in UTF-16 code units, Rust strings index
//! by byte. [`Utf16Index`] maps one to the other for a single block.

/// Length of `text` in UTF-16 code units
pub fn utf16_len(text: &str) -> usize {
    text.chars().map(char::len_utf16).sum()
}

/// Maps UTF-16 offsets of one string to byte offsets.
#[derive(Debug, Clone)]
pub struct Utf16Index {
    /// `(utf16 offset, byte offset)` of every char start, plus the end
    bounds: Vec<(usize, usize)>,
}

impl Utf16Index {
    pub fn new(text: &str) -> Self {
        let mut bounds = Vec::with_capacity(text.len() + 1);
        let mut units = 0;
        for (byte, c) in text.char_indices() {
            bounds.push((units, byte));
            units += c.len_utf16();
        }
        bounds.push((units, text.len()));
        Self { bounds }
    }

    /// Total length in UTF-16 code units
    pub fn len(&self) -> usize {
        self.bounds.last().map(|b| b.0).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Byte offset for a UTF-16 offset. Offsets inside a surrogate pair snap
    /// back to the start of that char; offsets past the end clamp to it.
    pub fn byte_offset(&self, utf16: usize) -> usize {
        let idx = self.bounds.partition_point(|&(u, _)| u <= utf16);
        self.bounds[idx.saturating_sub(1)].1
    }

    /// Slice `text` (the string this index was built from) by UTF-16 offsets
    pub fn slice<'a>(&self, text: &'a str, start: usize, end: usize) -> &'a str {
        let start = self.byte_offset(start);
        let end = self.byte_offset(end).max(start);
        &text[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii() {
        let index = Utf16Index::new("hello");
        assert_eq!(index.len(), 5);
        assert_eq!(index.slice("hello", 1, 3), "el");
    }

    #[test]
    fn test_astral_chars_count_two_units() {
        let text = "a😀b";
        assert_eq!(utf16_len(text), 4);
        let index = Utf16Index::new(text);
        assert_eq!(index.slice(text, 1, 3), "😀");
        assert_eq!(index.slice(text, 3, 4), "b");
        // a cut inside the surrogate pair moves the whole char to the later half
        assert_eq!(index.slice(text, 1, 2), "");
        assert_eq!(index.slice(text, 2, 3), "😀");
    }

    #[test]
    fn test_clamps_past_end() {
        let index = Utf16Index::new("abc");
        assert_eq!(index.slice("abc", 1, 99), "bc");
        assert_eq!(index.byte_offset(42), 3);
    }

    #[test]
    fn test_empty() {
        let index = Utf16Index::new("");
        assert!(index.is_empty());
        assert_eq!(index.slice("", 0, 0), "");
    }
}
