//! Character dictionary for CTC decoding

use std::path::Path;
use tracing::{info, warn};

use crate::error::DictionaryError;

/// Ordered glyph list; decode id `i` maps to `glyphs[i - 1]`
#[derive(Debug, Clone, PartialEq)]
pub struct Dictionary {
    glyphs: Vec<String>,
}

impl Dictionary {
    /// Load one glyph per line, skipping empty lines
    pub fn load(path: &Path) -> Result<Self, DictionaryError> {
        let content = std::fs::read_to_string(path).map_err(|source| DictionaryError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let glyphs: Vec<String> = content
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        let dictionary = Self::from_glyphs(glyphs)?;
        info!("Loaded {} glyphs from {:?}", dictionary.len(), path);
        Ok(dictionary)
    }

    /// Build from an in-memory glyph list
    pub fn from_glyphs(glyphs: Vec<String>) -> Result<Self, DictionaryError> {
        if glyphs.is_empty() {
            return Err(DictionaryError::Empty);
        }
        Ok(Self { glyphs })
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// Always false; construction rejects empty lists
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Glyph for a 1-based decode id; id 0 and ids past the end map to nothing
    pub fn glyph(&self, id: usize) -> Option<&str> {
        id.checked_sub(1)
            .and_then(|index| self.glyphs.get(index))
            .map(String::as_str)
    }

    /// Warn when the glyph count differs from what the model was trained with
    pub fn check_expected_size(&self, expected: usize) -> bool {
        if expected == 0 || expected == self.len() {
            return true;
        }
        warn!(
            "Dictionary has {} glyphs, expected {}; decoded text may be wrong",
            self.len(),
            expected
        );
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_skips_empty_lines() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"a\r\nb\n\n \nc\n").unwrap();

        let dictionary = Dictionary::load(file.path()).unwrap();

        assert_eq!(dictionary.len(), 4);
        assert_eq!(dictionary.glyph(1), Some("a"));
        assert_eq!(dictionary.glyph(2), Some("b"));
        assert_eq!(dictionary.glyph(3), Some(" "));
        assert_eq!(dictionary.glyph(4), Some("c"));
    }

    #[test]
    fn test_glyph_ids_are_one_based() {
        let dictionary = Dictionary::from_glyphs(vec!["x".into(), "y".into()]).unwrap();
        assert_eq!(dictionary.glyph(0), None);
        assert_eq!(dictionary.glyph(2), Some("y"));
        assert_eq!(dictionary.glyph(3), None);
    }

    #[test]
    fn test_empty_dictionary_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"\n\n").unwrap();

        assert!(matches!(Dictionary::load(file.path()), Err(DictionaryError::Empty)));
    }

    #[test]
    fn test_unreadable_dictionary() {
        let err = Dictionary::load(Path::new("/nonexistent/dict.txt")).unwrap_err();
        assert!(matches!(err, DictionaryError::Unreadable { .. }));
    }

    #[test]
    fn test_expected_size_check() {
        let dictionary = Dictionary::from_glyphs(vec!["x".into()]).unwrap();
        assert!(dictionary.check_expected_size(1));
        assert!(dictionary.check_expected_size(0));
        assert!(!dictionary.check_expected_size(6625));
    }
}
