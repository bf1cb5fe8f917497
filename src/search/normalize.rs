use unicode_normalization::UnicodeNormalization;

/// Text folded for matching, with a map back to the source bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folded {
    pub text: String,
    /// For every byte of `text`: start byte and length of the source char it
    /// came from.
    origins: Vec<(usize, usize)>,
}

impl Folded {
    /// Source byte range covering folded bytes `start..end`.
    pub fn source_range(&self, start: usize, end: usize) -> Option<std::ops::Range<usize>> {
        if start >= end {
            return None;
        }
        let (from, _) = *self.origins.get(start)?;
        let (last, len) = *self.origins.get(end - 1)?;
        Some(from..last + len)
    }
}

fn is_combining_mark(c: char) -> bool {
    ('\u{0300}'..='\u{036f}').contains(&c)
}

/// Fold `text`: canonical decomposition, combining diacritics removed,
/// lower-cased, every whitespace character turned into a plain space.
pub fn fold(text: &str) -> Folded {
    let mut folded = String::with_capacity(text.len());
    let mut origins = Vec::with_capacity(text.len());
    for (at, c) in text.char_indices() {
        let source = (at, c.len_utf8());
        for d in std::iter::once(c).nfd() {
            if is_combining_mark(d) {
                continue;
            }
            if d.is_whitespace() {
                folded.push(' ');
                origins.push(source);
                continue;
            }
            for l in d.to_lowercase() {
                folded.push(l);
                origins.extend(std::iter::repeat_n(source, l.len_utf8()));
            }
        }
    }
    Folded {
        text: folded,
        origins,
    }
}

/// Fold a query the same way as scanned text.
pub fn fold_query(query: &str) -> String {
    fold(query.trim()).text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_diacritics_and_case() {
        assert_eq!(fold("Café CRÈME").text, "cafe creme");
        assert_eq!(fold_query("  Naïve "), "naive");
    }

    #[test]
    fn test_whitespace_becomes_space() {
        assert_eq!(fold("a\u{a0}b\tc\nd").text, "a b c d");
    }

    #[test]
    fn test_source_range_maps_back() {
        let text = "Él está aquí";
        let folded = fold(text);
        let at = folded.text.find("esta").expect("match");
        let range = folded.source_range(at, at + 4).expect("range");
        assert_eq!(&text[range], "está");
    }

    #[test]
    fn test_precomposed_and_decomposed_fold_alike() {
        assert_eq!(fold("e\u{301}").text, fold("é").text);
        let decomposed = "cafe\u{301}!";
        let folded = fold(decomposed);
        assert_eq!(folded.text, "cafe!");
        let range = folded.source_range(0, 4).expect("range");
        assert_eq!(&decomposed[range], "cafe");
    }
}
