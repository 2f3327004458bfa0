use serde::Serialize;

/// Case transform applied to the artist name before the server renders it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextCase {
    #[default]
    None,
    Upper,
    Lower,
}

impl TextCase {
    pub fn all() -> &'static [TextCase] {
        &[TextCase::None, TextCase::Upper, TextCase::Lower]
    }

    pub fn label(&self) -> &'static str {
        match self {
            TextCase::None => "As is",
            TextCase::Upper => "UPPER",
            TextCase::Lower => "lower",
        }
    }

    pub fn apply(&self, text: &str) -> String {
        match self {
            TextCase::None => text.to_string(),
            TextCase::Upper => text.to_uppercase(),
            TextCase::Lower => text.to_lowercase(),
        }
    }
}

/// Lines the server will draw: words are spread over `rows` lines with
/// `ceil(words / rows)` words per line, so fewer lines can come out.
pub fn layout_rows(text: &str, rows: u32, case: TextCase) -> Vec<String> {
    let cased = case.apply(text);
    let words: Vec<&str> = cased.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }
    let rows = rows.max(1) as usize;
    let per_line = words.len().div_ceil(rows);
    words.chunks(per_line).map(|chunk| chunk.join(" ")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_row_keeps_everything_on_one_line() {
        assert_eq!(
            layout_rows("The Rolling Stones", 1, TextCase::None),
            vec!["The Rolling Stones"]
        );
    }

    #[test]
    fn words_per_line_rounds_up() {
        assert_eq!(
            layout_rows("Earth Wind and Fire", 3, TextCase::Upper),
            vec!["EARTH WIND", "AND FIRE"]
        );
        assert_eq!(
            layout_rows("a b c d e", 2, TextCase::None),
            vec!["a b c", "d e"]
        );
    }

    #[test]
    fn more_rows_than_words_gives_one_word_each() {
        assert_eq!(layout_rows("Björk", 3, TextCase::Lower), vec!["björk"]);
    }

    #[test]
    fn zero_rows_behaves_like_one() {
        assert_eq!(layout_rows("Daft  Punk", 0, TextCase::None), vec!["Daft Punk"]);
        assert!(layout_rows("   ", 2, TextCase::None).is_empty());
    }

    #[test]
    fn case_serialises_lowercase() {
        assert_eq!(serde_json::to_string(&TextCase::Upper).unwrap(), "\"upper\"");
        assert_eq!(serde_json::to_string(&TextCase::None).unwrap(), "\"none\"");
    }
}
