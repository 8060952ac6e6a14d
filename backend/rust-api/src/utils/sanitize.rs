use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref MARKUP_CHARS: Regex = Regex::new(r#"[<>'"]"#).unwrap();
}

/// Trims the input and strips characters that could open markup or quoted
/// attributes when the answer is echoed back in the UI.
pub fn sanitize_input(input: &str) -> String {
    MARKUP_CHARS.replace_all(input.trim(), "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markup_characters() {
        assert_eq!(
            sanitize_input(r#"  <b>"Ember" & 'Ash'</b>  "#),
            "bEmber & Ash/b"
        );
    }

    #[test]
    fn plain_answers_are_only_trimmed() {
        assert_eq!(sanitize_input("  the hollow crown \n"), "the hollow crown");
    }

    #[test]
    fn markup_only_input_becomes_empty() {
        assert_eq!(sanitize_input(" <'\"> "), "");
    }
}
