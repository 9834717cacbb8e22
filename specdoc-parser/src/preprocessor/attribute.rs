/// A parsed `:name: value`, `:name!:` or `:!name:` line.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum AttributeLine {
    Set { name: String, value: String },
    Unset { name: String },
}

peg::parser! {
    grammar attribute_parser() for str {
        pub(crate) rule document_attribute() -> AttributeLine
            = ":" "!" name:name() ":" ws() ![_] { AttributeLine::Unset { name } }
            / ":" name:name() "!" ":" ws() ![_] { AttributeLine::Unset { name } }
            / ":" name:name() ":" value:value() {
                AttributeLine::Set { name, value }
            }

        rule name() -> String
            = n:$(['a'..='z' | 'A'..='Z' | '0'..='9' | '_'] ['a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_']*) {
                n.to_string()
            }

        rule value() -> String
            = [' ' | '\t']+ v:$([^'\n']*) { v.trim().to_string() }
            / ws() ![_] { String::new() }

        rule ws() = quiet!{[' ' | '\t']*}
    }
}

/// Recognizes an attribute entry line.
pub(crate) fn parse(line: &str) -> Option<AttributeLine> {
    if !line.starts_with(':') {
        return None;
    }
    attribute_parser::document_attribute(line).ok()
}

/// A value ending in ` \` continues on the next line.
pub(crate) fn continues(value: &str) -> bool {
    value == "\\" || value.ends_with(" \\")
}

/// Joins a continued value with its next line. ` + \` keeps a hard line break,
/// ` \` folds into a single space.
pub(crate) fn join_continuation(value: &mut String, next: &str) {
    let hard_break = value.ends_with(" + \\");
    let keep = value
        .trim_end_matches('\\')
        .trim_end()
        .trim_end_matches(" +")
        .len();
    value.truncate(keep);
    if hard_break {
        value.push_str(" +\n");
    } else if !value.is_empty() {
        value.push(' ');
    }
    value.push_str(next.trim());
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_simple_attribute() {
        assert_eq!(
            parse(":name: value"),
            Some(AttributeLine::Set {
                name: "name".into(),
                value: "value".into()
            })
        );
    }

    #[test]
    fn parses_both_unset_forms() {
        let expected = Some(AttributeLine::Unset {
            name: "name".into(),
        });
        assert_eq!(parse(":!name:"), expected);
        assert_eq!(parse(":name!:"), expected);
    }

    #[test]
    fn parses_empty_value() {
        assert_eq!(
            parse(":complex-name_123:"),
            Some(AttributeLine::Set {
                name: "complex-name_123".into(),
                value: String::new()
            })
        );
    }

    #[test]
    fn rejects_lookalikes() {
        assert_eq!(parse(":not an attribute"), None);
        assert_eq!(parse("::"), None);
        assert_eq!(parse(":name:value"), None);
        assert_eq!(parse("text :name: value"), None);
    }

    #[test]
    fn joins_soft_and_hard_continuations() {
        let mut value = "first \\".to_string();
        assert!(continues(&value));
        join_continuation(&mut value, "  second");
        assert_eq!(value, "first second");

        let mut value = "line one + \\".to_string();
        join_continuation(&mut value, "line two");
        assert_eq!(value, "line one +\nline two");
    }
}
