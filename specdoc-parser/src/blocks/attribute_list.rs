use crate::model::{
    Attribute, AttributeList, NamedAttribute, PositionalAttribute, Quote, ShorthandAttribute,
};

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Raw<'a> {
    Named(&'a str, Value),
    Positional(Value),
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Value {
    text: String,
    quote: Quote,
}

peg::parser! {
    grammar attribute_list_parser() for str {
        pub(crate) rule attributes() -> Vec<Raw<'input>>
            = ws() items:(item() ** (ws() "," ws())) ws() ![_] { items }

        rule item() -> Raw<'input>
            = name:name() ws() "=" ws() value:value() { Raw::Named(name, value) }
            / value:value() { Raw::Positional(value) }

        rule value() -> Value
            = "\"" text:$(("\\\"" / !"\"" [_])*) "\"" &(ws() ("," / ![_])) {
                Value { text: text.replace("\\\"", "\""), quote: Quote::Double }
            }
            / "'" text:$(("\\'" / !"'" [_])*) "'" &(ws() ("," / ![_])) {
                Value { text: text.replace("\\'", "'"), quote: Quote::Single }
            }
            / text:$((!"," [_])*) {
                Value { text: text.trim_end().to_string(), quote: Quote::None }
            }

        rule name() -> &'input str
            = $(['a'..='z' | 'A'..='Z' | '0'..='9' | '_'] ['a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '-']*)

        rule ws() = [' ' | '\t']*
    }
}

/// Parses the content between the brackets of an attribute list.
///
/// With `shorthand` set (block attribute lines), an unquoted first positional is read
/// as `style#id.role%option`. Macro attribute lists such as `image::a.png[Alt text]`
/// pass `false` so the first positional stays a value.
pub(crate) fn parse(content: &str, shorthand: bool) -> AttributeList {
    let mut list = AttributeList::new();
    if content.trim().is_empty() {
        return list;
    }
    let raw = attribute_list_parser::attributes(content).unwrap_or_else(|error| {
        tracing::trace!(%content, %error, "attribute list did not parse, keeping it whole");
        vec![Raw::Positional(Value {
            text: content.trim().to_string(),
            quote: Quote::None,
        })]
    });

    for (index, item) in raw.into_iter().enumerate() {
        let offset = index + 1;
        match item {
            Raw::Named(name, value) => list.push(Attribute::Named(NamedAttribute {
                name: name.to_string(),
                value: value.text,
                quote: value.quote,
            })),
            Raw::Positional(value) if offset == 1 && shorthand && value.quote == Quote::None => {
                if !value.text.is_empty() {
                    list.push(Attribute::Shorthand(parse_shorthand(&value.text)));
                }
            }
            Raw::Positional(value) => {
                if !value.text.is_empty() || value.quote != Quote::None {
                    list.push(Attribute::Positional(PositionalAttribute {
                        offset,
                        implied_name: None,
                        value: value.text,
                        quote: value.quote,
                    }));
                }
            }
        }
    }
    list
}

#[derive(Clone, Copy)]
enum Part {
    Style,
    Id,
    Role,
    Option,
}

fn parse_shorthand(text: &str) -> ShorthandAttribute {
    let mut shorthand = ShorthandAttribute::default();
    let mut part = Part::Style;
    let mut buffer = String::new();

    let mut flush = |part: Part, buffer: &mut String| {
        let value = std::mem::take(buffer).trim().to_string();
        if value.is_empty() {
            return;
        }
        match part {
            Part::Style => shorthand.style = Some(value),
            Part::Id => {
                if shorthand.id.is_none() {
                    shorthand.id = Some(value);
                }
            }
            Part::Role => shorthand.roles.push(value),
            Part::Option => shorthand.options.push(value),
        }
    };

    for c in text.chars() {
        let next = match c {
            '#' => Part::Id,
            '.' => Part::Role,
            '%' => Part::Option,
            _ => {
                buffer.push(c);
                continue;
            }
        };
        flush(part, &mut buffer);
        part = next;
    }
    flush(part, &mut buffer);
    shorthand
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn named(name: &str, value: &str, quote: Quote) -> Attribute {
        Attribute::Named(NamedAttribute {
            name: name.into(),
            value: value.into(),
            quote,
        })
    }

    fn positional(offset: usize, value: &str, quote: Quote) -> Attribute {
        Attribute::Positional(PositionalAttribute {
            offset,
            implied_name: None,
            value: value.into(),
            quote,
        })
    }

    #[test]
    fn shorthand_style_id_roles_and_options() {
        let list = parse("quote#famous.lead.center%unbreakable", true);
        assert_eq!(
            list,
            AttributeList::from(vec![Attribute::Shorthand(ShorthandAttribute {
                style: Some("quote".into()),
                id: Some("famous".into()),
                roles: vec!["lead".into(), "center".into()],
                options: vec!["unbreakable".into()],
            })])
        );
    }

    #[test]
    fn positional_and_named_with_quotes() {
        let list = parse(r#"source, rust, title="A, B", role='x', cols=1"#, true);
        assert_eq!(
            list,
            AttributeList::from(vec![
                Attribute::Shorthand(ShorthandAttribute {
                    style: Some("source".into()),
                    ..ShorthandAttribute::default()
                }),
                positional(2, "rust", Quote::None),
                named("title", "A, B", Quote::Double),
                named("role", "x", Quote::Single),
                named("cols", "1", Quote::None),
            ])
        );
    }

    #[test]
    fn macro_lists_keep_first_positional() {
        let list = parse("Tiger sitting, 200, 100", false);
        assert_eq!(
            list,
            AttributeList::from(vec![
                positional(1, "Tiger sitting", Quote::None),
                positional(2, "200", Quote::None),
                positional(3, "100", Quote::None),
            ])
        );
    }

    #[test]
    fn empty_positions_still_count() {
        let list = parse(",second", true);
        assert_eq!(list, AttributeList::from(vec![positional(2, "second", Quote::None)]));
    }

    #[test]
    fn escaped_quotes_unescape() {
        let list = parse(r#"title="say \"hi\"""#, true);
        assert_eq!(list.get("title"), Some(r#"say "hi""#));
    }

    #[test]
    fn unbalanced_quote_is_kept_as_text() {
        let list = parse(r#"alt="open"#, false);
        assert_eq!(list.get("alt"), Some("\"open"));
    }

    #[test]
    fn id_only_shorthand() {
        let list = parse("#install", true);
        assert_eq!(list.id(), Some("install"));
        assert_eq!(list.style(), None);
    }
}
