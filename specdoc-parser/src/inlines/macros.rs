use super::{Scanner, is_anchor_id, is_word};
use crate::model::{Anchor, CrossReference, Element, Email, Link, LinkForm, XrefFormat};

/// Inline macro names, recognized at the start of a word.
pub(super) const PREFIXES: [&str; 4] = ["link:", "mailto:", "xref:", "anchor:"];

/// URL schemes that turn into links without any markup.
pub(super) const SCHEMES: [&str; 5] = ["https://", "http://", "ftp://", "irc://", "file://"];

fn ends_url(c: char) -> bool {
    c.is_whitespace() || matches!(c, '[' | ']' | '<' | '>' | '"')
}

/// Drops sentence punctuation that follows a bare URL, and a closing parenthesis
/// that has no opening partner inside the URL.
fn trim_url(candidate: &str) -> &str {
    let mut url = candidate;
    while let Some(last) = url.chars().next_back() {
        let unbalanced = last == ')' && url.matches('(').count() < url.matches(')').count();
        if !(matches!(last, '.' | ',' | ';' | ':' | '!' | '?' | '\'') || unbalanced) {
            break;
        }
        url = url.get(..url.len() - last.len_utf8()).unwrap_or_default();
    }
    url
}

fn is_email_local(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '.' | '%' | '+' | '-' | '_')
}

fn is_email_domain(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '.' | '-')
}

impl Scanner<'_> {
    /// Finds the `]` closing the bracket opened at `open`, skipping `\]`.
    fn bracket_close(&self, open: usize, end: usize) -> Option<usize> {
        if self.char_at(open) != Some('[') {
            return None;
        }
        let mut escaped = false;
        for (index, c) in self.rest(open + 1, end).char_indices() {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                ']' => return Some(open + 1 + index),
                _ => {}
            }
        }
        None
    }

    /// `link:target[text]`, `mailto:address[text]`, `xref:target[text]` and
    /// `anchor:id[label]`.
    pub(super) fn inline_macro(&self, offset: usize, end: usize) -> Option<(Element, usize)> {
        let rest = self.rest(offset, end);
        let prefix = PREFIXES.iter().find(|prefix| rest.starts_with(**prefix))?;
        let target_start = offset + prefix.len();
        let target_len = self
            .rest(target_start, end)
            .find(|c: char| c == '[' || c.is_whitespace())?;
        let open = target_start + target_len;
        if target_len == 0 || self.char_at(open) != Some('[') {
            return None;
        }
        let target = self.rest(target_start, open);
        let close = self.bracket_close(open, end)?;
        let elements = self.trimmed_scan(open + 1, close);
        let next = close + 1;

        let element = match *prefix {
            "link:" => Element::Link(Link {
                url: target.to_string(),
                form: LinkForm::Macro,
                elements,
            }),
            "mailto:" => Element::Email(Email {
                address: target.to_string(),
                elements,
            }),
            "xref:" => Element::CrossReference(CrossReference {
                id: target.to_string(),
                elements,
                format: XrefFormat::Macro,
                location: self.location(offset),
                resolution: None,
            }),
            _ if is_anchor_id(target) => Element::Anchor(Anchor {
                id: target.to_string(),
                label: elements,
                location: self.location(offset),
            }),
            _ => return None,
        };
        Some((element, next))
    }

    /// A bare URL. A bracket right after it supplies the link text.
    pub(super) fn autolink(&self, offset: usize, end: usize) -> Option<(Element, usize)> {
        let rest = self.rest(offset, end);
        let scheme = SCHEMES.iter().find(|scheme| rest.starts_with(**scheme))?;
        let length = rest.find(ends_url).unwrap_or(rest.len());
        if length <= scheme.len() {
            return None;
        }
        let candidate = rest.get(..length)?;

        if let Some(close) = self.bracket_close(offset + length, end) {
            url::Url::parse(candidate).ok()?;
            let elements = self.trimmed_scan(offset + length + 1, close);
            return Some((
                Element::Link(Link {
                    url: candidate.to_string(),
                    form: LinkForm::Macro,
                    elements,
                }),
                close + 1,
            ));
        }

        let url = trim_url(candidate);
        if url.len() <= scheme.len() || url::Url::parse(url).is_err() {
            tracing::trace!(%candidate, "not a valid URL, keeping it as text");
            return None;
        }
        Some((
            Element::Link(Link {
                url: url.to_string(),
                form: LinkForm::Autolink,
                elements: Vec::new(),
            }),
            offset + url.len(),
        ))
    }

    /// `<https://example.org>`: the angle brackets are not part of the link.
    pub(super) fn bracketed_autolink(&self, offset: usize, end: usize) -> Option<(Element, usize)> {
        let inner_start = offset + 1;
        let rest = self.rest(inner_start, end);
        let scheme = SCHEMES.iter().find(|scheme| rest.starts_with(**scheme))?;
        let close = rest.find('>')?;
        let url = rest.get(..close)?;
        if url.len() <= scheme.len() || url.contains(char::is_whitespace) {
            return None;
        }
        url::Url::parse(url).ok()?;
        Some((
            Element::Link(Link {
                url: url.to_string(),
                form: LinkForm::Autolink,
                elements: Vec::new(),
            }),
            inner_start + close + 1,
        ))
    }

    /// A bare email address such as `me@example.com`.
    pub(super) fn email_autolink(&self, offset: usize, end: usize) -> Option<(Element, usize)> {
        let rest = self.rest(offset, end);
        let at = rest.find(|c: char| !is_email_local(c))?;
        if at == 0 || rest.get(at..)?.chars().next() != Some('@') {
            return None;
        }
        let domain_start = at + 1;
        let domain_all = rest.get(domain_start..)?;
        let domain_len = domain_all
            .find(|c: char| !is_email_domain(c))
            .unwrap_or(domain_all.len());
        let domain = domain_all.get(..domain_len)?.trim_end_matches('.');
        let valid = domain.contains('.')
            && !domain.starts_with(['.', '-'])
            && !domain.contains("..")
            && domain
                .rsplit('.')
                .next()
                .is_some_and(|tld| tld.chars().all(char::is_alphabetic) && tld.len() >= 2);
        if !valid {
            return None;
        }
        let address_len = domain_start + domain.len();
        if self
            .char_at(offset + address_len)
            .is_some_and(|c| is_word(c) || c == '@')
        {
            return None;
        }
        Some((
            Element::Email(Email {
                address: rest.get(..address_len)?.to_string(),
                elements: Vec::new(),
            }),
            offset + address_len,
        ))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::{
        inlines::parse_text,
        model::{AttributeStore, SourceLocation},
    };

    fn parse(text: &str) -> Vec<Element> {
        parse_text(text, &SourceLocation::new(None, 2), &AttributeStore::new())
    }

    fn string(text: &str) -> Element {
        Element::String(text.to_string())
    }

    #[rstest]
    #[case("https://example.org/a.", "https://example.org/a")]
    #[case("https://example.org/(x))", "https://example.org/(x)")]
    #[case("https://example.org/?q=1!", "https://example.org/?q=1")]
    #[case("https://example.org", "https://example.org")]
    fn trims_trailing_punctuation(#[case] candidate: &str, #[case] expected: &str) {
        assert_eq!(trim_url(candidate), expected);
    }

    #[test]
    fn link_macro_with_text() {
        assert_eq!(
            parse("see link:docs/index.html[the *docs*] now"),
            vec![
                string("see "),
                Element::Link(Link {
                    url: "docs/index.html".into(),
                    form: LinkForm::Macro,
                    elements: vec![
                        string("the "),
                        Element::Bold(crate::model::FormattedText {
                            form: crate::model::Form::Constrained,
                            elements: vec![string("docs")],
                        }),
                    ],
                }),
                string(" now"),
            ]
        );
    }

    #[test]
    fn url_followed_by_text_becomes_a_macro() {
        assert_eq!(
            parse("https://example.org[Example]"),
            vec![Element::Link(Link {
                url: "https://example.org".into(),
                form: LinkForm::Macro,
                elements: vec![string("Example")],
            })]
        );
    }

    #[test]
    fn angle_bracketed_url() {
        assert_eq!(
            parse("<https://example.org>"),
            vec![Element::Link(Link {
                url: "https://example.org".into(),
                form: LinkForm::Autolink,
                elements: vec![],
            })]
        );
    }

    #[test]
    fn escaped_url_stays_text() {
        assert_eq!(parse(r"\https://example.org"), vec![string("https://example.org")]);
    }

    #[test]
    fn mailto_and_xref_macros() {
        let elements = parse("mailto:a@b.org[Write] xref:install[Install it]");
        assert_eq!(
            elements,
            vec![
                Element::Email(Email {
                    address: "a@b.org".into(),
                    elements: vec![string("Write")],
                }),
                string(" "),
                Element::CrossReference(CrossReference {
                    id: "install".into(),
                    elements: vec![string("Install it")],
                    format: XrefFormat::Macro,
                    location: SourceLocation::new(None, 2),
                    resolution: None,
                }),
            ]
        );
    }

    #[test]
    fn anchor_macro_unescapes_brackets() {
        assert_eq!(
            parse(r"anchor:note[see \[1\]]"),
            vec![Element::Anchor(Anchor {
                id: "note".into(),
                label: vec![string("see [1]")],
                location: SourceLocation::new(None, 2),
            })]
        );
    }

    #[rstest]
    #[case("user@localhost")]
    #[case("a@b.c")]
    #[case("@example.com")]
    fn rejects_non_addresses(#[case] text: &str) {
        assert_eq!(parse(text), vec![string(text)]);
    }

    #[test]
    fn macros_need_a_word_boundary() {
        assert_eq!(parse("xlink:a[b]"), vec![string("xlink:a[b]")]);
    }
}
