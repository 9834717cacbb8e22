use rustc_hash::FxHashSet;

use crate::{Diagnostics, model::SourceLocation};

pub(crate) const DELIMITERS: [char; 2] = [';', ','];

/// One selector from a `tag=` or `tags=` attribute.
///
/// - `name` selects lines inside regions tagged `name`, `!name` excludes them
/// - `*` selects every tagged line, `!*` excludes every tagged line
/// - `**` selects every line, tagged or not, `!**` excludes every line
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Filter {
    Named { name: String, include: bool },
    Wildcard { include: bool },
    DoubleWildcard { include: bool },
}

impl Filter {
    pub(crate) fn parse(selector: &str) -> Option<Self> {
        let selector = selector.trim();
        let (include, pattern) = match selector.strip_prefix('!') {
            Some(rest) => (false, rest.trim()),
            None => (true, selector),
        };
        match pattern {
            "" => None,
            "**" => Some(Filter::DoubleWildcard { include }),
            "*" => Some(Filter::Wildcard { include }),
            name => Some(Filter::Named {
                name: name.to_string(),
                include,
            }),
        }
    }

    pub(crate) fn parse_list(selectors: &str) -> Vec<Self> {
        selectors.split(DELIMITERS).filter_map(Filter::parse).collect()
    }

    fn include(&self) -> bool {
        match self {
            Filter::Named { include, .. }
            | Filter::Wildcard { include }
            | Filter::DoubleWildcard { include } => *include,
        }
    }

    /// Whether this selector speaks about a line inside the regions in `context`.
    fn matches(&self, context: &[String]) -> bool {
        match self {
            Filter::Named { name, .. } => context.iter().any(|open| open == name),
            Filter::Wildcard { .. } => !context.is_empty(),
            Filter::DoubleWildcard { .. } => true,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum TagDirective<'a> {
    Start(&'a str),
    End(&'a str),
}

/// Extracts a `tag::name[]` or `end::name[]` directive from a line.
///
/// Directives may follow a comment marker (`// tag::name[]`, `# end::name[]`) but must
/// start at a word boundary, and the name must not contain spaces or brackets.
fn extract_tag_directive(line: &str) -> Option<TagDirective<'_>> {
    for keyword in ["tag::", "end::"] {
        let Some(pos) = line.find(keyword) else {
            continue;
        };
        let preceded_by_word = line
            .get(..pos)
            .and_then(|before| before.chars().next_back())
            .is_some_and(|c| c.is_alphanumeric() || c == '_');
        if preceded_by_word {
            continue;
        }
        let after_keyword = line.get(pos + keyword.len()..).unwrap_or_default();
        let Some(bracket_pos) = after_keyword.find("[]") else {
            continue;
        };
        let name = after_keyword.get(..bracket_pos).unwrap_or_default();
        if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c == '[' || c == ']') {
            continue;
        }
        return Some(if keyword == "tag::" {
            TagDirective::Start(name)
        } else {
            TagDirective::End(name)
        });
    }
    None
}

/// Selects the lines of an included file that `filters` ask for.
///
/// Each content line is judged against the tags open around it: the last selector
/// that matches decides, and a line no selector matches is kept only when there are
/// no positive selectors. Tag directive lines are always dropped.
pub(crate) fn select_lines(
    lines: Vec<(usize, String)>,
    filters: &[Filter],
    path: &SourceLocation,
    diagnostics: &mut Diagnostics,
) -> Vec<(usize, String)> {
    let default = !filters.iter().any(Filter::include);
    let mut context: Vec<String> = Vec::new();
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut selected = Vec::new();

    for (number, line) in lines {
        let location = SourceLocation::new(path.file.clone(), number);
        match extract_tag_directive(&line) {
            Some(TagDirective::Start(name)) => {
                seen.insert(name.to_string());
                context.push(name.to_string());
            }
            Some(TagDirective::End(name)) => match context.iter().rposition(|open| open == name) {
                Some(index) if index + 1 == context.len() => {
                    context.pop();
                }
                Some(index) => {
                    let expected = context.last().cloned().unwrap_or_default();
                    diagnostics.warn(
                        Some(&location),
                        format!("mismatched end tag (expected '{expected}' but found '{name}')"),
                    );
                    context.remove(index);
                }
                None => {
                    diagnostics.warn(Some(&location), format!("unexpected end tag '{name}'"));
                }
            },
            None => {
                let verdict = filters
                    .iter()
                    .rev()
                    .find(|filter| filter.matches(&context))
                    .map_or(default, Filter::include);
                if verdict {
                    selected.push((number, line));
                }
            }
        }
    }

    for open in context {
        diagnostics.warn(Some(path), format!("detected unclosed tag '{open}'"));
    }
    for filter in filters {
        if let Filter::Named {
            name,
            include: true,
        } = filter
            && !seen.contains(name)
        {
            diagnostics.warn(Some(path), format!("tag '{name}' not found in include file"));
        }
    }
    selected
}
