use std::{fmt, str::FromStr};

use encoding_rs::Encoding;

use crate::{
    Diagnostics,
    blocks::attribute_list,
    model::{
        Attribute, AttributeList, AttributeStore, Element, FileInclude, IncludeSelection,
        SourceLocation,
    },
    preprocessor::tag::{self, DELIMITERS, Filter},
    source,
};

/**
The format of an include directive is the following:

`include::target[leveloffset=offset,lines=ranges,tag(s)=name(s),indent=depth,encoding=encoding,opts=optional]`

The target is required. It may be an absolute path or a path relative to the file
that contains the directive. Both the target and the attribute list go through
attribute substitution before they are interpreted.

The include directive can be escaped with a leading backslash, in which case the line
is kept as written, backslash included:

`\include::just-an-example.ext[]`
*/
#[derive(Debug)]
pub(crate) struct Include {
    pub(crate) target: String,
    /// The substituted attribute text, as it appears between the brackets.
    pub(crate) raw_attributes: String,
    pub(crate) level_offset: Option<LevelOffset>,
    lines: Option<(String, Vec<LinesRange>)>,
    tags: Option<(String, Vec<Filter>)>,
    indent: Option<usize>,
    pub(crate) encoding: Option<&'static Encoding>,
    pub(crate) optional: bool,
}

/// A line range that an include may specify.
///
/// If the range contains `..` then it is a range of lines, if not, it is parsed as a
/// single line. An open end (`5..` or `5..-1`) runs to the end of the file.
///
/// There can be multiple of these in an include definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LinesRange {
    Single(usize),
    Range { start: usize, end: Option<usize> },
}

/// `leveloffset=2` sets the offset, `leveloffset=+1` and `leveloffset=-1` shift it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LevelOffset {
    Absolute(i32),
    Relative(i32),
}

peg::parser! {
    grammar include_parser() for str {
        pub(crate) rule include() -> (&'input str, &'input str)
            = "include::" target:target() "[" attrs:$((!("]" ![_]) [_])*) "]" ![_] {
                (target, attrs)
            }

        rule target() -> &'input str
            = t:$(!['[' | ' ' | '\t'] (!"[" [_])*) {?
                if t.ends_with([' ', '\t']) { Err("target") } else { Ok(t) }
            }
    }
}

/// Splits an include directive line into its target and attribute text without
/// interpreting either.
pub(crate) fn split_directive(line: &str) -> Option<(&str, &str)> {
    include_parser::include(line).ok()
}

/// The tree node for an include directive that is not expanded.
pub(crate) fn raw_element(line: &str, location: SourceLocation) -> Option<Element> {
    let (target, attributes) = split_directive(line)?;
    Some(Element::FileInclude(FileInclude {
        target: target.to_string(),
        attributes: attribute_list::parse(attributes, false),
        location,
    }))
}

impl FromStr for LinesRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let number = |text: &str| -> Result<usize, String> {
            match text.trim().parse::<usize>() {
                Ok(0) | Err(_) => Err(format!("invalid line number '{text}'")),
                Ok(n) => Ok(n),
            }
        };
        match s.split_once("..") {
            Some((start, end)) => {
                let start = number(start)?;
                let end = match end.trim() {
                    "" | "-1" => None,
                    end => Some(number(end)?),
                };
                if end.is_some_and(|end| end < start) {
                    return Err(format!("range '{s}' ends before it starts"));
                }
                Ok(LinesRange::Range { start, end })
            }
            None => Ok(LinesRange::Single(number(s)?)),
        }
    }
}

impl LinesRange {
    /// Parses a `;` or `,` separated list of ranges. Invalid entries are reported and
    /// select nothing.
    fn parse_list(
        value: &str,
        location: &SourceLocation,
        diagnostics: &mut Diagnostics,
    ) -> Vec<Self> {
        value
            .split(DELIMITERS)
            .filter(|range| !range.trim().is_empty())
            .filter_map(|range| match range.parse() {
                Ok(range) => Some(range),
                Err(error) => {
                    diagnostics.warn(
                        Some(location),
                        format!("{error} in include directive lines attribute, ignoring it"),
                    );
                    None
                }
            })
            .collect()
    }

    fn contains(self, line: usize) -> bool {
        match self {
            LinesRange::Single(number) => number == line,
            LinesRange::Range { start, end } => line >= start && end.is_none_or(|end| line <= end),
        }
    }
}

impl FromStr for LevelOffset {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(shift) = s.strip_prefix('+') {
            Ok(LevelOffset::Relative(shift.parse()?))
        } else if s.starts_with('-') {
            Ok(LevelOffset::Relative(s.parse()?))
        } else {
            Ok(LevelOffset::Absolute(s.parse()?))
        }
    }
}

impl LevelOffset {
    pub(crate) fn apply(self, current: i32) -> i32 {
        match self {
            LevelOffset::Absolute(offset) => offset,
            LevelOffset::Relative(shift) => current.saturating_add(shift),
        }
    }
}

impl fmt::Display for Include {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "include::{}[{}]", self.target, self.raw_attributes)
    }
}

impl Include {
    /// Reads an include directive, substituting attribute references in the target and
    /// the attribute list. Returns `None` when the line is not an include directive.
    pub(crate) fn parse(
        line: &str,
        attributes: &AttributeStore,
        location: &SourceLocation,
        diagnostics: &mut Diagnostics,
    ) -> Option<Self> {
        let (target, raw_attributes) = split_directive(line)?;
        let target = attributes.substitute(target).into_owned();
        let raw_attributes = attributes.substitute(raw_attributes).into_owned();
        let list = attribute_list::parse(&raw_attributes, false);

        let mut include = Include {
            target,
            optional: list.has_option("optional"),
            raw_attributes,
            level_offset: None,
            lines: None,
            tags: None,
            indent: None,
            encoding: None,
        };
        include.apply_attributes(&list, location, diagnostics);
        Some(include)
    }

    fn apply_attributes(
        &mut self,
        list: &AttributeList,
        location: &SourceLocation,
        diagnostics: &mut Diagnostics,
    ) {
        for attribute in list.iter() {
            let (name, value) = match attribute {
                Attribute::Named(named) => (named.name.as_str(), named.value.as_str()),
                Attribute::Positional(positional) => {
                    diagnostics.warn(
                        Some(location),
                        format!("unknown include attribute '{}'", positional.value),
                    );
                    continue;
                }
                Attribute::Shorthand(_) | Attribute::Title(_) | Attribute::Anchor(_) => continue,
            };
            match name {
                "leveloffset" => match value.parse() {
                    Ok(offset) => self.level_offset = Some(offset),
                    Err(_) => diagnostics.warn(
                        Some(location),
                        format!("invalid leveloffset '{value}' in include directive"),
                    ),
                },
                "lines" => {
                    let ranges = LinesRange::parse_list(value, location, diagnostics);
                    self.lines = Some((value.to_string(), ranges));
                }
                "tag" | "tags" => {
                    self.tags = Some((value.to_string(), Filter::parse_list(value)));
                }
                "indent" => match value.trim().parse() {
                    Ok(indent) => self.indent = Some(indent),
                    Err(_) => diagnostics.warn(
                        Some(location),
                        format!("invalid indent '{value}' in include directive"),
                    ),
                },
                "encoding" => match source::encoding_for_label(value) {
                    Some(encoding) => self.encoding = Some(encoding),
                    None => diagnostics.warn(
                        Some(location),
                        format!("unknown encoding '{value}' in include directive, using the default"),
                    ),
                },
                "opts" | "options" => {}
                name if name.ends_with("-option") => {}
                unknown => {
                    diagnostics.warn(
                        Some(location),
                        format!("unknown include attribute '{unknown}'"),
                    );
                }
            }
        }
    }

    #[must_use]
    pub(crate) fn selection(&self) -> IncludeSelection {
        match (&self.lines, &self.tags) {
            (Some((text, _)), _) => IncludeSelection::Lines(text.clone()),
            (None, Some((text, _))) => IncludeSelection::Tags(text.clone()),
            (None, None) => IncludeSelection::All,
        }
    }

    /// Picks the lines of the included file this directive asks for, numbered from 1.
    /// `lines=` takes precedence over `tags=`.
    pub(crate) fn select(
        &self,
        content: &str,
        file: &SourceLocation,
        diagnostics: &mut Diagnostics,
    ) -> Vec<(usize, String)> {
        let numbered: Vec<(usize, String)> = source::split_lines(content)
            .into_iter()
            .enumerate()
            .map(|(index, line)| (index + 1, line))
            .collect();

        let mut selected = match (&self.lines, &self.tags) {
            (Some((_, ranges)), tags) => {
                if tags.is_some() {
                    tracing::debug!(target = %self.target, "lines attribute takes precedence over tags");
                }
                numbered
                    .into_iter()
                    .filter(|(number, _)| ranges.iter().any(|range| range.contains(*number)))
                    .collect()
            }
            (None, Some((_, filters))) => tag::select_lines(numbered, filters, file, diagnostics),
            (None, None) => numbered,
        };
        if let Some(indent) = self.indent {
            reindent(&mut selected, indent);
        }
        selected
    }

    /// The line put in place of an include that could not be read.
    pub(crate) fn unresolved_line(&self, location: &SourceLocation) -> String {
        let file = location
            .file
            .as_ref()
            .map_or_else(|| "<input>".to_string(), |file| file.display().to_string());
        format!("Unresolved directive in {file} - {self}")
    }
}

/// Removes the common leading indentation of non-blank lines and indents them by
/// `indent` spaces instead.
fn reindent(lines: &mut [(usize, String)], indent: usize) {
    let common = lines
        .iter()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(_, line)| line.len() - line.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);
    let padding = " ".repeat(indent);
    for (_, line) in lines.iter_mut() {
        if line.trim().is_empty() {
            continue;
        }
        let rest = line.get(common..).unwrap_or_default();
        *line = format!("{padding}{rest}");
    }
}
