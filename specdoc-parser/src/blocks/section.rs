use crate::{
    Diagnostics,
    model::{AttributeList, AttributeState, Element, Section, SourceLocation, to_plain_text},
    inlines,
    xref::IdRules,
};

use super::BlockParser;

/// Deepest section level a title can reach after `leveloffset` is applied.
const MAX_LEVEL: i64 = 5;

/// `== Title`: returns the length of the `=` run and the title text. A trailing
/// run of `=` (the symmetric form) is dropped.
pub(super) fn heading(text: &str) -> Option<(usize, &str)> {
    let run = text.chars().take_while(|c| *c == '=').count();
    if !(1..=6).contains(&run) {
        return None;
    }
    let rest = text.get(run..)?;
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    let title = rest.trim();
    let title = match title.strip_suffix(|c| c == '=') {
        Some(stripped) => {
            let stripped = stripped.trim_end_matches('=');
            if stripped.ends_with([' ', '\t']) {
                stripped.trim_end()
            } else {
                title
            }
        }
        None => title,
    };
    (!title.is_empty()).then_some((run, title))
}

/// Map a two-line title's underline character to the `=` run of the equivalent
/// one-line title.
///
/// | Character | Level                    |
/// |-----------|--------------------------|
/// | `=`       | 0 (document title)       |
/// | `-`       | 1                        |
/// | `~`       | 2                        |
/// | `^`       | 3                        |
/// | `+`       | 4                        |
fn underline_run(c: char) -> Option<usize> {
    match c {
        '=' => Some(1),
        '-' => Some(2),
        '~' => Some(3),
        '^' => Some(4),
        '+' => Some(5),
        _ => None,
    }
}

/// Whether `underline` underlines `title`: a single repeated level character whose
/// width is within one character of the title's.
pub(super) fn setext_run(title: &str, underline: &str) -> Option<usize> {
    let mut chars = underline.chars();
    let first = chars.next()?;
    let run = underline_run(first)?;
    let width = underline.chars().count();
    if width < 2 || !chars.all(|c| c == first) {
        return None;
    }
    (title.trim_end().chars().count().abs_diff(width) <= 1).then_some(run)
}

impl BlockParser<'_> {
    /// The `=` run of a two-line title starting at `text`, if the next line
    /// underlines it. A line that closes an enclosing block is never an underline.
    pub(super) fn setext_heading(&mut self, text: &str) -> Option<usize> {
        if !self.options.setext || !text.starts_with(inlines::is_word) {
            return None;
        }
        let underline = self.peek_second()?;
        if underline.synthetic {
            return None;
        }
        let underline = underline.text.clone();
        if self
            .enclosing
            .iter()
            .any(|delimiter| delimiter.is_closed_by(&underline))
        {
            return None;
        }
        setext_run(text, &underline)
    }

    pub(super) fn section(
        &mut self,
        run: usize,
        title: &str,
        location: &SourceLocation,
        attributes: AttributeList,
    ) -> Section {
        let offset = self
            .attributes
            .get("leveloffset")
            .and_then(|value| value.trim().trim_start_matches('+').parse::<i64>().ok())
            .unwrap_or(0);
        let run = i64::try_from(run).unwrap_or(MAX_LEVEL);
        let level = u8::try_from((run - 1 + offset).clamp(0, MAX_LEVEL)).unwrap_or_default();

        if level == 0 && matches!(self.attributes.state("doctitle"), AttributeState::NeverSet) {
            let doctitle = self.attributes.substitute(title).into_owned();
            self.attributes.set("doctitle", doctitle);
        }

        let title_elements = inlines::parse_text(title, location, &self.attributes);
        let rules = IdRules::new(&self.attributes);
        let generated_id = rules
            .enabled
            .then(|| rules.generate(to_plain_text(&title_elements).trim()));

        tracing::debug!(%title, level, ?generated_id, "section");
        Section {
            attributes,
            title: title_elements,
            level,
            id: None,
            generated_id,
            elements: Vec::new(),
            location: location.clone(),
        }
    }
}

/// The sections open at the current position, innermost last. Blocks go to the
/// innermost open section, or to the root when none is open.
#[derive(Debug, Default)]
pub(super) struct SectionStack {
    root: Vec<Element>,
    open: Vec<Section>,
}

impl SectionStack {
    pub(super) fn push(&mut self, element: Element) {
        match self.open.last_mut() {
            Some(section) => section.elements.push(element),
            None => self.root.push(element),
        }
    }

    /// Opens `section` under the innermost open section one level above it. Open
    /// sections that are not its parent are closed first, so a title that skips a
    /// level ends up at the root rather than nested out of sequence.
    pub(super) fn open(&mut self, section: Section, diagnostics: &mut Diagnostics) {
        let expected = self.open.last().map_or(1, |parent| parent.level + 1);
        if section.level > expected {
            diagnostics.warn(
                Some(&section.location),
                format!(
                    "section title out of sequence: expected level {expected}, got level {}",
                    section.level
                ),
            );
        }
        while self
            .open
            .last()
            .is_some_and(|parent| parent.level + 1 != section.level)
        {
            self.close_innermost();
        }
        self.open.push(section);
    }

    fn close_innermost(&mut self) {
        if let Some(section) = self.open.pop() {
            self.push(Element::Section(section));
        }
    }

    pub(super) fn finish(mut self) -> Vec<Element> {
        while !self.open.is_empty() {
            self.close_innermost();
        }
        self.root
    }
}
