use crate::model::SourceLocation;

/// Maps byte offsets in joined paragraph text back to the source line they came from.
///
/// Paragraph lines are not always consecutive in the source (comment lines are
/// dropped, included files interleave), so each line keeps its own location instead
/// of counting newlines from the first one.
#[derive(Debug, Clone, Default)]
pub(crate) struct LineMap {
    /// Byte offset where each line starts, with that line's location.
    line_starts: Vec<(usize, SourceLocation)>,
}

impl LineMap {
    pub(crate) fn push(&mut self, start: usize, location: SourceLocation) {
        self.line_starts.push((start, location));
    }

    /// Location of the line holding `offset`. Binary search, so lookups stay cheap for
    /// long paragraphs.
    pub(crate) fn location(&self, offset: usize) -> SourceLocation {
        let index = self
            .line_starts
            .partition_point(|(start, _)| *start <= offset)
            .saturating_sub(1);
        self.line_starts
            .get(index)
            .map(|(_, location)| location.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn offsets_map_to_their_line() {
        let mut map = LineMap::default();
        map.push(0, SourceLocation::new(None, 4));
        map.push(6, SourceLocation::new(Some("part.adoc".into()), 1));
        assert_eq!(map.location(0).line, 4);
        assert_eq!(map.location(5).line, 4);
        assert_eq!(map.location(6), SourceLocation::new(Some("part.adoc".into()), 1));
        assert_eq!(map.location(100).line, 1);
    }

    #[test]
    fn empty_map_falls_back_to_default() {
        assert_eq!(LineMap::default().location(3), SourceLocation::default());
    }
}
