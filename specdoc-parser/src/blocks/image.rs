use crate::model::{AttributeList, BlockImage, Element, SourceLocation};

use super::{BlockParser, attribute_list};

/// Names taken by the positional attributes of an image macro.
const IMPLIED_NAMES: [&str; 3] = ["alt", "width", "height"];

/// `image::target[attributes]` alone on a line.
fn split_macro(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix("image::")?;
    let rest = rest.trim_end().strip_suffix(']')?;
    let (target, attributes) = rest.split_once('[')?;
    (!target.is_empty() && !target.contains(char::is_whitespace)).then_some((target, attributes))
}

impl BlockParser<'_> {
    #[tracing::instrument(level = "trace", skip(self, pending))]
    pub(super) fn block_image(
        &mut self,
        text: &str,
        location: &SourceLocation,
        pending: &mut AttributeList,
    ) -> Option<Element> {
        let (target, content) = split_macro(text)?;
        let content = self.attributes.substitute(content);
        let mut own = attribute_list::parse(&content, false);
        own.assign_implied_names(1, &IMPLIED_NAMES);

        let mut attributes = std::mem::take(pending);
        attributes.append(&mut own);
        Some(Element::BlockImage(BlockImage {
            attributes,
            target: self.attributes.substitute(target).into_owned(),
            location: location.clone(),
        }))
    }
}
