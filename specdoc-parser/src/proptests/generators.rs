//! Input generators for the property tests.
#![allow(clippy::expect_used)]
use proptest::prelude::*;

/// Any string, control characters included.
pub fn any_document_string() -> impl Strategy<Value = String> {
    prop::string::string_regex(".*").expect("Failed to create any string strategy")
}

/// Printable ASCII with newlines and tabs.
pub fn ascii_document() -> impl Strategy<Value = String> {
    prop::string::string_regex(r"[\x20-\x7E\n\t]*").expect("Failed to create ASCII string strategy")
}

/// Documents assembled from the constructs the parser knows, in any order, so
/// delimiters, conditionals and tables are frequently left open or mismatched.
pub fn structured_document() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just("= Title\n\n".to_string()),
            Just("== Section\n\n".to_string()),
            Just("=== Subsection <<section>>\n\n".to_string()),
            Just("==== Deep\n\n".to_string()),
            Just("Setext\n------\n".to_string()),
            Just("* list item\n** nested\n+\ncontinued\n".to_string()),
            Just(". first\n. second\n".to_string()),
            Just("term:: description\n".to_string()),
            Just("----\ncode block\n".to_string()),
            Just("----\n".to_string()),
            Just("====\nexample\n".to_string()),
            Just("|===\n| a | b\n|c\n".to_string()),
            Just("|===\n".to_string()),
            Just("[cols=\"2*,3a\"]\n".to_string()),
            Just("2+| span .2+^.>s| cell\n".to_string()),
            Just("a| nested\n!===\n! x ! y\n!===\n".to_string()),
            Just("ifdef::attr[]\n".to_string()),
            Just("ifeval::['{leveloffset}' == '0']\n".to_string()),
            Just("endif::[]\n".to_string()),
            Just(":attr: value \\\n".to_string()),
            Just(":leveloffset: +1\n".to_string()),
            Just("include::missing.adoc[tags=a;!b,leveloffset=+1]\n".to_string()),
            Just("[[anchor,Label]]\n".to_string()),
            Just("[#id.role%opt,name=\"quoted\"]\n".to_string()),
            Just(".Block title\n".to_string()),
            Just("<<anchor>> <<Section>> xref:missing[]\n".to_string()),
            Just("*bold* _italic_ `mono` ^sup^ {attr}\n".to_string()),
            Just("\n".to_string()),
            prop::string::string_regex(r"[a-zA-Z0-9 .,!?*_`#<>|:\[\]=\n-]+")
                .expect("Failed to create text chunk"),
        ],
        0..30,
    )
    .prop_map(|chunks| chunks.join(""))
}

/// A run of section titles at arbitrary levels, some skipping levels.
pub fn section_outline() -> impl Strategy<Value = String> {
    prop::collection::vec((1usize..=6, "[A-Za-z]{1,8}"), 0..25).prop_map(|titles| {
        titles
            .into_iter()
            .map(|(run, title)| format!("{} {title}\n\ntext\n\n", "=".repeat(run)))
            .collect()
    })
}

/// Sections whose titles reference each other by ID, including themselves.
pub fn cross_referencing_titles() -> impl Strategy<Value = String> {
    prop::collection::vec((0usize..6, 0usize..6, any::<bool>()), 1..8).prop_map(|sections| {
        sections
            .into_iter()
            .enumerate()
            .map(|(index, (target, other, explicit))| {
                let id = format!("s{}", index % 6);
                let text = if explicit { ",text" } else { "" };
                format!("[#{id}]\n== Title <<s{target}{text}>> <<s{other}>>\n\n<<{id}>>\n\n")
            })
            .collect()
    })
}
