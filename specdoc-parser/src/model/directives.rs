//! Preprocessor directives that surface in the tree when the preprocessor is turned
//! off, and attribute entries, which the block parser always records.
use std::path::PathBuf;

use serde::Serialize;

use crate::model::{AttributeList, SourceLocation};

/// `:name: value`
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AttributeEntry {
    pub name: String,
    pub value: String,
    pub location: SourceLocation,
}

/// `:name!:` or `:!name:`
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AttributeReset {
    pub name: String,
    pub location: SourceLocation,
}

/// `include::target[attributes]`
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FileInclude {
    pub target: String,
    #[serde(skip_serializing_if = "AttributeList::is_empty")]
    pub attributes: AttributeList,
    pub location: SourceLocation,
}

/// How the names of an `ifdef`/`ifndef` combine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Union {
    /// `a,b`: any one of the names.
    #[default]
    Any,
    /// `a+b`: every name.
    All,
}

/// `ifdef::names[]` or `ifndef::names[]`, with inline text when written
/// `ifdef::names[text]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Conditional {
    pub names: Vec<String>,
    pub union: Union,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub location: SourceLocation,
}

/// `ifeval::[expression]`
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IfEval {
    pub expression: String,
    pub location: SourceLocation,
}

/// `endif::names[]`
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EndIf {
    pub names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub location: SourceLocation,
}

/// Which part of an included file was selected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum IncludeSelection {
    All,
    Lines(String),
    Tags(String),
}

/// A file brought into the document by an include directive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IncludedFile {
    pub path: PathBuf,
    pub selection: IncludeSelection,
    /// Nesting depth; files included by the root document are at depth 1.
    pub depth: usize,
    /// Where the directive was written.
    pub location: SourceLocation,
}
