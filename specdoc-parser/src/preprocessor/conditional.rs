use std::cmp::Ordering;

use crate::model::{AttributeStore, Conditional, EndIf, Element, IfEval, SourceLocation, Union};

/// A conditional preprocessor directive line.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Directive {
    IfDef(Condition),
    IfNDef(Condition),
    IfEval {
        target: String,
        expression: String,
    },
    EndIf {
        names: Vec<String>,
        text: Option<String>,
    },
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Condition {
    pub(crate) names: Vec<String>,
    pub(crate) union: Union,
    /// Inline form: `ifdef::name[text]`.
    pub(crate) text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operator {
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Operand<'a> {
    text: &'a str,
    quoted: bool,
}

peg::parser! {
    grammar conditional_parser() for str {
        pub(crate) rule directive() -> Directive
            = "ifdef::" names:names() "[" text:body() "]" ![_] {
                Directive::IfDef(Condition::new(names, text))
            }
            / "ifndef::" names:names() "[" text:body() "]" ![_] {
                Directive::IfNDef(Condition::new(names, text))
            }
            / "ifeval::" target:$((!"[" [_])*) "[" expression:body() "]" ![_] {
                Directive::IfEval {
                    target: target.trim().to_string(),
                    expression: expression.to_string(),
                }
            }
            / "endif::" names:names() "[" text:body() "]" ![_] {
                Directive::EndIf {
                    names: names.0,
                    text: (!text.is_empty()).then(|| text.to_string()),
                }
            }

        pub(crate) rule expression() -> (Operand<'input>, Operator, Operand<'input>)
            = ws() left:operand() ws() operator:operator() ws() right:operand() ws() ![_] {
                (left, operator, right)
            }

        rule names() -> (Vec<String>, Union)
            = first:name() "+" rest:(name() ++ "+") {
                let mut names = vec![first];
                names.extend(rest);
                (names, Union::All)
            }
            / names:(name() ** ",") { (names, Union::Any) }

        rule name() -> String
            = n:$((!['[' | ']' | ',' | '+'] [_])+) {
                n.trim().to_string()
            }

        rule body() -> &'input str
            = $((!("]" ![_]) [_])*)

        rule operand() -> Operand<'input>
            = "'" text:$((!"'" [_])*) "'" { Operand { text, quoted: true } }
            / "\"" text:$((!"\"" [_])*) "\"" { Operand { text, quoted: true } }
            / text:$((!operator() ![' ' | '\t'] [_])+) { Operand { text, quoted: false } }

        rule operator() -> Operator
            = "==" { Operator::Equal }
            / "!=" { Operator::NotEqual }
            / "<=" { Operator::LessThanOrEqual }
            / ">=" { Operator::GreaterThanOrEqual }
            / "<" { Operator::LessThan }
            / ">" { Operator::GreaterThan }

        rule ws() = [' ' | '\t']*
    }
}

impl Condition {
    fn new(names: (Vec<String>, Union), text: &str) -> Self {
        Self {
            names: names.0,
            union: names.1,
            text: (!text.is_empty()).then(|| text.to_string()),
        }
    }

    /// `ifdef::[]` names nothing and is left in the output as written.
    pub(crate) fn is_inert(&self) -> bool {
        self.names.is_empty()
    }

    pub(crate) fn is_defined(&self, attributes: &AttributeStore) -> bool {
        match self.union {
            Union::Any => self.names.iter().any(|name| attributes.is_set(name)),
            Union::All => self.names.iter().all(|name| attributes.is_set(name)),
        }
    }

    fn into_element(self, location: SourceLocation) -> Conditional {
        Conditional {
            names: self.names,
            union: self.union,
            text: self.text,
            location,
        }
    }
}

impl Directive {
    /// Recognizes a conditional directive line. Lines that only look similar are not
    /// directives and yield `None`.
    pub(crate) fn parse(line: &str) -> Option<Self> {
        if !line.starts_with("if") && !line.starts_with("endif::") {
            return None;
        }
        conditional_parser::directive(line).ok()
    }

    /// The node recorded when directives are kept rather than evaluated.
    pub(crate) fn into_element(self, location: SourceLocation) -> Element {
        match self {
            Directive::IfDef(condition) => Element::IfDef(condition.into_element(location)),
            Directive::IfNDef(condition) => Element::IfNDef(condition.into_element(location)),
            Directive::IfEval { expression, .. } => Element::IfEval(IfEval {
                expression,
                location,
            }),
            Directive::EndIf { names, text } => Element::EndIf(EndIf {
                names,
                text,
                location,
            }),
        }
    }
}

impl Operand<'_> {
    fn resolve(&self, attributes: &AttributeStore) -> String {
        if !self.quoted && self.text == "nil" {
            return String::new();
        }
        attributes.substitute_or_empty(self.text)
    }
}

/// Evaluates an `ifeval` expression.
///
/// Attribute references are substituted first, with unset attributes becoming empty.
/// Operands that both read as integers compare numerically; anything else compares
/// as text.
///
/// # Errors
///
/// Returns a description of the problem when `expression` is not a comparison.
pub(crate) fn evaluate(expression: &str, attributes: &AttributeStore) -> Result<bool, String> {
    let (left, operator, right) = conditional_parser::expression(expression)
        .map_err(|error| format!("malformed ifeval expression '{expression}': {error}"))?;
    let left = left.resolve(attributes);
    let right = right.resolve(attributes);

    let ordering = match (left.trim().parse::<i64>(), right.trim().parse::<i64>()) {
        (Ok(left), Ok(right)) => left.cmp(&right),
        _ => left.as_str().cmp(right.as_str()),
    };
    tracing::trace!(%left, %right, ?operator, ?ordering, "evaluated ifeval");

    Ok(match operator {
        Operator::Equal => ordering == Ordering::Equal,
        Operator::NotEqual => ordering != Ordering::Equal,
        Operator::LessThan => ordering == Ordering::Less,
        Operator::GreaterThan => ordering == Ordering::Greater,
        Operator::LessThanOrEqual => ordering != Ordering::Greater,
        Operator::GreaterThanOrEqual => ordering != Ordering::Less,
    })
}
