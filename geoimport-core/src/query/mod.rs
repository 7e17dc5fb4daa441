//! Filter-query synthesis for Overpass-style endpoints.
//!
//! A user supplies a tag expression such as `amenity=drinking_water` or an
//! element expression such as `(node[amenity=bench];way[amenity=bench];)`.
//! The builder strips any settings prologue and output epilogue the user
//! pasted, then restricts every element statement to an area clause and
//! wraps the result in exactly one JSON settings statement and one output
//! statement.
//!
//! ```
//! use geoimport_core::query::{GeometryMode, build};
//!
//! let query = build("amenity=drinking_water", GeometryMode::Geom, None).unwrap();
//! assert_eq!(
//!     query,
//!     "[out:json];nwr[amenity=drinking_water]({south},{west},{north},{east});out geom;"
//! );
//! ```

mod lexer;
mod spec;

use std::fmt;

use thiserror::Error;

use crate::{BoundaryChoice, ValidationError};

pub use spec::{
    GeometryMode, QuerySpec, UnknownGeometryMode, VIEWPORT_PLACEHOLDERS, substitute_viewport,
};

/// Errors raised while building a query.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum QueryError {
    /// Nothing is left once settings and output statements are stripped.
    #[error("query expression is empty")]
    EmptyExpression,
    /// The caller requires an area and no boundary was provided.
    #[error("a boundary is required for this query")]
    BoundaryRequired,
}

impl From<QueryError> for ValidationError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::EmptyExpression => Self::EmptyExpression,
            QueryError::BoundaryRequired => Self::BoundaryRequired,
        }
    }
}

impl From<QueryError> for crate::ImportError {
    fn from(err: QueryError) -> Self {
        Self::Validation(err.into())
    }
}

/// Spatial restriction appended to each element statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaFilter<'a> {
    /// Restrict to a resolved boundary.
    Boundary(&'a str),
    /// Restrict to the viewport, resolved later by placeholder substitution.
    Viewport,
}

impl<'a> AreaFilter<'a> {
    /// Area filter for an optional boundary.
    #[must_use]
    pub fn for_boundary(boundary: Option<&'a BoundaryChoice>) -> Self {
        boundary.map_or(Self::Viewport, |choice| Self::Boundary(&choice.id))
    }
}

impl fmt::Display for AreaFilter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boundary(id) => write!(f, "area:{id}"),
            Self::Viewport => f.write_str("{south},{west},{north},{east}"),
        }
    }
}

/// Settings keys recognised in a leading `[key:value]` statement.
const SETTINGS_KEYS: [&str; 7] = ["out", "timeout", "maxsize", "bbox", "date", "diff", "adiff"];

/// Element keywords that start an element statement.
const ELEMENT_KEYWORDS: [&str; 8] = ["relation", "node", "way", "nwr", "rel", "nw", "nr", "wr"];

fn is_settings(statement: &str) -> bool {
    let Some(inner) = statement.strip_prefix('[') else {
        return false;
    };
    let key = inner.split([':', ']']).next().unwrap_or_default();
    SETTINGS_KEYS.contains(&key.trim().to_ascii_lowercase().as_str())
}

fn starts_with_word(statement: &str, word: &str) -> bool {
    statement.strip_prefix(word).is_some_and(|rest| {
        rest.chars()
            .next()
            .is_none_or(|next| !(next.is_ascii_alphanumeric() || next == '_'))
    })
}

fn is_output(statement: &str) -> bool {
    starts_with_word(statement, "out")
}

fn is_element(statement: &str) -> bool {
    ELEMENT_KEYWORDS
        .iter()
        .any(|keyword| starts_with_word(statement, keyword))
}

fn is_group(statement: &str) -> bool {
    statement.starts_with('(')
}

fn body_statements(expression: &str) -> Result<Vec<&str>, QueryError> {
    let mut statements = lexer::split_statements(expression);
    let leading = statements.iter().take_while(|s| is_settings(s)).count();
    statements.drain(..leading);
    while statements.last().is_some_and(|s| is_output(s)) {
        statements.pop();
    }
    if statements.is_empty() {
        return Err(QueryError::EmptyExpression);
    }
    Ok(statements)
}

/// Strip settings and output statements, returning the body only.
///
/// Feeding the result back into [`build`] yields the same query as the
/// original expression.
///
/// # Errors
///
/// Returns [`QueryError::EmptyExpression`] if no statement remains.
pub fn sanitize(expression: &str) -> Result<String, QueryError> {
    Ok(body_statements(expression)?.join(";"))
}

/// Geometry mode requested by the output statements of `expression`, if
/// any of them names one.
///
/// ```
/// use geoimport_core::query::{GeometryMode, output_mode};
///
/// assert_eq!(output_mode("nwr[shop];out center;"), Some(GeometryMode::Center));
/// assert_eq!(output_mode("nwr[shop]"), None);
/// ```
#[must_use]
pub fn output_mode(expression: &str) -> Option<GeometryMode> {
    lexer::split_statements(expression)
        .into_iter()
        .rev()
        .take_while(|statement| is_output(statement))
        .find_map(|statement| {
            statement
                .split_whitespace()
                .find_map(|word| word.parse::<GeometryMode>().ok())
        })
}

fn restrict_element(statement: &str, area: AreaFilter<'_>) -> String {
    match lexer::assignment_start(statement) {
        Some(at) => {
            let (head, tail) = statement.split_at(at);
            format!("{}({area}){tail}", head.trim_end())
        }
        None => format!("{statement}({area})"),
    }
}

fn restrict_group(statement: &str, area: AreaFilter<'_>) -> String {
    let Some(end) = lexer::group_end(statement) else {
        return statement.to_owned();
    };
    let inner = statement.get(1..end).unwrap_or_default();
    let tail = statement.get(end + 1..).unwrap_or_default();
    let restricted = restrict_elements(&lexer::split_statements(inner), area);
    let mut out = String::from("(");
    for part in restricted {
        out.push_str(&part);
        out.push(';');
    }
    out.push(')');
    out.push_str(tail);
    out
}

fn restrict_elements(statements: &[&str], area: AreaFilter<'_>) -> Vec<String> {
    statements
        .iter()
        .map(|statement| {
            if is_group(statement) {
                restrict_group(statement, area)
            } else if is_element(statement) {
                restrict_element(statement, area)
            } else {
                (*statement).to_owned()
            }
        })
        .collect()
}

fn restrict_tags(statements: &[&str], area: AreaFilter<'_>) -> Vec<String> {
    statements
        .iter()
        .map(|statement| {
            if statement.starts_with('[') && statement.ends_with(']') {
                format!("nwr{statement}({area})")
            } else {
                format!("nwr[{statement}]({area})")
            }
        })
        .collect()
}

/// Build a complete filter query restricted to `boundary`, or to the
/// viewport placeholders when no boundary is given.
///
/// # Errors
///
/// Returns [`QueryError::EmptyExpression`] when the expression has no body.
pub fn build(
    expression: &str,
    mode: GeometryMode,
    boundary: Option<&BoundaryChoice>,
) -> Result<String, QueryError> {
    let statements = body_statements(expression)?;
    let area = AreaFilter::for_boundary(boundary);
    let element_form = statements
        .first()
        .is_some_and(|first| is_group(first) || is_element(first));
    let body = if element_form {
        restrict_elements(&statements, area)
    } else {
        restrict_tags(&statements, area)
    };
    Ok(format!("[out:json];{};out {mode};", body.join(";")))
}

/// Like [`build`], but a boundary is mandatory.
///
/// # Errors
///
/// Returns [`QueryError::BoundaryRequired`] without a boundary, otherwise as
/// [`build`].
pub fn build_in_area(
    expression: &str,
    mode: GeometryMode,
    boundary: Option<&BoundaryChoice>,
) -> Result<String, QueryError> {
    let choice = boundary.ok_or(QueryError::BoundaryRequired)?;
    build(expression, mode, Some(choice))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    const BBOX: &str = "{south},{west},{north},{east}";

    #[fixture]
    fn boundary() -> BoundaryChoice {
        BoundaryChoice::new("3600002202", "Lyon")
    }

    #[rstest]
    fn tag_form_uses_viewport_placeholders() {
        let query = build("amenity=drinking_water", GeometryMode::Geom, None).expect("query");
        assert_eq!(
            query,
            "[out:json];nwr[amenity=drinking_water]({south},{west},{north},{east});out geom;"
        );
    }

    #[rstest]
    fn tag_form_uses_boundary(boundary: BoundaryChoice) {
        let query =
            build("amenity=drinking_water", GeometryMode::Geom, Some(&boundary)).expect("query");
        assert_eq!(
            query,
            "[out:json];nwr[amenity=drinking_water](area:3600002202);out geom;"
        );
    }

    #[rstest]
    fn bracketed_tag_form_is_not_double_wrapped() {
        let query = build("[shop=bakery][name~\"Pain\"]", GeometryMode::Center, None).expect("query");
        assert_eq!(
            query,
            format!("[out:json];nwr[shop=bakery][name~\"Pain\"]({BBOX});out center;")
        );
    }

    #[rstest]
    fn group_gets_clause_per_element() {
        let query = build(
            "(node[amenity=bench];way[amenity=bench];)",
            GeometryMode::Geom,
            None,
        )
        .expect("query");
        assert_eq!(
            query,
            format!("[out:json];(node[amenity=bench]({BBOX});way[amenity=bench]({BBOX}););out geom;")
        );
    }

    #[rstest]
    fn nested_groups_are_recursed(boundary: BoundaryChoice) {
        let query = build(
            "(node[a];(way[b];rel[c];);)",
            GeometryMode::Geom,
            Some(&boundary),
        )
        .expect("query");
        assert_eq!(
            query,
            "[out:json];(node[a](area:3600002202);(way[b](area:3600002202);rel[c](area:3600002202););)\
             ;out geom;"
        );
    }

    #[rstest]
    fn single_element_gets_one_clause() {
        let query = build("way[highway=cycleway]", GeometryMode::Geom, None).expect("query");
        assert_eq!(
            query,
            format!("[out:json];way[highway=cycleway]({BBOX});out geom;")
        );
    }

    #[rstest]
    fn bare_statements_each_get_a_clause() {
        let query = build("node[a];way[b]", GeometryMode::Center, None).expect("query");
        assert_eq!(
            query,
            format!("[out:json];node[a]({BBOX});way[b]({BBOX});out center;")
        );
    }

    #[rstest]
    fn clause_precedes_result_assignment() {
        let query = build("node[a]->.x;.x out;", GeometryMode::Geom, None).expect("query");
        assert_eq!(query, format!("[out:json];node[a]({BBOX})->.x;.x out;out geom;"));
    }

    #[rstest]
    fn keyword_prefix_is_not_an_element() {
        let query = build("nodes=1", GeometryMode::Geom, None).expect("query");
        assert_eq!(query, format!("[out:json];nwr[nodes=1]({BBOX});out geom;"));
    }

    #[rstest]
    #[case("[out:json][timeout:25];node[a];out geom;")]
    #[case("[out:xml];\n[timeout:60];\nnode[a];\nout body;\nout skel qt;")]
    #[case("  node[a]  ")]
    fn prologue_and_epilogue_are_replaced(#[case] expression: &str) {
        let query = build(expression, GeometryMode::Geom, None).expect("query");
        assert_eq!(query, format!("[out:json];node[a]({BBOX});out geom;"));
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("[out:json];out geom;")]
    #[case(";;")]
    fn empty_expressions_fail(#[case] expression: &str) {
        assert_eq!(
            build(expression, GeometryMode::Geom, None),
            Err(QueryError::EmptyExpression)
        );
    }

    #[rstest]
    #[case("amenity=bench")]
    #[case("[out:json];(node[a];way[b];);out center;")]
    #[case("node[a]->.x;.x out;")]
    fn sanitized_body_builds_identically(#[case] expression: &str, boundary: BoundaryChoice) {
        let body = sanitize(expression).expect("body");
        for choice in [None, Some(&boundary)] {
            assert_eq!(
                build(&body, GeometryMode::Center, choice),
                build(expression, GeometryMode::Center, choice)
            );
        }
    }

    #[rstest]
    #[case("nwr[a];out geom;", Some(GeometryMode::Geom))]
    #[case("nwr[a];out tags center;", Some(GeometryMode::Center))]
    #[case("nwr[a];out;", None)]
    #[case("out center;nwr[a]", None)]
    fn reads_output_mode(#[case] expression: &str, #[case] expected: Option<GeometryMode>) {
        assert_eq!(output_mode(expression), expected);
    }

    #[rstest]
    fn area_required_without_boundary() {
        assert_eq!(
            build_in_area("amenity=bench", GeometryMode::Geom, None),
            Err(QueryError::BoundaryRequired)
        );
    }

    #[rstest]
    fn query_errors_map_to_validation() {
        assert_eq!(
            ValidationError::from(QueryError::EmptyExpression),
            ValidationError::EmptyExpression
        );
    }
}
