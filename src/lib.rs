//! tmplwire: a canonical JSON form for `{{ }}` templates and a renderer that
//! reproduces the reference template engine's output byte for byte.
//!
//! The pipeline is parse → canonicalize → render:
//!
//! - [`parser`] turns template source into a syntax tree ([`ast`]).
//! - [`canonicalize`] turns that tree into a [`Node`] tree with stable JSON
//!   field names and no positions. Another runtime can load the JSON and
//!   render it without sharing any code with this crate.
//! - [`render`] evaluates a [`Node`] tree against a [`Value`].
//!
//! Rendered subset:
//! - Literal text.
//! - `{{.Foo}}`, `{{.Bar.Foo}}`, `{{.}}` field lookups; missing map keys are
//!   empty.
//! - `{{$x := .a}}` declarations, `{{$x = .b}}` assignments, `{{$x.c}}`.
//! - `{{if}} ... {{else}} ... {{end}}` (including `{{else if}}`).
//! - `{{range $x := .things}}`, `{{range $k, $v := .map}}` with `{{else}}`;
//!   mappings iterate in byte-wise key order.
//!
//! Parsed but rejected by [`canonicalize`] with `UnsupportedNodeKind`:
//! - `{{with}}`, `{{template}}`, `{{break}}`, `{{continue}}`, kept comments.
//! - Function calls, literals and parenthesized pipelines.
//!
//! Output is never HTML-escaped.
//!
//! ```
//! use serde_json::json;
//!
//! let out = tmplwire::render_template(
//!     "a{{range $x := .things}}a{{$x.c}}b{{end}}b",
//!     &json!({"things": [{"c": 5}, {"c": 17}]}).into(),
//! )
//! .unwrap();
//! assert_eq!(out, "aa5ba17bb");
//! ```

pub mod ast;
pub mod canon;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod node;
pub mod parser;
mod scope;
pub mod set;
pub mod value;

pub use canon::canonicalize;
pub use error::{CanonError, Error, ParseError, RenderError, Result};
pub use eval::render;
pub use node::{Arg, Branch, Command, List, Node, Pipe, Variable};
pub use parser::{parse, ParseOptions};
pub use set::TemplateSet;
pub use value::Value;

/// Parse and canonicalize `source` with the default options.
pub fn compile(source: &str) -> Result<Node> {
    compile_with(source, &ParseOptions::default())
}

pub fn compile_with(source: &str, options: &ParseOptions) -> Result<Node> {
    let tree = parser::Parser::with_options(source, options).parse()?;
    Ok(canonicalize(&tree)?)
}

/// Parse, canonicalize and render in one step.
pub fn render_template(source: &str, data: &Value) -> Result<String> {
    Ok(render(&compile(source)?, data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fields_and_nested_maps() {
        let data: Value = json!({"Foo": 517, "Bar": {"Foo": 715}}).into();
        let rendered = render_template("a{{.Foo}}{{.Bar.Foo}}b", &data).unwrap();
        assert_eq!(rendered, "a517715b");
    }

    #[test]
    fn if_with_and_without_else() {
        let template = "a{{if .x}}5{{end}}b";
        assert_eq!(render_template(template, &json!({"x": true}).into()).unwrap(), "a5b");
        assert_eq!(render_template(template, &json!({"x": false}).into()).unwrap(), "ab");

        let template = "a{{if .x}}5{{else}}17{{end}}b";
        assert_eq!(render_template(template, &json!({"x": true}).into()).unwrap(), "a5b");
        assert_eq!(render_template(template, &json!({"x": false}).into()).unwrap(), "a17b");
    }

    #[test]
    fn range_over_numbers_and_maps() {
        let template = "a{{range $x := .things}}a{{$x}}b{{end}}b";
        assert_eq!(
            render_template(template, &json!({"things": [5, 17]}).into()).unwrap(),
            "aa5ba17bb"
        );
        assert_eq!(
            render_template(template, &json!({"things": []}).into()).unwrap(),
            "ab"
        );
    }

    #[test]
    fn parse_errors_surface_as_parse_variant() {
        let err = render_template("{{if .x}}", &Value::Null).unwrap_err();
        assert!(matches!(err, Error::Parse(_)), "got {err:?}");
    }

    #[test]
    fn unsupported_syntax_surfaces_as_canon_variant() {
        let err = compile("{{printf \"%d\" .x}}").unwrap_err();
        assert!(
            matches!(err, Error::Canon(CanonError::UnsupportedNodeKind { ref kind }) if kind == "IdentifierNode"),
            "got {err:?}"
        );
    }

    #[test]
    fn render_errors_surface_as_render_variant() {
        let err = render_template("{{.a.b}}", &json!({"a": [1]}).into()).unwrap_err();
        assert!(
            matches!(err, Error::Render(RenderError::InvalidFieldTarget { .. })),
            "got {err:?}"
        );
    }
}
