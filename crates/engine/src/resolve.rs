//! The value-resolution sublanguage.
//!
//! Three syntactic forms are recognised on string leaves:
//!
//! | form | meaning |
//! |---|---|
//! | `"$<expr>"` | evaluate `<expr>`; the result keeps its native JSON type |
//! | `"…${<expr>}…"` | string interpolation; each `${…}` is stringified in place |
//! | anything else | literal |
//!
//! Expressions are dotted/bracketed paths rooted at `input` or `results`:
//! `results.fetchUser[0].name`, `input.order.id`, `results.rows["odd key"]`.
//! Containers resolve leaf-wise; non-string scalars pass through unchanged.
//! An unresolved path fails the enclosing expression — and thereby the step.

use serde_json::Value;
use thiserror::Error;

use crate::context::Context;
use crate::model::JsonMap;

/// Resolution failures. The message always carries the offending path.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("value not found for path '{0}' in context")]
    PathNotFound(String),

    #[error("invalid path expression '{0}'")]
    InvalidPath(String),

    #[error("unknown root '{0}' in path expression (expected 'input' or 'results')")]
    UnknownRoot(String),

    #[error("unterminated '${{' in template '{0}'")]
    UnterminatedInterpolation(String),
}

/// One parsed path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Field(String),
    Index(usize),
}

/// The two containers an expression may start from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Root {
    Input,
    Results,
}

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

/// Resolve an arbitrary parameter value by walking it recursively.
pub fn resolve_value(value: &Value, ctx: &Context) -> Result<Value, ResolveError> {
    match value {
        Value::String(s) => resolve_str(s, ctx),
        Value::Object(map) => resolve_map(map, ctx).map(Value::Object),
        Value::Array(items) => items
            .iter()
            .map(|item| resolve_value(item, ctx))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        scalar => Ok(scalar.clone()),
    }
}

/// Resolve every leaf of a JSON object, keeping its shape.
pub fn resolve_map(map: &JsonMap, ctx: &Context) -> Result<JsonMap, ResolveError> {
    let mut resolved = JsonMap::new();
    for (key, value) in map {
        resolved.insert(key.clone(), resolve_value(value, ctx)?);
    }
    Ok(resolved)
}

/// Resolve one string leaf: interpolation, expression, or literal.
pub fn resolve_str(s: &str, ctx: &Context) -> Result<Value, ResolveError> {
    if s.contains("${") {
        return interpolate(s, ctx).map(Value::String);
    }
    if let Some(expr) = s.strip_prefix('$') {
        return eval_expr(expr, ctx);
    }
    Ok(Value::String(s.to_owned()))
}

/// Substitute every `${expr}` in a template. The leading `$` inside the
/// braces is optional, so `${x}` and `${$x}` are equivalent.
pub fn interpolate(template: &str, ctx: &Context) -> Result<String, ResolveError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| ResolveError::UnterminatedInterpolation(template.to_owned()))?;
        let expr = &after[..end];
        let value = eval_expr(expr.strip_prefix('$').unwrap_or(expr), ctx)?;
        out.push_str(&stringify(&value));
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Evaluate a bare path expression (no `$` prefix) against the context.
pub fn eval_expr(expr: &str, ctx: &Context) -> Result<Value, ResolveError> {
    let (root, segments) = parse_path(expr)?;

    let found = match root {
        Root::Input => walk(ctx.input(), &segments),
        Root::Results => ctx.with_results(|results| match segments.split_first() {
            None => Some(Value::Object(results.clone())),
            Some((Segment::Field(step_id), rest)) => {
                results.get(step_id).and_then(|value| walk(value, rest))
            }
            Some((Segment::Index(_), _)) => None,
        }),
    };

    found.ok_or_else(|| ResolveError::PathNotFound(format!("${expr}")))
}

/// How a value renders inside an interpolated string: strings bare,
/// everything else as compact JSON.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Path parsing and traversal
// ---------------------------------------------------------------------------

fn parse_path(expr: &str) -> Result<(Root, Vec<Segment>), ResolveError> {
    let mut segments = Vec::new();

    for part in expr.split('.') {
        if part.is_empty() {
            return Err(ResolveError::InvalidPath(expr.to_owned()));
        }

        let (head, mut brackets) = match part.find('[') {
            Some(pos) => (&part[..pos], &part[pos..]),
            None => (part, ""),
        };
        if !head.is_empty() {
            segments.push(Segment::Field(head.to_owned()));
        } else if brackets.is_empty() {
            return Err(ResolveError::InvalidPath(expr.to_owned()));
        }

        while !brackets.is_empty() {
            let inner = brackets
                .strip_prefix('[')
                .ok_or_else(|| ResolveError::InvalidPath(expr.to_owned()))?;
            let close = inner
                .find(']')
                .ok_or_else(|| ResolveError::InvalidPath(expr.to_owned()))?;
            let token = &inner[..close];

            if let Some(key) = quoted_key(token) {
                segments.push(Segment::Field(key.to_owned()));
            } else {
                let index: usize = token
                    .parse()
                    .map_err(|_| ResolveError::InvalidPath(expr.to_owned()))?;
                segments.push(Segment::Index(index));
            }
            brackets = &inner[close + 1..];
        }
    }

    let root = match segments.first() {
        Some(Segment::Field(name)) if name == "input" => Root::Input,
        Some(Segment::Field(name)) if name == "results" => Root::Results,
        Some(Segment::Field(name)) => return Err(ResolveError::UnknownRoot(name.clone())),
        _ => return Err(ResolveError::InvalidPath(expr.to_owned())),
    };
    segments.remove(0);

    Ok((root, segments))
}

fn quoted_key(token: &str) -> Option<&str> {
    token
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .or_else(|| token.strip_prefix('\'').and_then(|t| t.strip_suffix('\'')))
}

fn walk(value: &Value, segments: &[Segment]) -> Option<Value> {
    let mut current = value;
    for segment in segments {
        current = match segment {
            Segment::Field(name) => current.get(name)?,
            Segment::Index(index) => current.get(*index)?,
        };
    }
    Some(current.clone())
}

// ============================================================
// Unit tests
// ============================================================
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> Context {
        let ctx = Context::new(json!({
            "id": 7,
            "order": { "id": "ord-1", "lines": [ { "sku": "a" }, { "sku": "b" } ] },
            "flag": true
        }));
        ctx.publish(
            "fetchUser",
            json!([ { "id": 42, "name": "ada" }, { "id": 43, "name": "brian" } ]),
        );
        ctx.publish("count", json!(3.5));
        ctx
    }

    #[test]
    fn plain_strings_are_literals() {
        assert_eq!(
            resolve_str("hello", &ctx()).unwrap(),
            Value::String("hello".into())
        );
    }

    #[test]
    fn non_string_scalars_pass_through() {
        let c = ctx();
        assert_eq!(resolve_value(&json!(12), &c).unwrap(), json!(12));
        assert_eq!(resolve_value(&json!(true), &c).unwrap(), json!(true));
        assert_eq!(resolve_value(&Value::Null, &c).unwrap(), Value::Null);
    }

    #[test]
    fn input_paths_keep_native_types() {
        let c = ctx();
        assert_eq!(resolve_str("$input.id", &c).unwrap(), json!(7));
        assert_eq!(resolve_str("$input.flag", &c).unwrap(), json!(true));
        assert_eq!(
            resolve_str("$input.order.lines[1].sku", &c).unwrap(),
            json!("b")
        );
    }

    #[test]
    fn results_paths_traverse_published_values() {
        let c = ctx();
        assert_eq!(resolve_str("$results.fetchUser[0].id", &c).unwrap(), json!(42));
        assert_eq!(resolve_str("$results.count", &c).unwrap(), json!(3.5));
    }

    #[test]
    fn quoted_bracket_keys_work() {
        let c = Context::new(json!({ "odd key": 1 }));
        assert_eq!(resolve_str(r#"$input["odd key"]"#, &c).unwrap(), json!(1));
    }

    #[test]
    fn interpolation_stringifies_in_place() {
        let c = ctx();
        assert_eq!(
            resolve_str("user=${results.fetchUser[0].id}&n=${input.id}", &c).unwrap(),
            json!("user=42&n=7")
        );
    }

    #[test]
    fn inner_dollar_is_optional_in_interpolation() {
        let c = ctx();
        assert_eq!(
            resolve_str("${$results.fetchUser[0].name}", &c).unwrap(),
            json!("ada")
        );
    }

    #[test]
    fn interpolation_matches_stringified_expression() {
        // resolve("${x}") ≡ stringify(resolve("$x"))
        let c = ctx();
        for expr in ["input.id", "input.flag", "results.count", "results.fetchUser[0]"] {
            let direct = resolve_str(&format!("${expr}"), &c).unwrap();
            let templated = resolve_str(&format!("${{{expr}}}"), &c).unwrap();
            assert_eq!(templated, Value::String(stringify(&direct)));
        }
    }

    #[test]
    fn containers_resolve_leafwise() {
        let c = ctx();
        let resolved = resolve_value(
            &json!({
                "user": "$results.fetchUser[0].name",
                "meta": { "n": "$input.id", "keep": 1 },
                "tags": ["$input.flag", "literal"]
            }),
            &c,
        )
        .unwrap();
        assert_eq!(
            resolved,
            json!({
                "user": "ada",
                "meta": { "n": 7, "keep": 1 },
                "tags": [true, "literal"]
            })
        );
    }

    #[test]
    fn missing_path_carries_the_offending_path() {
        let err = resolve_str("$results.nope[0]", &ctx()).unwrap_err();
        assert_eq!(
            err,
            ResolveError::PathNotFound("$results.nope[0]".into())
        );
    }

    #[test]
    fn unknown_root_is_rejected() {
        assert_eq!(
            resolve_str("$env.HOME", &ctx()).unwrap_err(),
            ResolveError::UnknownRoot("env".into())
        );
    }

    #[test]
    fn unterminated_interpolation_is_rejected() {
        assert!(matches!(
            resolve_str("x=${input.id", &ctx()),
            Err(ResolveError::UnterminatedInterpolation(_))
        ));
    }

    #[test]
    fn out_of_bounds_index_is_not_found() {
        assert!(matches!(
            resolve_str("$results.fetchUser[9].id", &ctx()),
            Err(ResolveError::PathNotFound(_))
        ));
    }
}
