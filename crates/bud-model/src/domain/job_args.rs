use serde_json::Value;

use crate::ModelError;

/// Command-line arguments of a training job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobArgs {
    /// Named options, rendered as `--key value` in insertion order.
    ///
    /// Entries without a value are skipped.
    Mapping(Vec<(String, Option<String>)>),
    /// Positional arguments, passed through verbatim.
    Sequence(Vec<String>),
}

impl JobArgs {
    /// Build named options from `(key, value)` pairs.
    pub fn mapping<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Mapping(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.map(Into::into)))
                .collect(),
        )
    }

    /// Build positional arguments.
    pub fn sequence<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Sequence(items.into_iter().map(Into::into).collect())
    }

    /// Flatten into the argument vector handed to the entrypoint.
    pub fn to_args(&self) -> Vec<String> {
        match self {
            JobArgs::Mapping(pairs) => pairs
                .iter()
                .filter_map(|(k, v)| v.as_ref().map(|v| [format!("--{k}"), v.clone()]))
                .flatten()
                .collect(),
            JobArgs::Sequence(items) => items.clone(),
        }
    }
}

impl Default for JobArgs {
    fn default() -> Self {
        JobArgs::Sequence(Vec::new())
    }
}

impl TryFrom<Value> for JobArgs {
    type Error = ModelError;

    /// Objects become named options and arrays positional arguments.
    /// Any other JSON value is rejected.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(JobArgs::Mapping(
                map.into_iter().map(|(k, v)| (k, render(v))).collect(),
            )),
            Value::Array(items) => Ok(JobArgs::Sequence(
                items
                    .into_iter()
                    .map(|v| render(v).unwrap_or_else(|| "None".to_string()))
                    .collect(),
            )),
            other => Err(ModelError::InvalidArgument(format!(
                "expected an object or an array, got {}",
                kind_of(&other)
            ))),
        }
    }
}

/// Text of a value as the training script expects it on its command line.
///
/// Scripts parse their arguments with Python, so scalars use Python's `str()` spelling
/// (`True`, `1e-05`, `3.0`) rather than JSON's.
fn render(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(py_repr(&other)),
    }
}

fn py_repr(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => py_float(f),
            _ => n.to_string(),
        },
        Value::String(s) => py_quote(s),
        Value::Array(items) => {
            let items: Vec<_> = items.iter().map(py_repr).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(map) => {
            let entries: Vec<_> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", py_quote(k), py_repr(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
    }
}

/// Shortest round-trip digits; exponent form below 1e-4 and from 1e16 on.
fn py_float(f: f64) -> String {
    let sci = format!("{f:e}");
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);

    if (-4..16).contains(&exp) {
        let plain = f.to_string();
        if plain.contains('.') {
            plain
        } else {
            format!("{plain}.0")
        }
    } else {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exp.unsigned_abs())
    }
}

fn py_quote(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn mapping_skips_missing_values_and_keeps_order() {
        let args = JobArgs::mapping([
            ("epochs", Some("3")),
            ("resume", None),
            ("lr", Some("0.001")),
        ]);

        assert_eq!(args.to_args(), vec!["--epochs", "3", "--lr", "0.001"]);
    }

    #[test]
    fn sequence_passes_through() {
        let args = JobArgs::sequence(["--foo", "bar", "baz"]);
        assert_eq!(args.to_args(), vec!["--foo", "bar", "baz"]);
    }

    #[test]
    fn json_object_keeps_insertion_order() {
        let value: Value =
            serde_json::from_str(r#"{"zeta": 1, "alpha": null, "mid": "x", "flag": true}"#)
                .unwrap();
        let args = JobArgs::try_from(value).unwrap();

        assert_eq!(
            args.to_args(),
            vec!["--zeta", "1", "--mid", "x", "--flag", "True"]
        );
    }

    #[test]
    fn scalars_use_python_spelling() {
        let args = JobArgs::try_from(json!({
            "fp16": true,
            "resume": false,
            "lr": 0.00001,
            "warmup": 0.0001,
            "scale": 1.0,
            "tokens": 1e16,
            "steps": 500,
        }))
        .unwrap();

        assert_eq!(
            args.to_args(),
            vec![
                "--fp16", "True", "--resume", "False", "--lr", "1e-05", "--warmup", "0.0001",
                "--scale", "1.0", "--tokens", "1e+16", "--steps", "500",
            ]
        );
    }

    #[test]
    fn nested_values_use_python_literals() {
        let args = JobArgs::try_from(json!({
            "layers": [1, 2.5, null],
            "lora": {"r": 8, "name": "it's"},
        }))
        .unwrap();

        assert_eq!(
            args.to_args(),
            vec![
                "--layers",
                "[1, 2.5, None]",
                "--lora",
                r#"{'r': 8, 'name': "it's"}"#,
            ]
        );
    }

    #[test]
    fn json_array_becomes_sequence() {
        let args = JobArgs::try_from(json!(["train", 2, "--fast", true])).unwrap();
        assert_eq!(args, JobArgs::sequence(["train", "2", "--fast", "True"]));
    }

    #[test]
    fn scalars_are_rejected() {
        for value in [json!("text"), json!(5), json!(null), json!(false)] {
            let err = JobArgs::try_from(value).unwrap_err();
            assert!(matches!(err, ModelError::InvalidArgument(_)));
        }
    }
}
