// Boundary validation for model-produced arguments.
//
// Models are loose about types: ids arrive as numbers, lists arrive as
// comma-separated strings. `normalize_args` coerces those shapes first, then
// `validate_args` enforces the operation's contract and `parse_request`
// hands a typed request struct to the wrapper.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::tool_catalog::{OpSpec, ParamKind};
use super::tool_errors::ToolError;

pub type Args = Map<String, Value>;

/// Coerce loosely typed values into the kinds the operation declares.
pub fn normalize_args(op: &OpSpec, args: &Args) -> Args {
    let mut out = args.clone();
    for param in op.params {
        let Some(value) = out.get_mut(param.name) else {
            continue;
        };
        let replacement = match (param.kind, &*value) {
            (ParamKind::String | ParamKind::OneOf(_), Value::Number(n)) => {
                Some(Value::String(n.to_string()))
            }
            (ParamKind::StringList, Value::String(s)) => Some(Value::Array(
                split_csv(s).into_iter().map(Value::String).collect(),
            )),
            (ParamKind::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),
            (ParamKind::ObjectList, obj @ Value::Object(_)) => Some(Value::Array(vec![obj.clone()])),
            _ => None,
        };
        if let Some(replacement) = replacement {
            *value = replacement;
        }
    }
    out
}

/// Split a comma-separated list, trimming blanks away.
pub fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Enforce presence and shape of every declared parameter.
pub fn validate_args(op: &OpSpec, args: &Args) -> Result<(), ToolError> {
    let missing: Vec<String> = op
        .required_params()
        .filter(|p| args.get(p.name).map(is_blank).unwrap_or(true))
        .map(|p| p.name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ToolError::MissingParams(missing));
    }

    for param in op.params {
        let Some(value) = args.get(param.name) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        let ok = match param.kind {
            ParamKind::String => value.is_string(),
            ParamKind::StringList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            ParamKind::Integer => value.is_i64() || value.is_u64(),
            ParamKind::Object => value.is_object(),
            ParamKind::ObjectList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_object)),
            ParamKind::OneOf(allowed) => match value.as_str() {
                Some(s) if allowed.contains(&s) => true,
                Some(s) => {
                    return Err(ToolError::invalid(
                        param.name,
                        format!("'{}' is not {}", s, param.kind.describe()),
                    ))
                }
                None => false,
            },
        };
        if !ok {
            return Err(ToolError::invalid(
                param.name,
                format!("expected {}", param.kind.describe()),
            ));
        }
    }

    Ok(())
}

/// Normalize, validate and deserialize arguments into a typed request.
pub fn parse_request<T: DeserializeOwned>(op: &OpSpec, args: &Args) -> Result<T, ToolError> {
    let normalized = normalize_args(op, args);
    validate_args(op, &normalized)?;
    serde_json::from_value(Value::Object(normalized))
        .map_err(|e| ToolError::invalid(op.name, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tools::tool_catalog::ParamSpec;
    use serde::Deserialize;
    use serde_json::json;

    const PARAMS: &[ParamSpec] = &[
        ParamSpec::required("accountId", ParamKind::String, ""),
        ParamSpec::required("containerName", ParamKind::String, ""),
        ParamSpec::optional("usageContext", ParamKind::StringList, ""),
        ParamSpec::optional("frequency", ParamKind::OneOf(&["daily", "weekly", "monthly"]), ""),
        ParamSpec::optional("limit", ParamKind::Integer, ""),
    ];
    const OP: OpSpec = OpSpec::read("createContainer", "", PARAMS);

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Request {
        account_id: String,
        container_name: String,
        #[serde(default)]
        usage_context: Vec<String>,
        limit: Option<u32>,
    }

    fn args(value: Value) -> Args {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn missing_required_fields_are_all_named() {
        let err = validate_args(&OP, &args(json!({}))).unwrap_err();
        match err {
            ToolError::MissingParams(fields) => {
                assert_eq!(fields, vec!["accountId", "containerName"])
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn blank_strings_count_as_missing() {
        let err = validate_args(&OP, &args(json!({"accountId": " ", "containerName": "Site"})))
            .unwrap_err();
        assert!(err.to_string().contains("accountId"));
    }

    #[test]
    fn enum_values_outside_the_set_are_rejected() {
        let err = validate_args(
            &OP,
            &args(json!({"accountId": "1", "containerName": "a", "frequency": "hourly"})),
        )
        .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParam { ref field, .. } if field == "frequency"));
    }

    #[test]
    fn numbers_and_csv_are_coerced() {
        let request: Request = parse_request(
            &OP,
            &args(json!({
                "accountId": 123456,
                "containerName": "My Site",
                "usageContext": "web, amp",
                "limit": "25"
            })),
        )
        .unwrap();
        assert_eq!(request.account_id, "123456");
        assert_eq!(request.container_name, "My Site");
        assert_eq!(request.usage_context, vec!["web", "amp"]);
        assert_eq!(request.limit, Some(25));
    }

    #[test]
    fn wrong_shapes_are_invalid() {
        let err = validate_args(
            &OP,
            &args(json!({"accountId": "1", "containerName": "a", "usageContext": {"x": 1}})),
        )
        .unwrap_err();
        assert!(err.to_string().contains("usageContext"));
    }
}
