// Declarative tool metadata.
//
// Every tool the host can hand to the model is described here as plain data:
// its name, the operations it understands, the parameters each operation
// takes and the OAuth scopes it needs. Nothing in this file performs I/O.
// The wrappers look up an `OpSpec` to validate a call before any request is
// built, and the installer serialises the same specs for the marketplace.

use serde_json::{json, Value};

/// Semantic type of a single tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    StringList,
    Integer,
    Object,
    ObjectList,
    /// A string restricted to a fixed set of values.
    OneOf(&'static [&'static str]),
}

impl ParamKind {
    pub fn describe(&self) -> String {
        match self {
            ParamKind::String => "string".to_string(),
            ParamKind::StringList => "list of strings".to_string(),
            ParamKind::Integer => "integer".to_string(),
            ParamKind::Object => "object".to_string(),
            ParamKind::ObjectList => "list of objects".to_string(),
            ParamKind::OneOf(values) => format!("one of: {}", values.join(", ")),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub description: &'static str,
}

impl ParamSpec {
    pub const fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            description,
        }
    }

    pub const fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            description,
        }
    }
}

/// Which confirmation bucket a mutating operation falls into.
///
/// The host remembers operator answers per key, so publishing to production
/// is kept apart from ordinary workspace edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmKey {
    GtmWrite,
    GtmPublish,
    GaWrite,
    GithubWrite,
}

impl ConfirmKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfirmKey::GtmWrite => "gtm_write",
            ConfirmKey::GtmPublish => "gtm_publish",
            ConfirmKey::GaWrite => "ga_write",
            ConfirmKey::GithubWrite => "github_write",
        }
    }
}

/// A mutating operation must be confirmed by a human before it runs.
#[derive(Debug, Clone, Copy)]
pub struct Mutation {
    pub key: ConfirmKey,
    pub explanation: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct OpSpec {
    pub name: &'static str,
    pub summary: &'static str,
    pub params: &'static [ParamSpec],
    pub mutation: Option<Mutation>,
    /// Scopes needed on top of the tool-level scopes.
    pub extra_scopes: &'static [&'static str],
}

impl OpSpec {
    pub const fn read(name: &'static str, summary: &'static str, params: &'static [ParamSpec]) -> Self {
        Self {
            name,
            summary,
            params,
            mutation: None,
            extra_scopes: &[],
        }
    }

    pub const fn write(
        name: &'static str,
        summary: &'static str,
        params: &'static [ParamSpec],
        key: ConfirmKey,
        explanation: &'static str,
    ) -> Self {
        Self {
            name,
            summary,
            params,
            mutation: Some(Mutation { key, explanation }),
            extra_scopes: &[],
        }
    }

    pub const fn with_scopes(mut self, scopes: &'static [&'static str]) -> Self {
        self.extra_scopes = scopes;
        self
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn required_params(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params.iter().filter(|p| p.required)
    }

    /// Short usage block shown after a rejected call.
    pub fn usage(&self, tool: &str) -> String {
        let mut out = format!("{}(op=\"{}\"): {}", tool, self.name, self.summary);
        for param in self.params {
            out.push_str(&format!(
                "\n  - {} ({}{}): {}",
                param.name,
                param.kind.describe(),
                if param.required { ", required" } else { "" },
                param.description
            ));
        }
        out
    }
}

#[derive(Debug)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub help: &'static str,
    pub scopes: &'static [&'static str],
    pub ops: &'static [OpSpec],
}

impl ToolSpec {
    pub fn op(&self, name: &str) -> Option<&OpSpec> {
        self.ops.iter().find(|op| op.name == name)
    }

    pub fn op_names(&self) -> Vec<&'static str> {
        self.ops.iter().map(|op| op.name).collect()
    }

    /// All scopes an operation needs, tool scopes first.
    pub fn scopes_for(&self, op: &OpSpec) -> Vec<&'static str> {
        let mut scopes: Vec<&'static str> = self.scopes.to_vec();
        for scope in op.extra_scopes {
            if !scopes.contains(scope) {
                scopes.push(scope);
            }
        }
        scopes
    }

    /// Function-tool shape understood by the hosted model.
    ///
    /// Tools take a free-form `op` plus an `args` object and are not strict;
    /// per-operation validation happens on our side.
    pub fn openai_style_tool(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "strict": false,
                "parameters": {
                    "type": "object",
                    "properties": {
                        "op": {"type": "string", "description": "Start with 'help' for usage"},
                        "args": {"type": "object"},
                    },
                    "required": [],
                },
            },
        })
    }
}
