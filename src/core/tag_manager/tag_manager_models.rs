use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: String,
    pub account_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub account_id: String,
    pub container_id: String,
    pub name: String,
    pub public_id: String,
    pub usage_context: Vec<String>,
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub workspace_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub tag_id: String,
    pub name: String,
    pub tag_type: String,
    pub firing_trigger_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub trigger_id: String,
    pub name: String,
    pub trigger_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub variable_id: String,
    pub name: String,
    pub variable_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerVersion {
    pub container_version_id: String,
    pub name: String,
}

/// GTM template parameter, in the API's own shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub key: String,
    #[serde(rename = "type", default = "template_type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub list: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub map: Vec<Parameter>,
}

fn template_type() -> String {
    "template".to_string()
}

impl Parameter {
    pub fn template(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            kind: template_type(),
            value: Some(value.to_string()),
            list: Vec::new(),
            map: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerPath {
    pub account_id: String,
    pub container_id: String,
}

impl ContainerPath {
    pub fn new(account_id: &str, container_id: &str) -> Self {
        Self {
            account_id: account_id.to_string(),
            container_id: container_id.to_string(),
        }
    }

    pub fn path(&self) -> String {
        format!("accounts/{}/containers/{}", self.account_id, self.container_id)
    }

    pub fn workspace(&self, workspace_id: &str) -> WorkspacePath {
        WorkspacePath {
            container: self.clone(),
            workspace_id: workspace_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkspacePath {
    pub container: ContainerPath,
    pub workspace_id: String,
}

impl WorkspacePath {
    pub fn path(&self) -> String {
        format!("{}/workspaces/{}", self.container.path(), self.workspace_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewContainer {
    pub name: String,
    pub usage_context: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTag {
    pub name: String,
    pub tag_type: String,
    pub parameters: Vec<Parameter>,
    pub firing_trigger_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTrigger {
    pub name: String,
    pub trigger_type: String,
    /// GTM condition objects, passed through untouched.
    pub filters: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewVariable {
    pub name: String,
    pub variable_type: String,
    pub parameters: Vec<Parameter>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewVersion {
    pub name: String,
    pub notes: String,
}

// ---------------------------------------------------------------------------
// Typed tool requests
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountArgs {
    pub account_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceArgs {
    pub account_id: String,
    pub container_id: String,
    #[serde(default)]
    pub workspace_id: Option<String>,
}

impl WorkspaceArgs {
    pub fn container(&self) -> ContainerPath {
        ContainerPath::new(&self.account_id, &self.container_id)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContainerArgs {
    pub account_id: String,
    pub container_name: String,
    #[serde(default = "default_usage_context")]
    pub usage_context: Vec<String>,
}

fn default_usage_context() -> Vec<String> {
    vec!["web".to_string()]
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTagArgs {
    #[serde(flatten)]
    pub target: WorkspaceArgs,
    pub tag_name: String,
    pub tag_type: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub firing_trigger_id: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTriggerArgs {
    #[serde(flatten)]
    pub target: WorkspaceArgs,
    pub trigger_name: String,
    pub trigger_type: String,
    #[serde(default)]
    pub filters: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVariableArgs {
    #[serde(flatten)]
    pub target: WorkspaceArgs,
    pub variable_name: String,
    pub variable_type: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVersionArgs {
    #[serde(flatten)]
    pub target: WorkspaceArgs,
    #[serde(default)]
    pub version_name: Option<String>,
    #[serde(default)]
    pub version_notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishVersionArgs {
    pub account_id: String,
    pub container_id: String,
    pub version_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkGa4Args {
    #[serde(flatten)]
    pub target: WorkspaceArgs,
    pub measurement_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploySnippetArgs {
    pub account_id: String,
    pub container_id: String,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
}
