use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::google_http::GoogleHttp;
use crate::core::auth::AuthSession;
use crate::core::tag_manager::tag_manager_models::{
    Account, Container, ContainerPath, ContainerVersion, NewContainer, NewTag, NewTrigger,
    NewVariable, NewVersion, Parameter, Tag, Trigger, Variable, Workspace, WorkspacePath,
};
use crate::core::tag_manager::TagManagerApi;
use crate::core::tools::GoogleApiError;

pub const TAG_MANAGER_API_BASE: &str = "https://tagmanager.googleapis.com/tagmanager/v2";

/// Tag Manager v2 REST client. Lists are read in a single page.
pub struct TagManagerApiClient {
    http: GoogleHttp,
    base_url: String,
}

impl TagManagerApiClient {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, TAG_MANAGER_API_BASE)
    }

    pub fn with_base_url(client: Client, base_url: &str) -> Self {
        Self {
            http: GoogleHttp::new(client, "Google Tag Manager"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn map_container(api: ApiContainer) -> Container {
        Container {
            account_id: api.account_id.unwrap_or_default(),
            container_id: api.container_id.unwrap_or_default(),
            name: api.name.unwrap_or_else(|| "Unnamed container".to_string()),
            public_id: api.public_id.unwrap_or_default(),
            usage_context: api.usage_context,
            time_zone: api.time_zone_id,
        }
    }

    fn map_tag(api: ApiTag) -> Tag {
        Tag {
            tag_id: api.tag_id.unwrap_or_default(),
            name: api.name.unwrap_or_default(),
            tag_type: api.kind.unwrap_or_default(),
            firing_trigger_ids: api.firing_trigger_id,
        }
    }

    fn map_trigger(api: ApiTrigger) -> Trigger {
        Trigger {
            trigger_id: api.trigger_id.unwrap_or_default(),
            name: api.name.unwrap_or_default(),
            trigger_type: api.kind.unwrap_or_default(),
        }
    }

    fn map_variable(api: ApiVariable) -> Variable {
        Variable {
            variable_id: api.variable_id.unwrap_or_default(),
            name: api.name.unwrap_or_default(),
            variable_type: api.kind.unwrap_or_default(),
        }
    }

    fn map_version(api: ApiVersionResponse) -> ContainerVersion {
        let version = api.container_version.unwrap_or_default();
        ContainerVersion {
            container_version_id: version.container_version_id.unwrap_or_default(),
            name: version.name.unwrap_or_default(),
        }
    }
}

fn parameters_json(parameters: &[Parameter]) -> Result<Value, GoogleApiError> {
    serde_json::to_value(parameters).map_err(|e| GoogleApiError::Decode {
        service: "Google Tag Manager",
        message: e.to_string(),
    })
}

#[async_trait]
impl TagManagerApi for TagManagerApiClient {
    async fn list_accounts(&self, session: &AuthSession) -> Result<Vec<Account>, GoogleApiError> {
        let resp: ApiAccountList = self.http.get(session, &self.url("accounts")).await?;
        Ok(resp
            .account
            .into_iter()
            .map(|a| Account {
                account_id: a.account_id.unwrap_or_default(),
                account_name: a.name.unwrap_or_else(|| "Unknown".to_string()),
            })
            .collect())
    }

    async fn list_containers(
        &self,
        session: &AuthSession,
        account_id: &str,
    ) -> Result<Vec<Container>, GoogleApiError> {
        let url = self.url(&format!("accounts/{}/containers", account_id));
        let resp: ApiContainerList = self.http.get(session, &url).await?;
        Ok(resp.container.into_iter().map(Self::map_container).collect())
    }

    async fn get_container(
        &self,
        session: &AuthSession,
        container: &ContainerPath,
    ) -> Result<Container, GoogleApiError> {
        let api: ApiContainer = self.http.get(session, &self.url(&container.path())).await?;
        Ok(Self::map_container(api))
    }

    async fn create_container(
        &self,
        session: &AuthSession,
        account_id: &str,
        container: &NewContainer,
    ) -> Result<Container, GoogleApiError> {
        let url = self.url(&format!("accounts/{}/containers", account_id));
        let body = json!({
            "name": container.name,
            "usageContext": container.usage_context,
        });
        let api: ApiContainer = self.http.post(session, &url, &body).await?;
        Ok(Self::map_container(api))
    }

    async fn list_workspaces(
        &self,
        session: &AuthSession,
        container: &ContainerPath,
    ) -> Result<Vec<Workspace>, GoogleApiError> {
        let url = self.url(&format!("{}/workspaces", container.path()));
        let resp: ApiWorkspaceList = self.http.get(session, &url).await?;
        Ok(resp
            .workspace
            .into_iter()
            .map(|w| Workspace {
                workspace_id: w.workspace_id.unwrap_or_default(),
                name: w.name.unwrap_or_default(),
            })
            .collect())
    }

    async fn list_tags(
        &self,
        session: &AuthSession,
        workspace: &WorkspacePath,
    ) -> Result<Vec<Tag>, GoogleApiError> {
        let url = self.url(&format!("{}/tags", workspace.path()));
        let resp: ApiTagList = self.http.get(session, &url).await?;
        Ok(resp.tag.into_iter().map(Self::map_tag).collect())
    }

    async fn create_tag(
        &self,
        session: &AuthSession,
        workspace: &WorkspacePath,
        tag: &NewTag,
    ) -> Result<Tag, GoogleApiError> {
        let url = self.url(&format!("{}/tags", workspace.path()));
        let body = json!({
            "name": tag.name,
            "type": tag.tag_type,
            "parameter": parameters_json(&tag.parameters)?,
            "firingTriggerId": tag.firing_trigger_ids,
        });
        let api: ApiTag = self.http.post(session, &url, &body).await?;
        Ok(Self::map_tag(api))
    }

    async fn list_triggers(
        &self,
        session: &AuthSession,
        workspace: &WorkspacePath,
    ) -> Result<Vec<Trigger>, GoogleApiError> {
        let url = self.url(&format!("{}/triggers", workspace.path()));
        let resp: ApiTriggerList = self.http.get(session, &url).await?;
        Ok(resp.trigger.into_iter().map(Self::map_trigger).collect())
    }

    async fn create_trigger(
        &self,
        session: &AuthSession,
        workspace: &WorkspacePath,
        trigger: &NewTrigger,
    ) -> Result<Trigger, GoogleApiError> {
        let url = self.url(&format!("{}/triggers", workspace.path()));
        let body = json!({
            "name": trigger.name,
            "type": trigger.trigger_type,
            "filter": trigger.filters,
        });
        let api: ApiTrigger = self.http.post(session, &url, &body).await?;
        Ok(Self::map_trigger(api))
    }

    async fn list_variables(
        &self,
        session: &AuthSession,
        workspace: &WorkspacePath,
    ) -> Result<Vec<Variable>, GoogleApiError> {
        let url = self.url(&format!("{}/variables", workspace.path()));
        let resp: ApiVariableList = self.http.get(session, &url).await?;
        Ok(resp.variable.into_iter().map(Self::map_variable).collect())
    }

    async fn create_variable(
        &self,
        session: &AuthSession,
        workspace: &WorkspacePath,
        variable: &NewVariable,
    ) -> Result<Variable, GoogleApiError> {
        let url = self.url(&format!("{}/variables", workspace.path()));
        let body = json!({
            "name": variable.name,
            "type": variable.variable_type,
            "parameter": parameters_json(&variable.parameters)?,
        });
        let api: ApiVariable = self.http.post(session, &url, &body).await?;
        Ok(Self::map_variable(api))
    }

    async fn create_version(
        &self,
        session: &AuthSession,
        workspace: &WorkspacePath,
        version: &NewVersion,
    ) -> Result<ContainerVersion, GoogleApiError> {
        let url = self.url(&format!("{}:create_version", workspace.path()));
        let body = json!({"name": version.name, "notes": version.notes});
        let api: ApiVersionResponse = self.http.post(session, &url, &body).await?;
        Ok(Self::map_version(api))
    }

    async fn publish_version(
        &self,
        session: &AuthSession,
        container: &ContainerPath,
        version_id: &str,
    ) -> Result<ContainerVersion, GoogleApiError> {
        let url = self.url(&format!("{}/versions/{}:publish", container.path(), version_id));
        let api: ApiVersionResponse = self.http.post(session, &url, &json!({})).await?;
        Ok(Self::map_version(api))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiAccount {
    account_id: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiAccountList {
    #[serde(default)]
    account: Vec<ApiAccount>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiContainer {
    account_id: Option<String>,
    container_id: Option<String>,
    name: Option<String>,
    public_id: Option<String>,
    #[serde(default)]
    usage_context: Vec<String>,
    time_zone_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiContainerList {
    #[serde(default)]
    container: Vec<ApiContainer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiWorkspace {
    workspace_id: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiWorkspaceList {
    #[serde(default)]
    workspace: Vec<ApiWorkspace>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiTag {
    tag_id: Option<String>,
    name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    firing_trigger_id: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ApiTagList {
    #[serde(default)]
    tag: Vec<ApiTag>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiTrigger {
    trigger_id: Option<String>,
    name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiTriggerList {
    #[serde(default)]
    trigger: Vec<ApiTrigger>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiVariable {
    variable_id: Option<String>,
    name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiVariableList {
    #[serde(default)]
    variable: Vec<ApiVariable>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiVersion {
    container_version_id: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiVersionResponse {
    container_version: Option<ApiVersion>,
}
