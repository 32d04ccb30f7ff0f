use std::sync::Arc;

use async_trait::async_trait;

use super::tag_manager_models::{
    Account, Container, ContainerPath, ContainerVersion, NewContainer, NewTag, NewTrigger,
    NewVariable, NewVersion, Parameter, Tag, Trigger, Variable, Workspace, WorkspacePath,
};
use crate::core::auth::AuthSession;
use crate::core::tools::{GoogleApiError, ToolError};

/// Port to the Tag Manager v2 REST API.
#[async_trait]
pub trait TagManagerApi: Send + Sync {
    async fn list_accounts(&self, session: &AuthSession) -> Result<Vec<Account>, GoogleApiError>;

    async fn list_containers(
        &self,
        session: &AuthSession,
        account_id: &str,
    ) -> Result<Vec<Container>, GoogleApiError>;

    async fn get_container(
        &self,
        session: &AuthSession,
        container: &ContainerPath,
    ) -> Result<Container, GoogleApiError>;

    async fn create_container(
        &self,
        session: &AuthSession,
        account_id: &str,
        container: &NewContainer,
    ) -> Result<Container, GoogleApiError>;

    async fn list_workspaces(
        &self,
        session: &AuthSession,
        container: &ContainerPath,
    ) -> Result<Vec<Workspace>, GoogleApiError>;

    async fn list_tags(
        &self,
        session: &AuthSession,
        workspace: &WorkspacePath,
    ) -> Result<Vec<Tag>, GoogleApiError>;

    async fn create_tag(
        &self,
        session: &AuthSession,
        workspace: &WorkspacePath,
        tag: &NewTag,
    ) -> Result<Tag, GoogleApiError>;

    async fn list_triggers(
        &self,
        session: &AuthSession,
        workspace: &WorkspacePath,
    ) -> Result<Vec<Trigger>, GoogleApiError>;

    async fn create_trigger(
        &self,
        session: &AuthSession,
        workspace: &WorkspacePath,
        trigger: &NewTrigger,
    ) -> Result<Trigger, GoogleApiError>;

    async fn list_variables(
        &self,
        session: &AuthSession,
        workspace: &WorkspacePath,
    ) -> Result<Vec<Variable>, GoogleApiError>;

    async fn create_variable(
        &self,
        session: &AuthSession,
        workspace: &WorkspacePath,
        variable: &NewVariable,
    ) -> Result<Variable, GoogleApiError>;

    async fn create_version(
        &self,
        session: &AuthSession,
        workspace: &WorkspacePath,
        version: &NewVersion,
    ) -> Result<ContainerVersion, GoogleApiError>;

    async fn publish_version(
        &self,
        session: &AuthSession,
        container: &ContainerPath,
        version_id: &str,
    ) -> Result<ContainerVersion, GoogleApiError>;
}

pub const GA4_CONFIG_TAG_NAME: &str = "GA4 Configuration";
pub const GA4_CONFIG_TAG_TYPE: &str = "gaawe";

pub struct TagManagerService {
    api: Arc<dyn TagManagerApi>,
}

impl TagManagerService {
    pub fn new(api: Arc<dyn TagManagerApi>) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &Arc<dyn TagManagerApi> {
        &self.api
    }

    /// Accounts in the order Google returns them.
    pub async fn list_accounts(&self, session: &AuthSession) -> Result<Vec<Account>, ToolError> {
        Ok(self.api.list_accounts(session).await?)
    }

    /// `None` when the container does not exist.
    pub async fn find_container(
        &self,
        session: &AuthSession,
        container: &ContainerPath,
    ) -> Result<Option<Container>, ToolError> {
        match self.api.get_container(session, container).await {
            Ok(found) => Ok(Some(found)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// The named workspace, or the container's first one.
    pub async fn resolve_workspace(
        &self,
        session: &AuthSession,
        container: &ContainerPath,
        workspace_id: Option<&str>,
    ) -> Result<WorkspacePath, ToolError> {
        if let Some(id) = workspace_id.map(str::trim).filter(|id| !id.is_empty()) {
            return Ok(container.workspace(id));
        }
        let workspaces = self.api.list_workspaces(session, container).await?;
        match workspaces.first() {
            Some(first) => {
                tracing::debug!(
                    container = %container.path(),
                    workspace_id = %first.workspace_id,
                    "Defaulting to first workspace"
                );
                Ok(container.workspace(&first.workspace_id))
            }
            None => Err(ToolError::NotConfigured(format!(
                "container {} has no workspace",
                container.path()
            ))),
        }
    }

    /// Create the GA4 configuration tag firing on the first pageview trigger.
    ///
    /// Returns `None` without writing anything when there is no pageview trigger.
    pub async fn link_ga4(
        &self,
        session: &AuthSession,
        workspace: &WorkspacePath,
        measurement_id: &str,
    ) -> Result<Option<Tag>, ToolError> {
        let triggers = self.api.list_triggers(session, workspace).await?;
        let Some(all_pages) = triggers.iter().find(|t| t.trigger_type == "pageview") else {
            return Ok(None);
        };
        let tag = NewTag {
            name: GA4_CONFIG_TAG_NAME.to_string(),
            tag_type: GA4_CONFIG_TAG_TYPE.to_string(),
            parameters: vec![Parameter::template("measurementId", measurement_id)],
            firing_trigger_ids: vec![all_pages.trigger_id.clone()],
        };
        let created = self.api.create_tag(session, workspace, &tag).await?;
        tracing::info!(
            workspace = %workspace.path(),
            tag_id = %created.tag_id,
            "Linked GA4 measurement id"
        );
        Ok(Some(created))
    }
}

#[cfg(test)]
pub mod testing {
    //! Recording Tag Manager fake. Every write is counted so tests can
    //! assert that nothing reached Google.

    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct FakeTagManager {
        pub accounts: Vec<Account>,
        pub containers: Vec<Container>,
        pub workspaces: Vec<Workspace>,
        pub triggers: Vec<Trigger>,
        pub calls: Mutex<Vec<String>>,
        pub writes: Mutex<Vec<String>>,
    }

    impl FakeTagManager {
        pub fn with_workspace() -> Self {
            Self {
                workspaces: vec![Workspace {
                    workspace_id: "10".into(),
                    name: "Default Workspace".into(),
                }],
                ..Default::default()
            }
        }

        pub fn write_count(&self) -> usize {
            self.writes.lock().map(|w| w.len()).unwrap_or(0)
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().map(|c| c.len()).unwrap_or(0)
        }

        pub fn writes(&self) -> Vec<String> {
            self.writes.lock().map(|w| w.clone()).unwrap_or_default()
        }

        fn call(&self, name: &str) {
            self.calls.lock().unwrap().push(name.to_string());
        }

        fn write(&self, what: String) {
            self.call("write");
            self.writes.lock().unwrap().push(what);
        }
    }

    #[async_trait]
    impl TagManagerApi for FakeTagManager {
        async fn list_accounts(&self, _: &AuthSession) -> Result<Vec<Account>, GoogleApiError> {
            self.call("list_accounts");
            Ok(self.accounts.clone())
        }

        async fn list_containers(
            &self,
            _: &AuthSession,
            account_id: &str,
        ) -> Result<Vec<Container>, GoogleApiError> {
            self.call("list_containers");
            Ok(self
                .containers
                .iter()
                .filter(|c| c.account_id == account_id)
                .cloned()
                .collect())
        }

        async fn get_container(
            &self,
            _: &AuthSession,
            container: &ContainerPath,
        ) -> Result<Container, GoogleApiError> {
            self.call("get_container");
            self.containers
                .iter()
                .find(|c| c.container_id == container.container_id)
                .cloned()
                .ok_or(GoogleApiError::Http {
                    service: "Google Tag Manager",
                    status: 404,
                    message: "Not found".into(),
                })
        }

        async fn create_container(
            &self,
            _: &AuthSession,
            account_id: &str,
            container: &NewContainer,
        ) -> Result<Container, GoogleApiError> {
            self.write(format!("container:{}", container.name));
            Ok(Container {
                account_id: account_id.into(),
                container_id: "77".into(),
                name: container.name.clone(),
                public_id: "GTM-NEW".into(),
                usage_context: container.usage_context.clone(),
                time_zone: None,
            })
        }

        async fn list_workspaces(
            &self,
            _: &AuthSession,
            _: &ContainerPath,
        ) -> Result<Vec<Workspace>, GoogleApiError> {
            self.call("list_workspaces");
            Ok(self.workspaces.clone())
        }

        async fn list_tags(&self, _: &AuthSession, _: &WorkspacePath) -> Result<Vec<Tag>, GoogleApiError> {
            self.call("list_tags");
            Ok(Vec::new())
        }

        async fn create_tag(
            &self,
            _: &AuthSession,
            workspace: &WorkspacePath,
            tag: &NewTag,
        ) -> Result<Tag, GoogleApiError> {
            self.write(format!("tag:{}:{}", workspace.path(), tag.name));
            Ok(Tag {
                tag_id: "5".into(),
                name: tag.name.clone(),
                tag_type: tag.tag_type.clone(),
                firing_trigger_ids: tag.firing_trigger_ids.clone(),
            })
        }

        async fn list_triggers(
            &self,
            _: &AuthSession,
            _: &WorkspacePath,
        ) -> Result<Vec<Trigger>, GoogleApiError> {
            self.call("list_triggers");
            Ok(self.triggers.clone())
        }

        async fn create_trigger(
            &self,
            _: &AuthSession,
            _: &WorkspacePath,
            trigger: &NewTrigger,
        ) -> Result<Trigger, GoogleApiError> {
            self.write(format!("trigger:{}", trigger.name));
            Ok(Trigger {
                trigger_id: "6".into(),
                name: trigger.name.clone(),
                trigger_type: trigger.trigger_type.clone(),
            })
        }

        async fn list_variables(
            &self,
            _: &AuthSession,
            _: &WorkspacePath,
        ) -> Result<Vec<Variable>, GoogleApiError> {
            self.call("list_variables");
            Ok(Vec::new())
        }

        async fn create_variable(
            &self,
            _: &AuthSession,
            _: &WorkspacePath,
            variable: &NewVariable,
        ) -> Result<Variable, GoogleApiError> {
            self.write(format!("variable:{}", variable.name));
            Ok(Variable {
                variable_id: "8".into(),
                name: variable.name.clone(),
                variable_type: variable.variable_type.clone(),
            })
        }

        async fn create_version(
            &self,
            _: &AuthSession,
            _: &WorkspacePath,
            version: &NewVersion,
        ) -> Result<ContainerVersion, GoogleApiError> {
            self.write(format!("version:{}", version.name));
            Ok(ContainerVersion {
                container_version_id: "3".into(),
                name: version.name.clone(),
            })
        }

        async fn publish_version(
            &self,
            _: &AuthSession,
            _: &ContainerPath,
            version_id: &str,
        ) -> Result<ContainerVersion, GoogleApiError> {
            self.write(format!("publish:{}", version_id));
            Ok(ContainerVersion {
                container_version_id: version_id.into(),
                name: "Live".into(),
            })
        }
    }
}
