use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::snippet::container_snippet;
use super::tag_manager_models::{
    AccountArgs, ContainerPath, CreateContainerArgs, CreateTagArgs, CreateTriggerArgs, CreateVariableArgs,
    CreateVersionArgs, DeploySnippetArgs, LinkGa4Args, NewContainer, NewTag, NewTrigger,
    NewVariable, NewVersion, Parameter, PublishVersionArgs, WorkspaceArgs,
};
use super::tag_manager_service::TagManagerService;
use crate::core::deploy::{
    parse_repo_url, DeployError, SnippetDeployer, SnippetPullRequest, DEFAULT_SNIPPET_PATH,
};
use crate::core::dispatch::{CallContext, ToolCallHandler};
use crate::core::setup::SetupConfig;
use crate::core::tools::{
    parse_request, usage_context_allowed, Args, OpSpec, ToolError, ToolSpec,
    GOOGLE_TAG_MANAGER_TOOL,
};

impl From<DeployError> for ToolError {
    fn from(err: DeployError) -> Self {
        match err {
            DeployError::InvalidRepo(url) => {
                ToolError::NotConfigured(format!("GITHUB_REPO_URL '{}' is not a GitHub repository", url))
            }
            DeployError::MissingToken => ToolError::NotConfigured("GitHub token".to_string()),
            DeployError::Api(msg) => ToolError::Host(format!("GitHub: {}", msg)),
        }
    }
}

/// `google_tag_manager`: containers, tags, triggers, variables and publishing.
pub struct TagManagerTool {
    service: Arc<TagManagerService>,
    deployer: Option<Arc<dyn SnippetDeployer>>,
}

impl TagManagerTool {
    pub fn new(service: Arc<TagManagerService>, deployer: Option<Arc<dyn SnippetDeployer>>) -> Self {
        Self { service, deployer }
    }

    async fn list_accounts(&self, ctx: &CallContext<'_>) -> Result<String, ToolError> {
        let accounts = self.service.list_accounts(ctx.session).await?;
        if accounts.is_empty() {
            return Ok("📦 No Google Tag Manager accounts found.".to_string());
        }
        let mut out = vec!["📦 Google Tag Manager Accounts:\n".to_string()];
        for account in accounts {
            out.push(format!("• {} (ID: {})", account.account_name, account.account_id));
        }
        Ok(out.join("\n"))
    }

    async fn list_containers(&self, ctx: &CallContext<'_>, args: AccountArgs) -> Result<String, ToolError> {
        let containers = self
            .service
            .api()
            .list_containers(ctx.session, &args.account_id)
            .await?;
        if containers.is_empty() {
            return Ok(format!("📦 No containers found in account {}", args.account_id));
        }
        let mut out = vec![format!("📦 Containers in Account {}:\n", args.account_id)];
        for c in containers {
            out.push(format!("• {}", c.name));
            out.push(format!("  ID: {}", c.container_id));
            out.push(format!("  Public ID: {}", c.public_id));
            out.push(format!("  Type: {}\n", c.usage_context.join(", ")));
        }
        Ok(out.join("\n"))
    }

    async fn get_container(&self, ctx: &CallContext<'_>, args: WorkspaceArgs) -> Result<String, ToolError> {
        let path = args.container();
        let Some(container) = self.service.find_container(ctx.session, &path).await? else {
            return Ok(format!(
                "❌ Container not found: {}/{}",
                args.account_id, args.container_id
            ));
        };
        let snippet = container_snippet(&container.public_id);
        Ok(format!(
            "📦 Container Details:\n\nName: {}\nContainer ID: {}\nPublic ID: {}\nUsage Context: {}\nTime Zone: {}\n\n🔧 Container Snippet Code:\n\n{}",
            container.name,
            container.container_id,
            container.public_id,
            container.usage_context.join(", "),
            container.time_zone.as_deref().unwrap_or("Unknown"),
            snippet.instructions()
        ))
    }

    async fn list_workspaces(&self, ctx: &CallContext<'_>, args: WorkspaceArgs) -> Result<String, ToolError> {
        let workspaces = self
            .service
            .api()
            .list_workspaces(ctx.session, &args.container())
            .await?;
        if workspaces.is_empty() {
            return Ok(format!("🗂️ No workspaces found in container {}", args.container_id));
        }
        let mut out = vec![format!("🗂️ Workspaces in Container {}:\n", args.container_id)];
        out.extend(
            workspaces
                .into_iter()
                .map(|w| format!("• {} (ID: {})", w.name, w.workspace_id)),
        );
        Ok(out.join("\n"))
    }

    async fn list_in_workspace(
        &self,
        ctx: &CallContext<'_>,
        op: &str,
        args: WorkspaceArgs,
    ) -> Result<String, ToolError> {
        let ws = self
            .service
            .resolve_workspace(ctx.session, &args.container(), args.workspace_id.as_deref())
            .await?;
        let api = self.service.api();
        let (icon, noun, lines): (&str, &str, Vec<String>) = match op {
            "listTags" => (
                "🏷️",
                "tags",
                api.list_tags(ctx.session, &ws)
                    .await?
                    .into_iter()
                    .map(|t| format!("• {} (ID: {}, Type: {})", t.name, t.tag_id, t.tag_type))
                    .collect(),
            ),
            "listTriggers" => (
                "⚡",
                "triggers",
                api.list_triggers(ctx.session, &ws)
                    .await?
                    .into_iter()
                    .map(|t| format!("• {} (ID: {}, Type: {})", t.name, t.trigger_id, t.trigger_type))
                    .collect(),
            ),
            _ => (
                "📊",
                "variables",
                api.list_variables(ctx.session, &ws)
                    .await?
                    .into_iter()
                    .map(|v| format!("• {} (ID: {}, Type: {})", v.name, v.variable_id, v.variable_type))
                    .collect(),
            ),
        };
        if lines.is_empty() {
            return Ok(format!("{} No {} found in workspace {}", icon, noun, ws.workspace_id));
        }
        let title = format!("{}{}", noun[..1].to_uppercase(), &noun[1..]);
        let mut out = vec![format!("{} {} in Workspace {}:\n", icon, title, ws.workspace_id)];
        out.extend(lines);
        Ok(out.join("\n"))
    }

    async fn deploy_snippet(
        &self,
        ctx: &CallContext<'_>,
        args: DeploySnippetArgs,
    ) -> Result<String, ToolError> {
        let deployer = self
            .deployer
            .as_ref()
            .ok_or_else(|| ToolError::NotConfigured("GitHub deployment".to_string()))?;
        let repo_url = ctx
            .setup
            .github_repo_url
            .as_deref()
            .ok_or_else(|| ToolError::NotConfigured("GITHUB_REPO_URL".to_string()))?;
        let repo = parse_repo_url(repo_url)?;

        let path = ContainerPath::new(&args.account_id, &args.container_id);
        let Some(container) = self.service.find_container(ctx.session, &path).await? else {
            return Ok(format!(
                "❌ Container not found: {}/{}",
                args.account_id, args.container_id
            ));
        };
        let snippet = container_snippet(&container.public_id);
        let request = SnippetPullRequest {
            repo,
            branch: args
                .branch
                .unwrap_or_else(|| format!("metricmaster/gtm-{}", container.public_id.to_lowercase())),
            file_path: args.file_path.unwrap_or_else(|| DEFAULT_SNIPPET_PATH.to_string()),
            content: snippet.as_file(&container.public_id),
            title: format!("Add Google Tag Manager snippet ({})", container.public_id),
            body: snippet.instructions(),
        };
        let pr = deployer.open_pull_request(&request).await?;
        tracing::info!(
            repo = %request.repo.full_name(),
            pr = pr.number,
            public_id = %container.public_id,
            "Opened GTM snippet pull request"
        );
        Ok(format!(
            "✅ Opened pull request #{} with the {} snippet: {}",
            pr.number, container.public_id, pr.html_url
        ))
    }
}

#[async_trait]
impl ToolCallHandler for TagManagerTool {
    fn spec(&self) -> &'static ToolSpec {
        &GOOGLE_TAG_MANAGER_TOOL
    }

    fn check(&self, setup: &SetupConfig, op: &OpSpec, args: &Args) -> Result<(), ToolError> {
        match op.name {
            "linkGA4" => {
                let id = args.get("measurementId").and_then(Value::as_str).unwrap_or_default();
                if !id.trim().starts_with("G-") {
                    return Err(ToolError::invalid(
                        "measurementId",
                        format!("'{}' is not a GA4 measurement ID (G-XXXXXXXXXX)", id),
                    ));
                }
            }
            "createContainer" => {
                let request: CreateContainerArgs = parse_request(op, args)?;
                if let Some(bad) = request.usage_context.iter().find(|c| !usage_context_allowed(c)) {
                    return Err(ToolError::invalid(
                        "usageContext",
                        format!("'{}' is not one of web, android, ios, amp", bad),
                    ));
                }
            }
            "deploySnippet" => {
                if self.deployer.is_none() {
                    return Err(ToolError::NotConfigured("GitHub deployment".to_string()));
                }
                let url = setup
                    .github_repo_url
                    .as_deref()
                    .ok_or_else(|| ToolError::NotConfigured("GITHUB_REPO_URL".to_string()))?;
                parse_repo_url(url)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn describe_change(&self, op: &OpSpec, args: &Args) -> String {
        let arg = |name: &str| {
            args.get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        match op.name {
            "createContainer" => format!("create container: {}", arg("containerName")),
            "createTag" => format!("create tag: {}", arg("tagName")),
            "createTrigger" => format!("create trigger: {}", arg("triggerName")),
            "createVariable" => format!("create variable: {}", arg("variableName")),
            "createVersion" => format!("create version: {}", arg("versionName")),
            "publishVersion" => format!("publish version {}", arg("versionId")),
            "linkGA4" => format!("link GA4 measurement ID: {}", arg("measurementId")),
            "deploySnippet" => format!(
                "open pull request with GTM snippet for container {}",
                arg("containerId")
            ),
            other => other.to_string(),
        }
    }

    async fn execute(
        &self,
        ctx: &CallContext<'_>,
        op: &OpSpec,
        args: &Args,
    ) -> Result<String, ToolError> {
        match op.name {
            "listAccounts" => self.list_accounts(ctx).await,
            "listContainers" => self.list_containers(ctx, parse_request(op, args)?).await,
            "getContainer" => self.get_container(ctx, parse_request(op, args)?).await,
            "listWorkspaces" => self.list_workspaces(ctx, parse_request(op, args)?).await,
            "listTags" | "listTriggers" | "listVariables" => {
                self.list_in_workspace(ctx, op.name, parse_request(op, args)?).await
            }
            "createContainer" => {
                let request: CreateContainerArgs = parse_request(op, args)?;
                let container = self
                    .service
                    .api()
                    .create_container(
                        ctx.session,
                        &request.account_id,
                        &NewContainer {
                            name: request.container_name,
                            usage_context: request.usage_context,
                        },
                    )
                    .await?;
                Ok(format!(
                    "✅ Created container: {} (ID: {})",
                    container.name, container.container_id
                ))
            }
            "createTag" => {
                let request: CreateTagArgs = parse_request(op, args)?;
                let ws = self
                    .service
                    .resolve_workspace(
                        ctx.session,
                        &request.target.container(),
                        request.target.workspace_id.as_deref(),
                    )
                    .await?;
                let tag = self
                    .service
                    .api()
                    .create_tag(
                        ctx.session,
                        &ws,
                        &NewTag {
                            name: request.tag_name,
                            tag_type: request.tag_type,
                            parameters: request.parameters,
                            firing_trigger_ids: request.firing_trigger_id,
                        },
                    )
                    .await?;
                Ok(format!("✅ Created tag: {} (ID: {})", tag.name, tag.tag_id))
            }
            "createTrigger" => {
                let request: CreateTriggerArgs = parse_request(op, args)?;
                let ws = self
                    .service
                    .resolve_workspace(
                        ctx.session,
                        &request.target.container(),
                        request.target.workspace_id.as_deref(),
                    )
                    .await?;
                let trigger = self
                    .service
                    .api()
                    .create_trigger(
                        ctx.session,
                        &ws,
                        &NewTrigger {
                            name: request.trigger_name,
                            trigger_type: request.trigger_type,
                            filters: request.filters,
                        },
                    )
                    .await?;
                Ok(format!(
                    "✅ Created trigger: {} (ID: {})",
                    trigger.name, trigger.trigger_id
                ))
            }
            "createVariable" => {
                let request: CreateVariableArgs = parse_request(op, args)?;
                let ws = self
                    .service
                    .resolve_workspace(
                        ctx.session,
                        &request.target.container(),
                        request.target.workspace_id.as_deref(),
                    )
                    .await?;
                let parameters = match request.value.as_deref().filter(|v| !v.is_empty()) {
                    Some(value) => vec![Parameter::template("value", value)],
                    None => Vec::new(),
                };
                let variable = self
                    .service
                    .api()
                    .create_variable(
                        ctx.session,
                        &ws,
                        &NewVariable {
                            name: request.variable_name,
                            variable_type: request.variable_type,
                            parameters,
                        },
                    )
                    .await?;
                Ok(format!(
                    "✅ Created variable: {} (ID: {})",
                    variable.name, variable.variable_id
                ))
            }
            "createVersion" => {
                let request: CreateVersionArgs = parse_request(op, args)?;
                let ws = self
                    .service
                    .resolve_workspace(
                        ctx.session,
                        &request.target.container(),
                        request.target.workspace_id.as_deref(),
                    )
                    .await?;
                let version = self
                    .service
                    .api()
                    .create_version(
                        ctx.session,
                        &ws,
                        &NewVersion {
                            name: request.version_name.unwrap_or_default(),
                            notes: request.version_notes.unwrap_or_default(),
                        },
                    )
                    .await?;
                Ok(format!(
                    "✅ Created version: {} (ID: {})",
                    version.name, version.container_version_id
                ))
            }
            "publishVersion" => {
                let request: PublishVersionArgs = parse_request(op, args)?;
                let container =
                    ContainerPath::new(&request.account_id, &request.container_id);
                let published = self
                    .service
                    .api()
                    .publish_version(ctx.session, &container, &request.version_id)
                    .await?;
                tracing::info!(
                    container = %container.path(),
                    version_id = %request.version_id,
                    "Published GTM container version"
                );
                Ok(format!("✅ Published version to production: {}", published.name))
            }
            "linkGA4" => {
                let request: LinkGa4Args = parse_request(op, args)?;
                let ws = self
                    .service
                    .resolve_workspace(
                        ctx.session,
                        &request.target.container(),
                        request.target.workspace_id.as_deref(),
                    )
                    .await?;
                match self
                    .service
                    .link_ga4(ctx.session, &ws, request.measurement_id.trim())
                    .await?
                {
                    Some(tag) => Ok(format!(
                        "✅ Created GA4 configuration tag: {} (ID: {})\n\nGA4 is now linked to GTM. Create a version and publish to make it live.",
                        tag.name, tag.tag_id
                    )),
                    None => Ok(
                        "❌ Could not find 'All Pages' trigger. Create a pageview trigger first."
                            .to_string(),
                    ),
                }
            }
            "deploySnippet" => self.deploy_snippet(ctx, parse_request(op, args)?).await,
            other => Err(ToolError::UnknownOp {
                tool: self.spec().name,
                op: other.to_string(),
            }),
        }
    }
}
