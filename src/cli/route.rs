//! CLI route: single route table and run context. Dispatches to the RPC core and the script engine.

use crate::cli::output::CommandOutput;
use crate::cli::parse::{CacheCommands, Commands};
use crate::client::RpcClient;
use crate::config::{AppConfig, ConfigLoader};
use crate::context::{parse_context_flags, Context};
use crate::error::ApiError;
use crate::operation::Operation;
use crate::profile::registry::ProfileRegistry;
use crate::profile::Profile;
use crate::script::{ScriptDocument, ScriptEngine};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Per-invocation options taken from global flags.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Explicit profile name (flag, or ODOO_PROFILE)
    pub profile: Option<String>,
    /// Mutation override for read-only profiles
    pub force: bool,
    /// Raw `key=value` context flags
    pub context: Vec<String>,
    pub no_cache: bool,
}

/// Runtime context for CLI execution: loaded configuration, profiles and call options.
pub struct RunContext {
    config: AppConfig,
    registry: ProfileRegistry,
    options: RunOptions,
    call_context: Context,
}

impl RunContext {
    /// Load configuration (explicit file, or workspace layering) and validate profiles.
    pub fn new(
        workspace_root: PathBuf,
        config_path: Option<PathBuf>,
        options: RunOptions,
    ) -> Result<Self, ApiError> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        Self::from_config(config, options)
    }

    pub fn from_config(config: AppConfig, options: RunOptions) -> Result<Self, ApiError> {
        let registry = config.registry()?;
        let call_context = parse_context_flags(&options.context)?;
        Ok(Self {
            config,
            registry,
            options,
            call_context,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The profile this invocation targets.
    pub fn profile(&self) -> Result<&Profile, ApiError> {
        self.registry.resolve(self.options.profile.as_deref())
    }

    /// Client over the JSON-RPC transport for the selected profile.
    pub fn connect(&self) -> Result<RpcClient, ApiError> {
        let client = RpcClient::connect(self.profile()?.clone())?
            .with_global_context(self.config.context.clone());
        if self.options.no_cache {
            return Ok(client);
        }
        // A cache locked by another process is skipped, not fatal.
        Ok(match self.config.cache.build() {
            Ok(Some(cache)) => client.with_cache(cache),
            Ok(None) => client,
            Err(e) => {
                tracing::warn!(error = %e, "Result cache unavailable; continuing without it");
                client
            }
        })
    }

    /// Execute a CLI command via the single route table.
    pub async fn execute(&self, command: &Commands) -> Result<CommandOutput, ApiError> {
        match command {
            Commands::Profiles => Ok(CommandOutput::Profiles(
                self.registry.list().iter().map(Profile::masked).collect(),
            )),
            Commands::Cache {
                command: CacheCommands::Clear,
            } => {
                let removed = match self.config.cache.build()? {
                    Some(cache) => cache.clear()?,
                    None => 0,
                };
                Ok(CommandOutput::CacheCleared(removed))
            }
            _ => {
                let client = self.connect()?;
                self.execute_with_client(&client, command).await
            }
        }
    }

    /// Execute an RPC or script command against an existing client.
    pub async fn execute_with_client(
        &self,
        client: &RpcClient,
        command: &Commands,
    ) -> Result<CommandOutput, ApiError> {
        let started = Instant::now();
        let result = self.dispatch(client, command).await;
        match &result {
            Ok(_) => tracing::info!(
                command = command.name(),
                profile = %client.profile().name,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Command completed"
            ),
            Err(e) => tracing::warn!(
                command = command.name(),
                profile = %client.profile().name,
                error = %e,
                "Command failed"
            ),
        }
        result
    }

    async fn dispatch(
        &self,
        client: &RpcClient,
        command: &Commands,
    ) -> Result<CommandOutput, ApiError> {
        let force = self.options.force;
        let call_context = (!self.call_context.is_empty()).then_some(&self.call_context);
        let invoke = move |operation: Operation| async move {
            client
                .invoke(&operation, call_context, force)
                .await
                .map(CommandOutput::Value)
        };

        match command {
            Commands::Search {
                model,
                domain,
                fields,
                limit,
                offset,
                order,
            } => {
                let domain = parse_json_arg("domain", domain)?;
                let operation = match fields {
                    Some(fields) => {
                        Operation::search_read(model, domain).kwarg("fields", json!(fields))
                    }
                    None => Operation::search(model, domain),
                };
                invoke(
                    operation
                        .kwarg_opt("limit", limit.map(|l| json!(l)))
                        .kwarg_opt("offset", offset.map(|o| json!(o)))
                        .kwarg_opt("order", order.as_ref().map(|o| json!(o))),
                )
                .await
            }
            Commands::Read { model, ids, fields } => {
                invoke(
                    Operation::read(model, ids)
                        .kwarg_opt("fields", fields.as_ref().map(|f| json!(f))),
                )
                .await
            }
            Commands::Count { model, domain } => {
                let domain = parse_json_arg("domain", domain)?;
                invoke(Operation::search_count(model, domain)).await
            }
            Commands::Fields { model, attributes } => {
                invoke(
                    Operation::fields_get(model)
                        .kwarg_opt("attributes", attributes.as_ref().map(|a| json!(a))),
                )
                .await
            }
            Commands::Models => {
                let models = client.list_models().await?;
                Ok(CommandOutput::Value(json!(models)))
            }
            Commands::Create { model, values } => {
                let values = parse_json_object("values", values)?;
                invoke(Operation::create(model, values)).await
            }
            Commands::Update { model, ids, values } => {
                let values = parse_json_object("values", values)?;
                invoke(Operation::write(model, ids, values)).await
            }
            Commands::Delete { model, ids } => invoke(Operation::unlink(model, ids)).await,
            Commands::Execute {
                model,
                method,
                args,
                kwargs,
            } => {
                let args = match parse_json_arg("args", args)? {
                    Value::Array(args) => args,
                    _ => {
                        return Err(ApiError::InvalidInput(
                            "args must be a JSON list".to_string(),
                        ))
                    }
                };
                let kwargs: Map<String, Value> = match parse_json_object("kwargs", kwargs)? {
                    Value::Object(kwargs) => kwargs,
                    _ => Map::new(),
                };
                invoke(Operation::new(model, method).args(args).kwargs(kwargs)).await
            }
            Commands::Run { script, on_error } => {
                let document = load_script(script, &self.call_context)?;
                let result = ScriptEngine::new(client)
                    .with_mutation_override(force)
                    .run(&document, *on_error)
                    .await?;
                Ok(CommandOutput::Script(result))
            }
            Commands::Profiles | Commands::Cache { .. } => Err(ApiError::InvalidInput(format!(
                "'{}' does not take a connection",
                command.name()
            ))),
        }
    }
}

/// Load a script; `--context` flags are layered over the document's own context.
fn load_script(path: &Path, call_context: &Context) -> Result<ScriptDocument, ApiError> {
    let mut document = ScriptDocument::from_path(path)?;
    if !call_context.is_empty() {
        let mut context = document.context.take().unwrap_or_default();
        context.extend(call_context.clone());
        document.context = Some(context);
    }
    Ok(document)
}

fn parse_json_arg(name: &str, raw: &str) -> Result<Value, ApiError> {
    serde_json::from_str(raw)
        .map_err(|e| ApiError::InvalidInput(format!("{} is not valid JSON: {}", name, e)))
}

fn parse_json_object(name: &str, raw: &str) -> Result<Value, ApiError> {
    let value = parse_json_arg(name, raw)?;
    if !value.is_object() {
        return Err(ApiError::InvalidInput(format!(
            "{} must be a JSON object",
            name
        )));
    }
    Ok(value)
}
