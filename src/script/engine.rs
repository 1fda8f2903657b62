//! Script engine: runs a validated document step by step against an `RpcClient`.
//! Owns reference substitution and the failure policy; guardrails, context and cache stay in the core.

use crate::client::RpcClient;
use crate::context::{Context, ContextStack};
use crate::error::{ApiError, ErrorReport};
use crate::operation::Operation;
use crate::script::document::{ScriptAction, ScriptDocument, ScriptStep};
use crate::script::reference::{extract_ids, substitute, walk_path, Reference};
use crate::script::result::{
    AggregateResult, RollbackAction, RollbackEntry, RunState, ScriptResult,
};
use crate::script::OnError;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Instant;

/// A completed mutating step, kept for rollback
#[derive(Debug, Clone)]
struct CompletedMutation {
    step: String,
    action: ScriptAction,
    model: String,
    ids: Vec<i64>,
    context: Context,
}

/// Stored output of a successful step
#[derive(Debug, Clone)]
struct StepOutput {
    value: Value,
    ids: Vec<i64>,
}

/// Sequential executor for script documents.
pub struct ScriptEngine<'a> {
    client: &'a RpcClient,
    allow_mutation_override: bool,
}

impl<'a> ScriptEngine<'a> {
    pub fn new(client: &'a RpcClient) -> Self {
        Self {
            client,
            allow_mutation_override: false,
        }
    }

    /// Let mutations through on a read-only profile. Protected profiles still refuse.
    pub fn with_mutation_override(mut self, allow: bool) -> Self {
        self.allow_mutation_override = allow;
        self
    }

    /// Run a document. `on_error` overrides the document's own policy.
    ///
    /// Returns `Err` only for definition errors, before any step has run. Step
    /// failures are reported inside the aggregate result.
    pub async fn run(
        &self,
        document: &ScriptDocument,
        on_error: Option<OnError>,
    ) -> Result<AggregateResult, ApiError> {
        document.validate()?;

        let policy = on_error.or(document.on_error).unwrap_or_default();
        let profile_name = self.client.profile().name.clone();
        let started = Instant::now();

        let mut state = RunState::Pending;
        tracing::debug!(profile = %profile_name, steps = document.operations.len(), ?state, "Script accepted");
        state = RunState::Running;
        tracing::info!(profile = %profile_name, steps = document.operations.len(), policy = %policy, ?state, "Script started");

        let mut results: BTreeMap<String, ScriptResult> = BTreeMap::new();
        let mut order: Vec<String> = Vec::new();
        let mut failed_steps: Vec<String> = Vec::new();
        let mut failed: HashSet<String> = HashSet::new();
        let mut outputs: HashMap<String, StepOutput> = HashMap::new();
        let mut completed_mutations: Vec<CompletedMutation> = Vec::new();
        let mut rollback: Vec<RollbackEntry> = Vec::new();
        let mut aborted = false;
        let mut auth_failed = false;

        for step in &document.operations {
            let step_started = Instant::now();
            order.push(step.id.clone());

            let outcome = match step
                .references()
                .into_iter()
                .find(|reference| failed.contains(&reference.step))
            {
                Some(reference) => Err(ApiError::DependencyFailed {
                    step: step.id.clone(),
                    dependency: reference.step,
                }),
                None => {
                    self.execute_step(step, document.context.as_ref(), &outputs)
                        .await
                }
            };
            let duration_ms = step_started.elapsed().as_millis() as u64;

            match outcome {
                Ok((value, ids, executed)) => {
                    tracing::info!(step = %step.id, action = %step.action, model = %step.model, duration_ms, "Step completed");
                    if let Some(mutation) = executed {
                        completed_mutations.push(mutation);
                    }
                    outputs.insert(
                        step.id.clone(),
                        StepOutput {
                            value: value.clone(),
                            ids: ids.clone(),
                        },
                    );
                    results.insert(
                        step.id.clone(),
                        ScriptResult::succeeded(value, ids, duration_ms),
                    );
                }
                Err(err) => {
                    tracing::warn!(step = %step.id, action = %step.action, model = %step.model, duration_ms, error = %err, "Step failed");
                    results.insert(
                        step.id.clone(),
                        ScriptResult::failed(ErrorReport::new(&err, Some(profile_name.as_str())), duration_ms),
                    );
                    failed_steps.push(step.id.clone());
                    failed.insert(step.id.clone());

                    // Bad credentials end the run under every policy.
                    if matches!(err, ApiError::Auth(_)) {
                        tracing::error!(profile = %profile_name, step = %step.id, "Authentication failed; aborting script");
                        aborted = true;
                        auth_failed = true;
                        break;
                    }

                    match policy {
                        OnError::Continue => continue,
                        OnError::Stop => {
                            aborted = true;
                            break;
                        }
                        OnError::Rollback => {
                            aborted = true;
                            rollback = self.roll_back(&completed_mutations).await;
                            break;
                        }
                    }
                }
            }
        }

        state = if !aborted {
            RunState::Completed
        } else if auth_failed {
            RunState::Failed
        } else if policy == OnError::Rollback
            && rollback
                .iter()
                .all(|entry| entry.action != RollbackAction::Failed)
        {
            RunState::RolledBack
        } else {
            RunState::Failed
        };

        let success = match policy {
            OnError::Continue => state == RunState::Completed,
            _ => failed_steps.is_empty(),
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        tracing::info!(
            profile = %profile_name,
            ?state,
            success,
            executed = order.len(),
            failed = failed_steps.len(),
            duration_ms,
            "Script finished"
        );

        Ok(AggregateResult {
            state,
            success,
            on_error: policy,
            results,
            order,
            failed_steps,
            rollback,
            duration_ms,
        })
    }

    async fn execute_step(
        &self,
        step: &ScriptStep,
        script_context: Option<&Context>,
        outputs: &HashMap<String, StepOutput>,
    ) -> Result<(Value, Vec<i64>, Option<CompletedMutation>), ApiError> {
        let context = ContextStack::new()
            .push(script_context)
            .push(step.context.as_ref())
            .resolve();
        let context = if context.is_empty() { None } else { Some(context) };

        let mut resolve = |reference: &Reference| resolve_reference(step, reference, outputs);
        let domain = match &step.domain {
            Some(domain) => substitute(domain, &mut resolve)?,
            None => json!([]),
        };
        let ids = match &step.ids {
            Some(ids) => Some(ids_argument(step, ids, substitute(ids, &mut resolve)?)?),
            None => None,
        };
        let values = step
            .values
            .as_ref()
            .map(|values| substitute(values, &mut resolve))
            .transpose()?;
        let fields = step
            .fields
            .as_ref()
            .map(|fields| substitute(fields, &mut resolve))
            .transpose()?;
        let args = match &step.args {
            Some(args) => args
                .iter()
                .map(|arg| substitute(arg, &mut resolve))
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };
        let kwargs = match &step.kwargs {
            Some(kwargs) => match substitute(&Value::Object(kwargs.clone()), &mut resolve)? {
                Value::Object(map) => map,
                _ => Map::new(),
            },
            None => Map::new(),
        };

        let input_ids = ids.clone().unwrap_or_default();
        let limit = step.limit.map(|l| json!(l));
        let offset = step.offset.map(|o| json!(o));
        let order = step.order.as_ref().map(|o| json!(o));

        let operation = match step.action {
            ScriptAction::Search => Operation::search(&step.model, domain)
                .kwarg_opt("limit", limit)
                .kwarg_opt("offset", offset)
                .kwarg_opt("order", order),
            ScriptAction::SearchRead => Operation::search_read(&step.model, domain)
                .kwarg_opt("fields", fields)
                .kwarg_opt("limit", limit)
                .kwarg_opt("offset", offset)
                .kwarg_opt("order", order),
            ScriptAction::SearchCount => Operation::search_count(&step.model, domain),
            ScriptAction::Read => {
                Operation::read(&step.model, &input_ids).kwarg_opt("fields", fields)
            }
            ScriptAction::Create => {
                Operation::create(&step.model, values.unwrap_or_else(|| json!({})))
            }
            ScriptAction::Write => Operation::write(
                &step.model,
                &input_ids,
                values.unwrap_or_else(|| json!({})),
            ),
            ScriptAction::Unlink => Operation::unlink(&step.model, &input_ids),
            ScriptAction::FieldsGet => {
                Operation::fields_get(&step.model).kwarg_opt("allfields", fields)
            }
            ScriptAction::NameSearch => Operation::new(&step.model, "name_search")
                .kwarg("name", json!(step.name.clone().unwrap_or_default()))
                .kwarg_opt("args", step.domain.as_ref().map(|_| domain))
                .kwarg_opt("limit", limit),
            ScriptAction::Execute => {
                Operation::new(&step.model, step.method.clone().unwrap_or_default())
            }
        };
        let operation = operation.args(args).kwargs(kwargs).with_context(context);

        let value = self
            .client
            .invoke(&operation, None, self.allow_mutation_override)
            .await?;

        let produced_ids = match step.action {
            ScriptAction::Write | ScriptAction::Unlink => input_ids,
            _ => extract_ids(&value),
        };

        let mutation = operation.is_mutation().then(|| CompletedMutation {
            step: step.id.clone(),
            action: step.action,
            model: step.model.clone(),
            ids: produced_ids.clone(),
            context: operation.context.clone().unwrap_or_default(),
        });

        Ok((value, produced_ids, mutation))
    }

    /// Undo completed mutations, newest first. Only created records can be removed.
    async fn roll_back(&self, completed: &[CompletedMutation]) -> Vec<RollbackEntry> {
        let mut entries = Vec::new();
        for mutation in completed.iter().rev() {
            if mutation.action != ScriptAction::Create {
                tracing::warn!(step = %mutation.step, action = %mutation.action, "Rollback cannot revert step");
                entries.push(RollbackEntry {
                    step: mutation.step.clone(),
                    action: RollbackAction::Skipped,
                    ids: mutation.ids.clone(),
                    message: Some(format!("'{}' cannot be reverted", mutation.action)),
                });
                continue;
            }
            if mutation.ids.is_empty() {
                entries.push(RollbackEntry {
                    step: mutation.step.clone(),
                    action: RollbackAction::Deleted,
                    ids: Vec::new(),
                    message: None,
                });
                continue;
            }

            let context = (!mutation.context.is_empty()).then(|| mutation.context.clone());
            let operation = Operation::unlink(&mutation.model, &mutation.ids).with_context(context);
            match self
                .client
                .invoke(&operation, None, self.allow_mutation_override)
                .await
            {
                Ok(_) => {
                    tracing::info!(step = %mutation.step, model = %mutation.model, ids = ?mutation.ids, "Rolled back created records");
                    entries.push(RollbackEntry {
                        step: mutation.step.clone(),
                        action: RollbackAction::Deleted,
                        ids: mutation.ids.clone(),
                        message: None,
                    });
                }
                Err(err) => {
                    tracing::error!(step = %mutation.step, model = %mutation.model, error = %err, "Rollback failed");
                    entries.push(RollbackEntry {
                        step: mutation.step.clone(),
                        action: RollbackAction::Failed,
                        ids: mutation.ids.clone(),
                        message: Some(err.to_string()),
                    });
                }
            }
        }
        entries
    }
}

fn resolve_reference(
    step: &ScriptStep,
    reference: &Reference,
    outputs: &HashMap<String, StepOutput>,
) -> Result<Value, ApiError> {
    let error = |reason: String| ApiError::VariableResolution {
        step: step.id.clone(),
        reference: reference.raw.clone(),
        reason,
    };
    let output = outputs
        .get(&reference.step)
        .ok_or_else(|| error(format!("step '{}' has no result", reference.step)))?;
    walk_path(&output.value, &output.ids, &reference.path).map_err(error)
}

/// Interpret a resolved `ids` argument as a list of record ids.
fn ids_argument(step: &ScriptStep, raw: &Value, resolved: Value) -> Result<Vec<i64>, ApiError> {
    let ids = match &resolved {
        Value::Number(n) => n.as_i64().map(|id| vec![id]),
        Value::Array(items) => items.iter().map(Value::as_i64).collect(),
        _ => None,
    };
    match (ids, raw) {
        (Some(ids), _) => Ok(ids),
        (None, Value::String(token)) => Err(ApiError::VariableResolution {
            step: step.id.clone(),
            reference: token.clone(),
            reason: format!("expected record ids, got {}", resolved),
        }),
        (None, _) => Err(ApiError::InvalidInput(format!(
            "Step '{}': ids must be an integer or a list of integers",
            step.id
        ))),
    }
}
