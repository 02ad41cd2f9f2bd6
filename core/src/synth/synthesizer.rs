//! Context, generation, validation, execution.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use super::prompt::query_prompt;
use super::tools::SchemaTools;
use super::transitions::{PhaseTracker, SynthesisPhase};
use super::types::{
    ExecutedQuery, ExecutionMetadata, PlanOutcome, QueryPlan, QueryRequest, Rejection,
    SynthesisOutcome, ValidatedPlan,
};
use super::validate::{QueryValidator, ValidationResult};
use crate::config::{ContextConfig, SynthesisConfig};
use crate::error::SynthesisError;
use crate::execution::QueryExecutor;
use crate::generation::{
    GenerationCapability, GenerationRequest, GenerationResponse, ToolResult, ToolRound,
};
use crate::schema::SchemaGraph;
use crate::schema_context::{ContextLimits, SchemaContext, SchemaContextBuilder};
use crate::vector::FieldStore;

/// Schema sources available to one request. Either may be absent.
#[derive(Clone, Copy, Default)]
pub struct SchemaInputs<'a> {
    pub graph: Option<&'a SchemaGraph>,
    pub fields: Option<&'a FieldStore>,
}

impl<'a> SchemaInputs<'a> {
    pub fn graph(graph: &'a SchemaGraph) -> Self {
        Self {
            graph: Some(graph),
            fields: None,
        }
    }

    pub fn with_fields(mut self, fields: &'a FieldStore) -> Self {
        self.fields = Some(fields);
        self
    }
}

pub struct QuerySynthesizer {
    pub(super) generator: Arc<dyn GenerationCapability>,
    executor: Arc<dyn QueryExecutor>,
    pub(super) config: SynthesisConfig,
    limits: ContextLimits,
    validator: QueryValidator,
}

impl QuerySynthesizer {
    /// All configuration is validated here, once.
    pub fn new(
        generator: Arc<dyn GenerationCapability>,
        executor: Arc<dyn QueryExecutor>,
        config: SynthesisConfig,
        context: &ContextConfig,
    ) -> Result<Self, SynthesisError> {
        config.validate(context)?;
        let validator = QueryValidator::new(&config.read_only_keyword, config.min_confidence);
        Ok(Self {
            generator,
            executor,
            config,
            limits: context.limits(),
            validator,
        })
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Build context, generate and validate without executing.
    #[tracing::instrument(
        name = "synth.plan",
        skip_all,
        fields(generator = self.generator.name(), tables = ?request.tables)
    )]
    pub async fn plan(
        &self,
        request: &QueryRequest,
        inputs: SchemaInputs<'_>,
    ) -> Result<PlanOutcome, SynthesisError> {
        let mut tracker = PhaseTracker::new();
        self.plan_with(request, inputs, &mut tracker).await
    }

    /// Full pipeline. Execution failures are errors carrying the
    /// downstream `{error, details}`; validation failures are rejections.
    #[tracing::instrument(
        name = "synth.run",
        skip_all,
        fields(generator = self.generator.name(), executor = self.executor.name())
    )]
    pub async fn run(
        &self,
        request: &QueryRequest,
        inputs: SchemaInputs<'_>,
    ) -> Result<SynthesisOutcome, SynthesisError> {
        let mut tracker = PhaseTracker::new();
        let validated = match self.plan_with(request, inputs, &mut tracker).await? {
            PlanOutcome::Validated(v) => v,
            PlanOutcome::Rejected(r) => return Ok(SynthesisOutcome::Rejected(r)),
        };

        let rows = match self.executor.execute(&validated.plan.query).await {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(
                    target: "querysmith.synth",
                    request_id = %validated.request_id,
                    error = %err.error,
                    "execution endpoint rejected the query"
                );
                return Err(err.into());
            }
        };
        tracker.advance(SynthesisPhase::Executed)?;

        let metadata = ExecutionMetadata {
            request_id: validated.request_id,
            context_field_count: validated.context_field_count,
            result_field_count: result_field_count(&rows),
            row_count: rows.len(),
            tables_referenced: validated.plan.tables_used.clone(),
            tool_steps: validated.tool_steps,
            warnings: validated.warnings,
        };
        tracing::info!(
            target: "querysmith.synth",
            request_id = %metadata.request_id,
            rows = metadata.row_count,
            "query executed"
        );
        Ok(SynthesisOutcome::Executed(ExecutedQuery {
            plan: validated.plan,
            rows,
            metadata,
        }))
    }

    async fn plan_with(
        &self,
        request: &QueryRequest,
        inputs: SchemaInputs<'_>,
        tracker: &mut PhaseTracker,
    ) -> Result<PlanOutcome, SynthesisError> {
        let request_id = uuid::Uuid::new_v4().to_string();
        if inputs.graph.is_none() && inputs.fields.is_none() {
            return Err(SynthesisError::Input("no schema supplied".to_string()));
        }

        let mut builder = SchemaContextBuilder::new(self.limits);
        if let Some(graph) = inputs.graph {
            builder = builder.with_graph(graph);
        }
        if let Some(fields) = inputs.fields {
            builder = builder.with_fields(fields);
        }
        let context = builder.build(&request.tables, &request.description).await?;
        tracker.advance(SynthesisPhase::ContextBuilt)?;

        let tools = if self.config.enable_tools {
            inputs.graph.map(SchemaTools::new)
        } else {
            None
        };
        let prompt = query_prompt(
            &request.description,
            &context,
            &self.config.read_only_keyword,
            Utc::now(),
            tools.is_some(),
        );
        tracker.advance(SynthesisPhase::GenerationRequested)?;
        let (generated, tool_steps) = self.generate(prompt, tools.as_ref()).await?;
        let plan = QueryPlan::from_generated(generated)?;

        match self.validator.validate(&plan, Some(&context)) {
            ValidationResult::Invalid {
                reason,
                suggestions,
            } => {
                tracker.advance(SynthesisPhase::Rejected)?;
                tracing::warn!(
                    target: "querysmith.synth",
                    request_id = %request_id,
                    reason = %reason,
                    "plan rejected"
                );
                Ok(PlanOutcome::Rejected(Rejection {
                    reason,
                    suggestions,
                    plan: Some(plan),
                    phase: SynthesisPhase::GenerationRequested,
                }))
            }
            ValidationResult::Valid { mut warnings } => {
                tracker.advance(SynthesisPhase::Validated)?;
                warnings.extend(missing_table_warnings(&context));
                Ok(PlanOutcome::Validated(ValidatedPlan {
                    request_id,
                    plan,
                    context_field_count: context.field_count(),
                    tool_steps,
                    warnings,
                }))
            }
        }
    }

    /// One generation call, or a bounded tool loop when tools are offered.
    /// The last allowed round withdraws the tools so the model must answer.
    async fn generate(
        &self,
        prompt: String,
        tools: Option<&SchemaTools<'_>>,
    ) -> Result<(Value, usize), SynthesisError> {
        let mut request = GenerationRequest::new(prompt, QueryPlan::output_schema());
        if tools.is_some() {
            request.tools = SchemaTools::specs();
        }

        let mut steps = 0;
        loop {
            let response = self
                .generator
                .generate(&request)
                .await
                .map_err(|e| SynthesisError::generation_with("generation capability failed", e))?;
            let calls = match response {
                GenerationResponse::Final(value) => return Ok((value, steps)),
                GenerationResponse::ToolCalls(calls) => calls,
            };
            let Some(tools) = tools.filter(|_| !request.tools.is_empty()) else {
                return Err(SynthesisError::generation(
                    "model requested tool calls when none were offered",
                ));
            };
            steps += 1;
            let results = calls
                .iter()
                .map(|call| ToolResult {
                    call_id: call.id.clone(),
                    output: tools.call(call),
                })
                .collect();
            request.transcript.push(ToolRound { calls, results });
            if steps >= self.config.max_tool_steps {
                tracing::debug!(target: "querysmith.synth", steps, "tool step limit reached");
                request.tools.clear();
            }
        }
    }
}

fn missing_table_warnings(context: &SchemaContext) -> Vec<String> {
    context
        .missing_tables
        .iter()
        .map(|t| format!("requested table {t} was not found in the schema"))
        .collect()
}

fn result_field_count(rows: &[Value]) -> usize {
    rows.iter()
        .filter_map(Value::as_object)
        .flat_map(|row| row.keys())
        .collect::<BTreeSet<_>>()
        .len()
}
