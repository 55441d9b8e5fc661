//! Retry Loop
//!
//! Bounded propose → compile → execute loop. Each failed attempt feeds its query and
//! error text into the next prompt; the first attempt that returns rows wins.

use crate::compiler::{SqlCompiler, TenantScope};
use crate::config::DEFAULT_TENANT_COLUMN;
use crate::error::{AgentError, Result};
use crate::execution::{ExecutionAdapter, Row};
use crate::execution_loop::error_classifier::ErrorClassifier;
use crate::execution_loop::error_recovery::{ErrorRecovery, PreviousAttempt};
use crate::execution_loop::outcome::{Answer, AttemptRecord, Outcome, RunReport};
use crate::oracle::QueryOracle;
use crate::query::QueryModel;
use crate::schema::SchemaRegistry;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Everything known about one incoming question. Owned by a single run.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub question: String,
    pub expected_answer: String,
    pub tenant_id: Option<i64>,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
}

impl RequestContext {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }

    pub fn with_expected_answer(mut self, expected_answer: impl Into<String>) -> Self {
        self.expected_answer = expected_answer.into();
        self
    }

    pub fn with_tenant(mut self, tenant_id: i64) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Applies separately to the oracle call and to execution
    pub attempt_timeout: Option<Duration>,
    /// Wall-clock budget for the whole loop
    pub deadline: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout: None,
            deadline: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopState {
    Proposing,
    Compiling,
    Executing,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopState::Proposing => write!(f, "oracle"),
            LoopState::Compiling => write!(f, "compile"),
            LoopState::Executing => write!(f, "execution"),
        }
    }
}

/// What one attempt got as far as producing
#[derive(Default)]
struct AttemptProgress {
    query: Option<QueryModel>,
    sql: Option<String>,
}

pub struct RetryOrchestrator {
    registry: Arc<SchemaRegistry>,
    oracle: Arc<dyn QueryOracle>,
    executor: Arc<dyn ExecutionAdapter>,
    compiler: SqlCompiler,
    tenant_column: String,
    policy: RetryPolicy,
    recovery: ErrorRecovery,
    classifier: ErrorClassifier,
}

impl RetryOrchestrator {
    pub fn new(
        registry: Arc<SchemaRegistry>,
        oracle: Arc<dyn QueryOracle>,
        executor: Arc<dyn ExecutionAdapter>,
    ) -> Self {
        Self {
            compiler: SqlCompiler::new(Arc::clone(&registry)),
            recovery: ErrorRecovery::new(Arc::clone(&registry)),
            registry,
            oracle,
            executor,
            tenant_column: DEFAULT_TENANT_COLUMN.to_string(),
            policy: RetryPolicy::default(),
            classifier: ErrorClassifier::new(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_row_limit(mut self, row_limit: u32) -> Self {
        self.compiler = self.compiler.with_row_limit(row_limit);
        self
    }

    pub fn with_tenant_column(mut self, tenant_column: impl Into<String>) -> Self {
        self.tenant_column = tenant_column.into();
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run the loop for one question. Never returns an error: every ending is an `Outcome`.
    pub async fn run(&self, ctx: RequestContext) -> RunReport {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "request",
            %run_id,
            tenant_id = ?ctx.tenant_id,
            session_id = ?ctx.session_id,
            user_id = ?ctx.user_id
        );

        let (outcome, transcript) = self.run_attempts(&ctx).instrument(span).await;
        RunReport {
            run_id,
            outcome,
            transcript,
        }
    }

    async fn run_attempts(&self, ctx: &RequestContext) -> (Outcome, Vec<AttemptRecord>) {
        info!("Question: {}", ctx.question);
        info!("Expected Answer: {}", ctx.expected_answer);

        let mut transcript = Vec::new();
        let compiler = match self.compiler_for(ctx) {
            Ok(compiler) => compiler,
            Err(e) => return (Outcome::failed(e.to_string()), transcript),
        };

        let started = Instant::now();
        let mut previous: Option<PreviousAttempt> = None;

        for attempt in 1..=self.policy.max_attempts {
            if let Some(deadline) = self.policy.deadline {
                if started.elapsed() >= deadline {
                    warn!("Deadline of {:?} elapsed before attempt {}", deadline, attempt);
                    break;
                }
            }

            info!("Execution attempt {} of {}", attempt, self.policy.max_attempts);

            let prompt =
                self.recovery
                    .build_prompt(&ctx.question, &ctx.expected_answer, previous.as_ref());
            let mut record = AttemptRecord::new(attempt, prompt.clone());
            let mut progress = AttemptProgress::default();

            let result = self
                .attempt(&compiler, &prompt, started, &mut progress)
                .instrument(info_span!("attempt", attempt))
                .await;

            record.query_model = progress
                .query
                .as_ref()
                .and_then(|q| serde_json::to_value(q).ok());
            record.sql = progress.sql.clone();

            match result {
                Ok(rows) => {
                    info!("Execution succeeded on attempt {} with {} row(s)", attempt, rows.len());
                    record.row_count = Some(rows.len());
                    transcript.push(record);

                    // Only reachable with SQL in hand
                    let sql = progress.sql.unwrap_or_default();
                    return (
                        Outcome::Answered(Answer {
                            rows,
                            sql,
                            attempts: attempt,
                        }),
                        transcript,
                    );
                }
                Err(e) => {
                    let class = self.classifier.classify(&e);
                    let message = e.to_string();
                    record.record_failure(&message, &class);
                    transcript.push(record);

                    if !e.is_recoverable() {
                        error!("Attempt {} failed unrecoverably ({}): {}", attempt, class, message);
                        return (Outcome::failed(message), transcript);
                    }

                    warn!("Attempt {} failed ({}): {}", attempt, class, message);
                    previous = Some(PreviousAttempt {
                        query: progress.query,
                        sql: progress.sql,
                        error: message,
                        class,
                    });
                }
            }
        }

        let attempts = transcript.len() as u32;
        info!("Giving up after {} attempt(s)", attempts);
        (Outcome::exhausted(attempts), transcript)
    }

    async fn attempt(
        &self,
        compiler: &SqlCompiler,
        prompt: &str,
        started: Instant,
        progress: &mut AttemptProgress,
    ) -> Result<Vec<Row>> {
        let state = LoopState::Proposing;
        debug!("Attempt state: {}", state);
        let query = self
            .bounded(state, started, self.oracle.propose(prompt, &self.registry))
            .await?;
        progress.query = Some(query.clone());

        let state = LoopState::Compiling;
        debug!("Attempt state: {}", state);
        let sql = compiler.compile(&query)?;
        info!("SQL: {}", sql);
        progress.sql = Some(sql.clone());

        let state = LoopState::Executing;
        debug!("Attempt state: {} via {}", state, self.executor.name());
        self.bounded(state, started, self.executor.execute(&sql))
            .await
    }

    /// Apply the per-call timeout, shortened to whatever is left of the deadline
    async fn bounded<T, F>(&self, state: LoopState, started: Instant, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match self.call_limit(started) {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => Err(AgentError::Timeout(format!(
                    "{} call did not finish within {}ms",
                    state,
                    limit.as_millis()
                ))),
            },
            None => call.await,
        }
    }

    fn call_limit(&self, started: Instant) -> Option<Duration> {
        let remaining = self
            .policy
            .deadline
            .map(|deadline| deadline.saturating_sub(started.elapsed()));

        match (self.policy.attempt_timeout, remaining) {
            (Some(timeout), Some(remaining)) => Some(timeout.min(remaining)),
            (timeout, remaining) => timeout.or(remaining),
        }
    }

    fn compiler_for(&self, ctx: &RequestContext) -> Result<SqlCompiler> {
        match ctx.tenant_id {
            Some(tenant_id) => {
                let scope = TenantScope::new(self.tenant_column.clone(), tenant_id)?;
                Ok(self.compiler.clone().with_tenant(scope))
            }
            None => Ok(self.compiler.clone()),
        }
    }
}
