mod common;

use common::{ScriptedExecutor, ScriptedOracle};
use serde_json::json;
use sqlmend::execution::Row;
use sqlmend::execution_loop::{
    Outcome, RequestContext, RetryOrchestrator, RetryPolicy, EXECUTION_FAILED_MESSAGE,
    NOT_FOUND_MESSAGE,
};
use sqlmend::query::{Condition, Operator, QueryModel};
use sqlmend::schema::Table;
use sqlmend::AgentError;
use std::sync::Arc;
use std::time::Duration;

fn pending_shipments() -> QueryModel {
    QueryModel::new(Table::Shipments)
        .select(["shipment_id", "status"])
        .filter(Condition::new("status", Operator::Eq, 3i64))
}

fn orchestrator(oracle: Arc<ScriptedOracle>, executor: Arc<ScriptedExecutor>) -> RetryOrchestrator {
    RetryOrchestrator::new(common::builtin_registry(), oracle, executor)
}

#[tokio::test]
async fn test_stops_at_attempt_ceiling() {
    let oracle = Arc::new(ScriptedOracle::always(pending_shipments(), 10));
    let executor = Arc::new(ScriptedExecutor::failing(
        "relation \"shipments\" does not exist (SQLSTATE 42P01)",
        10,
    ));

    let report = orchestrator(oracle.clone(), executor.clone())
        .run(RequestContext::new("Which shipments are pending?"))
        .await;

    assert_eq!(oracle.calls(), 3);
    assert_eq!(oracle.table_counts(), vec![3, 3, 3]);
    assert_eq!(executor.statements().len(), 3);
    assert_eq!(report.attempts(), 3);
    match &report.outcome {
        Outcome::Exhausted { message, attempts } => {
            assert_eq!(message, NOT_FOUND_MESSAGE);
            assert_eq!(*attempts, 3);
        }
        other => panic!("expected Exhausted, got {:?}", other),
    }
    assert_eq!(report.outcome.render(), NOT_FOUND_MESSAGE);
}

#[tokio::test]
async fn test_configured_ceiling_is_honoured() {
    let oracle = Arc::new(ScriptedOracle::always(pending_shipments(), 10));
    let executor = Arc::new(ScriptedExecutor::failing("syntax error at or near \"FROM\"", 10));

    let report = orchestrator(oracle.clone(), executor)
        .with_policy(RetryPolicy {
            max_attempts: 5,
            ..RetryPolicy::default()
        })
        .run(RequestContext::new("q"))
        .await;

    assert_eq!(oracle.calls(), 5);
    assert!(matches!(report.outcome, Outcome::Exhausted { attempts: 5, .. }));
}

#[tokio::test]
async fn test_second_attempt_sees_first_failure() {
    let oracle = Arc::new(ScriptedOracle::always(pending_shipments(), 2));
    let executor = Arc::new(ScriptedExecutor::new(vec![
        Err(AgentError::Execution(
            "column \"statu\" does not exist (SQLSTATE 42703)".to_string(),
        )),
        Ok(vec![Row::new().with("shipment_id", json!(1001)).with("status", json!(3))]),
    ]));

    let report = orchestrator(oracle.clone(), executor.clone())
        .run(RequestContext::new("Which shipments are pending?").with_expected_answer("A list of shipments"))
        .await;

    let answer = report.outcome.answer().expect("answered");
    assert_eq!(answer.attempts, 2);
    assert_eq!(answer.rows.len(), 1);
    assert_eq!(answer.sql, executor.statements()[1]);

    assert_eq!(oracle.table_counts(), vec![3, 3]);

    let prompts = oracle.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(!prompts[0].contains("The previous query was"));
    assert!(prompts[1].contains("column \"statu\" does not exist"));
    assert!(prompts[1].contains(&format!("The previous query was: {}", executor.statements()[0])));
    assert!(prompts[1].contains("Which shipments are pending?"));

    assert_eq!(
        report.outcome.render(),
        format!(
            "Result: [{{\"shipment_id\":1001,\"status\":3}}] obtained from the query: {}",
            answer.sql
        )
    );
    assert_eq!(report.transcript[0].failure_class.as_deref(), Some("UndefinedColumn(statu)"));
    assert_eq!(report.transcript[1].row_count, Some(1));
}

#[tokio::test]
async fn test_invalid_model_never_reaches_executor() {
    let invented = QueryModel::new(Table::Shipments).select(["port_of_loading"]);
    let oracle = Arc::new(ScriptedOracle::new(vec![
        Ok(invented),
        Ok(pending_shipments()),
    ]));
    let executor = Arc::new(ScriptedExecutor::new(vec![Ok(vec![])]));

    let report = orchestrator(oracle.clone(), executor.clone())
        .run(RequestContext::new("q"))
        .await;

    assert!(report.outcome.is_answered());
    assert_eq!(executor.statements().len(), 1);

    let prompts = oracle.prompts();
    assert!(prompts[1].contains("port_of_loading"));
    assert!(prompts[1].contains("Valid columns for table 'shipments' are:"));
    assert!(report.transcript[0].sql.is_none());
}

#[tokio::test]
async fn test_oracle_failure_consumes_an_attempt() {
    let oracle = Arc::new(ScriptedOracle::new(vec![
        Err(AgentError::Oracle("Failed to parse function call arguments".to_string())),
        Ok(pending_shipments()),
    ]));
    let executor = Arc::new(ScriptedExecutor::new(vec![Ok(vec![])]));

    let report = orchestrator(oracle.clone(), executor)
        .run(RequestContext::new("q"))
        .await;

    assert_eq!(report.outcome.answer().map(|a| a.attempts), Some(2));
    let prompts = oracle.prompts();
    assert!(prompts[1].contains("did not produce a usable query"));
    assert!(prompts[1].contains("Failed to parse function call arguments"));
}

#[tokio::test]
async fn test_unreachable_database_fails_immediately() {
    let oracle = Arc::new(ScriptedOracle::always(pending_shipments(), 3));
    let executor = Arc::new(ScriptedExecutor::new(vec![Err(AgentError::Unavailable(
        "connection refused".to_string(),
    ))]));

    let report = orchestrator(oracle.clone(), executor)
        .run(RequestContext::new("q"))
        .await;

    assert_eq!(oracle.calls(), 1);
    match &report.outcome {
        Outcome::Failed { message, reason } => {
            assert_eq!(message, EXECUTION_FAILED_MESSAGE);
            assert!(reason.contains("connection refused"));
        }
        other => panic!("expected Failed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_tenant_scope_applied_to_executed_sql() {
    let oracle = Arc::new(ScriptedOracle::always(QueryModel::new(Table::Orders), 1));
    let executor = Arc::new(ScriptedExecutor::new(vec![Ok(vec![])]));

    orchestrator(oracle, executor.clone())
        .run(RequestContext::new("q").with_tenant(42).with_session("s-1"))
        .await;

    assert_eq!(
        executor.statements(),
        vec!["SELECT * FROM orders WHERE organization_id = 42 LIMIT 10".to_string()]
    );
}

#[tokio::test]
async fn test_missing_tenant_column_fails_without_retry() {
    let oracle = Arc::new(ScriptedOracle::always(QueryModel::new(Table::Orders), 3));
    let executor = Arc::new(ScriptedExecutor::new(vec![]));

    let report = RetryOrchestrator::new(
        common::registry_without_tenant_column(),
        oracle.clone(),
        executor.clone(),
    )
    .run(RequestContext::new("q").with_tenant(42))
    .await;

    assert_eq!(oracle.calls(), 1);
    assert!(executor.statements().is_empty());
    match &report.outcome {
        Outcome::Failed { message, reason } => {
            assert_eq!(message, EXECUTION_FAILED_MESSAGE);
            assert!(reason.contains("organization_id"), "{}", reason);
        }
        other => panic!("expected Failed, got {:?}", other),
    }
    assert_eq!(report.transcript[0].failure_class.as_deref(), Some("Fatal"));
}

#[tokio::test]
async fn test_slow_oracle_times_out_and_retries() {
    let oracle = Arc::new(
        ScriptedOracle::always(pending_shipments(), 3).with_delay(Duration::from_millis(200)),
    );
    let executor = Arc::new(ScriptedExecutor::new(vec![]));

    let report = orchestrator(oracle.clone(), executor.clone())
        .with_policy(RetryPolicy {
            max_attempts: 2,
            attempt_timeout: Some(Duration::from_millis(20)),
            deadline: None,
        })
        .run(RequestContext::new("q"))
        .await;

    assert_eq!(oracle.calls(), 2);
    assert!(executor.statements().is_empty());
    assert!(matches!(report.outcome, Outcome::Exhausted { attempts: 2, .. }));
    assert_eq!(report.transcript[0].failure_class.as_deref(), Some("Timeout"));
    assert!(oracle.prompts()[1].contains("took too long"));
}

#[tokio::test]
async fn test_deadline_ends_loop_early() {
    let oracle = Arc::new(
        ScriptedOracle::always(pending_shipments(), 5).with_delay(Duration::from_millis(100)),
    );
    let executor = Arc::new(ScriptedExecutor::new(vec![]));

    let report = orchestrator(oracle.clone(), executor)
        .with_policy(RetryPolicy {
            max_attempts: 5,
            attempt_timeout: None,
            deadline: Some(Duration::from_millis(50)),
        })
        .run(RequestContext::new("q"))
        .await;

    assert_eq!(oracle.calls(), 1);
    assert!(matches!(report.outcome, Outcome::Exhausted { attempts: 1, .. }));
}
