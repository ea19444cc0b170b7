//! Contract tests for the row executor boundary.
//!
//! These tests verify the executor contracts:
//! - Executors without batch support still answer `execute_batch`
//! - Batched results are distributed by parameter vector index
//! - Malformed batch results abort the assembly

use async_trait::async_trait;
use parking_lot::Mutex;

use nestql::catalog::{Catalog, ElementDef, GroupDefinition};
use nestql::executor::{InMemoryExecutor, RowExecutor};
use nestql::template::{Binding, TemplateDef};
use nestql::types::{DataType, Row, Value};
use nestql::{row, AssemblyConfig, AssemblyStrategy, CorrelatedAssembler, NestqlError};

const PARENT_QUERY: &str = "SELECT id FROM parent";
const CHILD_QUERY: &str = "SELECT label FROM child WHERE parent = ?";

fn create_test_catalog() -> Catalog {
    let parent = GroupDefinition::virtual_group(
        "parent",
        vec![ElementDef::new("id", DataType::Int64).unwrap()],
        TemplateDef::uncorrelated(PARENT_QUERY),
    )
    .unwrap();
    let child = GroupDefinition::virtual_group(
        "child",
        vec![ElementDef::new("label", DataType::String).unwrap()],
        TemplateDef::new(CHILD_QUERY, vec![Binding::new("parent.id")]),
    )
    .unwrap();
    Catalog::from_definitions(vec![parent, child]).unwrap()
}

/// Executor answering each child query with the parameter echoed back.
#[derive(Default)]
struct EchoExecutor {
    seen: Mutex<Vec<Vec<Value>>>,
}

#[async_trait]
impl RowExecutor for EchoExecutor {
    async fn execute(&self, query: &str, params: &[Value]) -> nestql::Result<Vec<Row>> {
        self.seen.lock().push(params.to_vec());
        if query == PARENT_QUERY {
            return Ok(vec![row![10], row![20], row![30]]);
        }
        Ok(vec![row![format!("for {}", params[0])]])
    }
}

/// Executor claiming batch support but dropping the last result set.
struct TruncatingExecutor;

#[async_trait]
impl RowExecutor for TruncatingExecutor {
    async fn execute(&self, _query: &str, _params: &[Value]) -> nestql::Result<Vec<Row>> {
        Ok(vec![row![1], row![2]])
    }

    fn supports_batch(&self) -> bool {
        true
    }

    async fn execute_batch(
        &self,
        _query: &str,
        param_sets: &[Vec<Value>],
    ) -> nestql::Result<Vec<Vec<Row>>> {
        Ok(vec![vec![row!["x"]]; param_sets.len().saturating_sub(1)])
    }
}

#[test]
fn test_default_batch_runs_each_vector() {
    let executor = EchoExecutor::default();
    assert!(!executor.supports_batch());

    let sets = vec![vec![Value::from(1)], vec![Value::from(2)]];
    let results = tokio_test::block_on(executor.execute_batch(CHILD_QUERY, &sets)).unwrap();
    assert_eq!(results, vec![vec![row!["for 1"]], vec![row!["for 2"]]]);
    assert_eq!(*executor.seen.lock(), sets);
}

#[test]
fn test_custom_executor_drives_assembly() {
    let catalog = create_test_catalog();
    let executor = EchoExecutor::default();
    let assembler = CorrelatedAssembler::new(&catalog, &executor);

    let doc = tokio_test::block_on(assembler.assemble("parent")).unwrap();
    let labels: Vec<String> = doc
        .children("parent")
        .unwrap()
        .iter()
        .map(|p| p.children("child").unwrap()[0].value("label").unwrap().to_string())
        .collect();
    assert_eq!(labels, vec!["for 10", "for 20", "for 30"]);
}

#[test]
fn test_batch_results_distributed_by_index() {
    let catalog = create_test_catalog();
    let executor = InMemoryExecutor::new()
        .with_rows(PARENT_QUERY, vec![], vec![row![1], row![2], row![3]])
        .with_rows(CHILD_QUERY, vec![Value::from(1)], vec![row!["a"], row!["b"]])
        .with_rows(CHILD_QUERY, vec![Value::from(3)], vec![row!["c"]])
        .with_batch_support(true);
    let assembler = CorrelatedAssembler::new(&catalog, &executor);

    let doc = tokio_test::block_on(assembler.assemble("parent")).unwrap();
    let counts: Vec<usize> = doc
        .children("parent")
        .unwrap()
        .iter()
        .map(|p| p.children("child").unwrap().len())
        .collect();
    assert_eq!(counts, vec![2, 0, 1]);
    assert_eq!(executor.call_count(), 2);
}

#[test]
fn test_short_batch_result_is_execution_error() {
    let catalog = create_test_catalog();
    let executor = TruncatingExecutor;
    let assembler = CorrelatedAssembler::new(&catalog, &executor)
        .with_config(AssemblyConfig::new().with_strategy(AssemblyStrategy::Batched));

    let err = tokio_test::block_on(assembler.assemble("parent")).unwrap_err();
    assert!(matches!(err, NestqlError::Assembly { ref group, .. } if group == "child"));
    assert!(matches!(err.root_cause(), NestqlError::ExecutionError(_)));
}

#[test]
fn test_executor_is_object_safe() {
    let executors: Vec<Box<dyn RowExecutor>> =
        vec![Box::new(EchoExecutor::default()), Box::new(TruncatingExecutor)];
    assert_eq!(
        executors.iter().map(|e| e.supports_batch()).collect::<Vec<_>>(),
        vec![false, true]
    );
}
