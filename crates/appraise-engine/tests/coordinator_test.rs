//! Integration tests for workflow scheduling through the coordinator.

mod common;

use std::sync::Arc;
use std::time::Duration;

use appraise_engine::{
  ChannelNotifier, Coordinator, CoordinatorError, EngineConfig, ExecutionEvent, SCHEDULER_ID,
  WorkflowResult, WorkflowStatus,
};
use appraise_registry::SharedRegistry;
use appraise_task::{Priority, Task, TaskStatus};
use appraise_workflow::{Fallback, TaskTemplate, Workflow, WorkflowError, WorkflowTask};
use common::{ScriptedProvider, Step};
use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;

fn task(task_type: &str) -> WorkflowTask {
  WorkflowTask::new(TaskTemplate::new(task_type, json!({ "property": "12 Elm St" })))
}

fn workflow(id: &str, tasks: Vec<WorkflowTask>) -> Workflow {
  let mut workflow = Workflow::new("appraisal", tasks);
  workflow.workflow_id = id.to_string();
  workflow.context_id = "property-12".to_string();
  workflow
}

fn coordinator(providers: Vec<Arc<ScriptedProvider>>) -> Coordinator {
  coordinator_with_config(providers, EngineConfig::default())
}

fn coordinator_with_config(
  providers: Vec<Arc<ScriptedProvider>>,
  config: EngineConfig,
) -> Coordinator {
  let coordinator = Coordinator::new(SharedRegistry::default(), config);
  for provider in providers {
    coordinator.register(provider);
  }
  coordinator
}

async fn run(coordinator: &Coordinator, workflow: Workflow) -> WorkflowResult {
  tokio::time::timeout(Duration::from_secs(5), coordinator.run_workflow(workflow))
    .await
    .expect("workflow did not finish")
    .expect("workflow rejected")
}

async fn next_finished(receiver: &mut UnboundedReceiver<ExecutionEvent>) -> WorkflowResult {
  loop {
    let event = tokio::time::timeout(Duration::from_secs(5), receiver.recv())
      .await
      .expect("no event received")
      .expect("channel closed");
    if let ExecutionEvent::WorkflowFinished { result } = event {
      return result;
    }
  }
}

#[tokio::test]
async fn test_independent_tasks_run_in_one_round() {
  // All four calls must be in flight together to pass the barrier.
  let provider = ScriptedProvider::new("extractor", &["extract"])
    .gate("extract", 4)
    .shared();
  let coordinator = coordinator(vec![provider.clone()]);

  let result = run(
    &coordinator,
    workflow(
      "wf",
      vec![task("extract"), task("extract"), task("extract"), task("extract")],
    ),
  )
  .await;

  assert_eq!(result.status, WorkflowStatus::Completed);
  assert_eq!(result.rounds, 1);
  assert_eq!(result.results.len(), 4);
  assert_eq!(result.metadata["completed"], json!(4));
  assert_eq!(result.metadata["failed"], json!(0));
  assert!(result.blocked.is_empty());
}

#[tokio::test]
async fn test_diamond_resolves_in_three_rounds() {
  let provider = ScriptedProvider::new("agent", &["extract", "value", "narrate"])
    .gate("value", 2)
    .shared();
  let coordinator = coordinator(vec![provider.clone()]);

  let result = run(
    &coordinator,
    workflow(
      "wf",
      vec![
        task("extract"),
        task("value").depends_on([0]),
        task("value").depends_on([0]),
        task("narrate").depends_on([1, 2]),
      ],
    ),
  )
  .await;

  assert_eq!(result.status, WorkflowStatus::Completed);
  assert_eq!(result.rounds, 3);

  let calls = provider.call_ids();
  assert_eq!(calls.len(), 4);
  assert_eq!(calls[0], "wf-task-0");
  assert_eq!(calls[3], "wf-task-3");
}

#[tokio::test]
async fn test_derived_tasks_carry_workflow_context() {
  let provider = ScriptedProvider::new("agent", &["extract"]).shared();
  let coordinator = coordinator(vec![provider.clone()]);

  let mut definition = task("extract");
  definition.template = definition
    .template
    .priority(Priority::High)
    .metadata("source", json!("mls"));
  run(&coordinator, workflow("wf", vec![definition])).await;

  let calls = provider.calls();
  let sent = &calls[0];
  assert_eq!(sent.id, "wf-task-0");
  assert_eq!(sent.requester, "workflow-coordinator");
  assert_eq!(sent.context_id.as_deref(), Some("property-12"));
  assert_eq!(sent.priority, Priority::High);
  assert_eq!(sent.metadata["source"], json!("mls"));
  assert_eq!(sent.payload["property"], "12 Elm St");
}

#[tokio::test]
async fn test_unregistered_task_type_fails_without_provider() {
  let provider = ScriptedProvider::new("extractor", &["extract"]).shared();
  let coordinator = coordinator(vec![provider.clone()]);

  let result = coordinator
    .execute_task(Task::new("compliance", json!({})))
    .await;

  assert_eq!(result.status, TaskStatus::Failed);
  assert_eq!(result.provider_id, SCHEDULER_ID);
  assert_eq!(result.confidence, 0.0);
  assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn test_optional_failure_unblocks_dependents() {
  let provider = ScriptedProvider::new("agent", &["market", "value"])
    .script("market", &[Step::Fail])
    .shared();
  let coordinator = coordinator(vec![provider.clone()]);

  let result = run(
    &coordinator,
    workflow(
      "wf",
      vec![task("market").optional(), task("value").depends_on([0])],
    ),
  )
  .await;

  assert_eq!(result.status, WorkflowStatus::Completed);
  assert_eq!(result.rounds, 2);
  assert_eq!(result.results["wf-task-0"].status, TaskStatus::Failed);
  assert_eq!(result.results["wf-task-1"].status, TaskStatus::Completed);
}

#[tokio::test]
async fn test_skip_fallback_unblocks_dependents() {
  let provider = ScriptedProvider::new("agent", &["market", "value"])
    .script("market", &[Step::Error("feed offline")])
    .shared();
  let coordinator = coordinator(vec![provider.clone()]);

  let result = run(
    &coordinator,
    workflow(
      "wf",
      vec![
        task("market").fallback(Fallback::Skip),
        task("value").depends_on([0]),
      ],
    ),
  )
  .await;

  assert_eq!(result.status, WorkflowStatus::Completed);
  assert_eq!(
    result.results["wf-task-0"].error.as_deref(),
    Some("feed offline")
  );
  assert_eq!(provider.call_count("wf-task-1"), 1);
}

#[tokio::test]
async fn test_substitute_completes_in_place_of_failed_task() {
  let provider = ScriptedProvider::new("agent", &["value", "value-simple", "narrate"])
    .script("value", &[Step::Fail])
    .shared();
  let coordinator = coordinator(vec![provider.clone()]);

  let substitute = TaskTemplate::new("value-simple", json!({ "method": "sales" }));
  let result = run(
    &coordinator,
    workflow(
      "wf",
      vec![
        task("value").fallback(Fallback::Substitute(substitute)),
        task("narrate").depends_on([0]),
      ],
    ),
  )
  .await;

  assert_eq!(result.status, WorkflowStatus::Completed);
  let stored = &result.results["wf-task-0"];
  assert_eq!(stored.status, TaskStatus::Completed);
  assert_eq!(stored.task_id, "wf-task-0-fallback");
  assert_eq!(stored.output, Some(json!({ "task_type": "value-simple" })));

  let substitute_call = provider
    .calls()
    .into_iter()
    .find(|t| t.id == "wf-task-0-fallback")
    .unwrap();
  assert_eq!(substitute_call.parent_task_id.as_deref(), Some("wf-task-0"));
  assert_eq!(substitute_call.payload, json!({ "method": "sales" }));
  assert_eq!(provider.call_count("wf-task-1"), 1);
}

#[tokio::test]
async fn test_failed_substitute_fails_original_task() {
  let provider = ScriptedProvider::new("agent", &["value", "value-simple", "narrate"])
    .script("value", &[Step::Fail])
    .script("value-simple", &[Step::Error("no comparables")])
    .shared();
  let coordinator = coordinator(vec![provider.clone()]);

  let substitute = TaskTemplate::new("value-simple", json!({}));
  let result = run(
    &coordinator,
    workflow(
      "wf",
      vec![
        task("extract"),
        task("value").fallback(Fallback::Substitute(substitute)),
        task("narrate").depends_on([1]),
      ],
    ),
  )
  .await;

  assert_eq!(result.status, WorkflowStatus::Partial);
  assert_eq!(
    result.results["wf-task-1"].error.as_deref(),
    Some("no comparables")
  );
  assert_eq!(result.blocked, vec!["wf-task-2"]);
  assert_eq!(provider.call_count("wf-task-2"), 0);
}

#[tokio::test]
async fn test_substitute_without_capable_provider_fails() {
  let provider = ScriptedProvider::new("agent", &["value"])
    .script("value", &[Step::Fail])
    .shared();
  let coordinator = coordinator(vec![provider]);

  let substitute = TaskTemplate::new("value-simple", json!({}));
  let result = run(
    &coordinator,
    workflow(
      "wf",
      vec![task("value").fallback(Fallback::Substitute(substitute))],
    ),
  )
  .await;

  assert_eq!(result.status, WorkflowStatus::Failed);
  assert_eq!(result.results["wf-task-0"].provider_id, SCHEDULER_ID);
}

#[tokio::test]
async fn test_partial_result_triggers_fallback_policy() {
  let provider = ScriptedProvider::new("agent", &["value"])
    .script("value", &[Step::Partial])
    .shared();
  let coordinator = coordinator(vec![provider]);

  let result = run(&coordinator, workflow("wf", vec![task("value")])).await;

  assert_eq!(result.status, WorkflowStatus::Failed);
  assert_eq!(result.results["wf-task-0"].status, TaskStatus::Partial);
}

#[tokio::test]
async fn test_retry_runs_task_again_next_round() {
  let provider = ScriptedProvider::new("agent", &["extract", "value"])
    .script("value", &[Step::Fail, Step::Error("timeout")])
    .shared();
  let coordinator = coordinator(vec![provider.clone()]);

  let result = run(
    &coordinator,
    workflow(
      "wf",
      vec![task("extract"), task("value").fallback(Fallback::Retry)],
    ),
  )
  .await;

  assert_eq!(result.status, WorkflowStatus::Completed);
  assert_eq!(provider.call_count("wf-task-1"), 3);
  assert_eq!(provider.call_count("wf-task-0"), 1);
  assert_eq!(result.rounds, 3);
  assert_eq!(result.results["wf-task-1"].status, TaskStatus::Completed);
}

#[tokio::test]
async fn test_retry_limit_fails_task() {
  let provider = ScriptedProvider::new("agent", &["value"])
    .script("value", &[Step::Fail, Step::Fail, Step::Fail, Step::Fail])
    .shared();
  let config = EngineConfig {
    max_retry_attempts: Some(2),
    ..EngineConfig::default()
  };
  let coordinator = coordinator_with_config(vec![provider.clone()], config);

  let result = run(
    &coordinator,
    workflow("wf", vec![task("value").fallback(Fallback::Retry)]),
  )
  .await;

  assert_eq!(result.status, WorkflowStatus::Failed);
  assert_eq!(provider.call_count("wf-task-0"), 3);
}

#[tokio::test]
async fn test_unbounded_retry_runs_until_success() {
  let provider = ScriptedProvider::new("agent", &["value"])
    .script(
      "value",
      &[Step::Fail, Step::Fail, Step::Fail, Step::Fail, Step::Fail],
    )
    .shared();
  let config = EngineConfig {
    max_retry_attempts: None,
    ..EngineConfig::default()
  };
  let coordinator = coordinator_with_config(vec![provider.clone()], config);

  let result = run(
    &coordinator,
    workflow("wf", vec![task("value").fallback(Fallback::Retry)]),
  )
  .await;

  assert_eq!(result.status, WorkflowStatus::Completed);
  assert_eq!(provider.call_count("wf-task-0"), 6);
  assert_eq!(result.rounds, 6);
}

#[tokio::test]
async fn test_task_retry_limit_overrides_engine_limit() {
  let provider = ScriptedProvider::new("agent", &["value"])
    .script("value", &[Step::Fail, Step::Fail])
    .shared();
  let coordinator = coordinator(vec![provider.clone()]);

  let result = run(
    &coordinator,
    workflow(
      "wf",
      vec![task("value").fallback(Fallback::Retry).max_retry_attempts(0)],
    ),
  )
  .await;

  assert_eq!(result.status, WorkflowStatus::Failed);
  assert_eq!(provider.call_count("wf-task-0"), 1);
}

#[tokio::test]
async fn test_failed_required_task_blocks_dependents() {
  let provider = ScriptedProvider::new("agent", &["extract", "value", "narrate"])
    .script("value", &[Step::Fail])
    .shared();
  let coordinator = coordinator(vec![provider.clone()]);

  let result = run(
    &coordinator,
    workflow(
      "wf",
      vec![
        task("extract"),
        task("value").depends_on([0]),
        task("narrate").depends_on([1]),
      ],
    ),
  )
  .await;

  assert_eq!(result.status, WorkflowStatus::Partial);
  assert_eq!(result.blocked, vec!["wf-task-2"]);
  assert_eq!(result.results.len(), 2);
  assert_eq!(provider.call_count("wf-task-2"), 0);
}

#[tokio::test]
async fn test_all_failures_report_failed() {
  let provider = ScriptedProvider::new("agent", &["extract"])
    .script("extract", &[Step::Fail, Step::Fail])
    .shared();
  let coordinator = coordinator(vec![provider]);

  let result = run(
    &coordinator,
    workflow("wf", vec![task("extract"), task("extract")]),
  )
  .await;

  assert_eq!(result.status, WorkflowStatus::Failed);
  assert_eq!(result.failures().count(), 2);
}

#[tokio::test]
async fn test_extract_then_value_scenario() {
  let extractor = ScriptedProvider::new("extractor", &["extract"]).shared();
  let valuer = ScriptedProvider::new("valuer", &["value"]).shared();
  let (notifier, mut events) = ChannelNotifier::channel();
  let coordinator = Coordinator::with_notifier(
    SharedRegistry::default(),
    EngineConfig::default(),
    notifier,
  );
  coordinator.register(extractor.clone());
  coordinator.register(valuer.clone());

  let workflow_id = coordinator
    .start_workflow(workflow(
      "wf-scenario",
      vec![task("extract"), task("value").depends_on([0])],
    ))
    .unwrap();
  assert_eq!(workflow_id, "wf-scenario");

  let finished = next_finished(&mut events).await;
  assert_eq!(finished.status, WorkflowStatus::Completed);

  let status = coordinator.get_workflow_status(&workflow_id).unwrap();
  assert_eq!(status.status, WorkflowStatus::Completed);
  assert_eq!(status.results.len(), 2);
  assert!(status.results.values().all(|r| r.status == TaskStatus::Completed));
  assert_eq!(status.results["wf-scenario-task-0"].provider_id, "extractor");
  assert_eq!(status.results["wf-scenario-task-1"].provider_id, "valuer");
  assert!(coordinator.active_workflows().is_empty());
}

#[tokio::test]
async fn test_active_workflow_reports_partial() {
  // The gate needs two parties but only one task exists, so the workflow
  // stays in flight until the test releases it.
  let provider = ScriptedProvider::new("agent", &["extract"])
    .gate("extract", 2)
    .shared();
  let coordinator = coordinator(vec![provider.clone()]);

  let workflow_id = coordinator
    .start_workflow(workflow("wf-active", vec![task("extract")]))
    .unwrap();

  let status = coordinator.get_workflow_status(&workflow_id).unwrap();
  assert_eq!(status.status, WorkflowStatus::Partial);
  assert_eq!(coordinator.active_workflows(), vec!["wf-active"]);

  // Resubmitting while active is rejected.
  let err = coordinator
    .start_workflow(workflow("wf-active", vec![task("extract")]))
    .unwrap_err();
  assert!(matches!(err, CoordinatorError::AlreadyActive { .. }));
}

#[tokio::test]
async fn test_cancelled_run_leaves_no_active_workflow() {
  // One task waiting on a two-party gate never returns.
  let provider = ScriptedProvider::new("agent", &["extract"])
    .gate("extract", 2)
    .shared();
  let coordinator = coordinator(vec![provider]);

  let cancelled = tokio::time::timeout(
    Duration::from_millis(50),
    coordinator.run_workflow(workflow("wf", vec![task("extract")])),
  )
  .await;
  assert!(cancelled.is_err());

  assert!(coordinator.active_workflows().is_empty());
  assert!(coordinator.get_workflow_status("wf").is_none());
  assert_eq!(
    coordinator
      .start_workflow(workflow("wf", vec![task("extract")]))
      .unwrap(),
    "wf"
  );
}

#[tokio::test]
async fn test_finished_workflow_is_not_found_without_history() {
  let provider = ScriptedProvider::new("agent", &["extract"]).shared();
  let config = EngineConfig {
    history_limit: 0,
    ..EngineConfig::default()
  };
  let coordinator = coordinator_with_config(vec![provider], config);

  let result = run(&coordinator, workflow("wf", vec![task("extract")])).await;
  assert_eq!(result.status, WorkflowStatus::Completed);
  assert!(coordinator.get_workflow_status("wf").is_none());
}

#[tokio::test]
async fn test_unknown_workflow_is_not_found() {
  let coordinator = coordinator(vec![]);
  assert!(coordinator.get_workflow_status("missing").is_none());
}

#[tokio::test]
async fn test_invalid_workflow_is_rejected() {
  let coordinator = coordinator(vec![]);

  let err = coordinator
    .start_workflow(workflow(
      "wf",
      vec![task("a").depends_on([1]), task("b").depends_on([0])],
    ))
    .unwrap_err();

  assert!(matches!(
    err,
    CoordinatorError::InvalidWorkflow(WorkflowError::Cycle { .. })
  ));
  assert!(coordinator.get_workflow_status("wf").is_none());
}

#[tokio::test]
async fn test_finish_event_is_emitted_once() {
  let provider = ScriptedProvider::new("agent", &["extract", "value"])
    .script("value", &[Step::Fail])
    .shared();
  let (notifier, mut events) = ChannelNotifier::channel();
  let coordinator = Coordinator::with_notifier(
    SharedRegistry::default(),
    EngineConfig::default(),
    notifier,
  );
  coordinator.register(provider);

  let result = coordinator
    .run_workflow(workflow(
      "wf",
      vec![task("extract"), task("value").optional()],
    ))
    .await
    .unwrap();
  drop(coordinator);

  let mut finished = 0;
  let mut completed_events = 0;
  while let Ok(event) = events.try_recv() {
    match event {
      ExecutionEvent::WorkflowFinished { result: emitted } => {
        finished += 1;
        assert_eq!(emitted, result);
      }
      ExecutionEvent::TaskCompleted { .. } => completed_events += 1,
      _ => {}
    }
  }

  assert_eq!(finished, 1);
  assert_eq!(completed_events, 2);
}

#[tokio::test]
async fn test_empty_workflow_completes() {
  let coordinator = coordinator(vec![]);

  let result = run(&coordinator, workflow("wf", vec![])).await;

  assert_eq!(result.status, WorkflowStatus::Completed);
  assert_eq!(result.rounds, 0);
  assert!(result.results.is_empty());
}

#[tokio::test]
async fn test_independent_workflows_run_concurrently() {
  // Each workflow's single task waits for the other's, so both must be in
  // flight at the same time.
  let provider = ScriptedProvider::new("agent", &["extract"])
    .gate("extract", 2)
    .shared();
  let coordinator = coordinator(vec![provider]);

  let (a, b) = tokio::join!(
    run(&coordinator, workflow("wf-a", vec![task("extract")])),
    run(&coordinator, workflow("wf-b", vec![task("extract")])),
  );

  assert_eq!(a.status, WorkflowStatus::Completed);
  assert_eq!(b.status, WorkflowStatus::Completed);
}
