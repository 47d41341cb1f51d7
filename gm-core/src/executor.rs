//! Parallel execution of a turn's agent tasks.
//!
//! Every task is spawned at once and supervised against the earlier of its
//! own deadline and the turn ceiling. A task that overruns is aborted and
//! reported as `Timeout`; whatever it would have produced is discarded. A
//! panicking agent becomes `Failure`. Nothing here retries.
//!
//! Agent tasks live only as long as the turn awaiting them: dropping the
//! future returned by [`ParallelExecutor::run`] aborts every agent still
//! running.

use crate::agents::{Agent, AgentKind, AgentResult, AgentTask};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

/// One settled task, in the same position as the task that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchedResult {
    pub kind: AgentKind,
    pub correlation_id: Uuid,
    pub result: AgentResult,
    pub elapsed: Duration,
}

/// Registered agents, one per kind.
#[derive(Debug, Default)]
pub struct ParallelExecutor {
    agents: HashMap<AgentKind, Arc<Agent>>,
}

impl ParallelExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent, replacing any earlier one of the same kind.
    pub fn with_agent(mut self, agent: impl Into<Agent>) -> Self {
        self.register(agent);
        self
    }

    pub fn register(&mut self, agent: impl Into<Agent>) {
        let agent = agent.into();
        self.agents.insert(agent.kind(), Arc::new(agent));
    }

    pub fn has(&self, kind: AgentKind) -> bool {
        self.agents.contains_key(&kind)
    }

    /// Run every task concurrently. Returns once all have settled or the
    /// turn deadline passes, whichever comes first.
    pub async fn run(&self, tasks: Vec<AgentTask>, turn_deadline: Instant) -> Vec<DispatchedResult> {
        let started = Instant::now();
        let supervised = tasks.into_iter().map(|task| {
            let agent = self.agents.get(&task.agent_kind).cloned();
            self.supervise(agent, task, turn_deadline, started)
        });
        join_all(supervised).await
    }

    async fn supervise(
        &self,
        agent: Option<Arc<Agent>>,
        task: AgentTask,
        turn_deadline: Instant,
        started: Instant,
    ) -> DispatchedResult {
        let kind = task.agent_kind;
        let correlation_id = task.correlation_id;
        let settle = |result: AgentResult| DispatchedResult {
            kind,
            correlation_id,
            result,
            elapsed: started.elapsed(),
        };

        let Some(agent) = agent else {
            warn!(agent = %kind, "no agent registered");
            return settle(AgentResult::Failure(format!("no {kind} agent registered")));
        };

        let limit = task.deadline.min(turn_deadline);
        let span = info_span!("agent", agent = %kind, correlation_id = %correlation_id);
        // Dropping the set aborts the agent, including when the turn itself
        // is dropped.
        let mut running = JoinSet::new();
        running.spawn(async move { agent.execute(&task).await }.instrument(span));

        let result = match timeout_at(limit, running.join_next()).await {
            Ok(Some(Ok(result))) => result,
            Ok(Some(Err(err))) => {
                warn!(agent = %kind, error = %err, "agent task panicked");
                AgentResult::Failure(format!("{kind} agent crashed"))
            }
            Ok(None) => AgentResult::Failure(format!("{kind} agent was never started")),
            Err(_) => {
                running.abort_all();
                AgentResult::Timeout
            }
        };

        let dispatched = settle(result);
        debug!(
            agent = %kind,
            %correlation_id,
            status = dispatched.result.status(),
            elapsed_ms = dispatched.elapsed.as_millis() as u64,
            "agent settled"
        );
        dispatched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{fixtures, Archivist, Narrator};
    use crate::rules::StandardRules;
    use crate::generation::{GenerationError, Generator, Prompt};
    use crate::testing::ScriptedGenerator;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn executor(narration_delay: Duration) -> ParallelExecutor {
        let generator = ScriptedGenerator::new()
            .reply("The mill creaks.")
            .with_delay(narration_delay);
        ParallelExecutor::new()
            .with_agent(Narrator::new(Arc::new(generator)))
            .with_agent(Archivist::new(Arc::new(StandardRules)))
    }

    fn task(kind: AgentKind, budget: Duration) -> AgentTask {
        fixtures::task_for(kind, "I look around the mill", fixtures::snapshot(), budget)
    }

    /// Takes three seconds, then marks itself finished.
    struct SlowGenerator {
        finished: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Generator for SlowGenerator {
        async fn generate(
            &self,
            _prompt: &Prompt,
            _max_tokens: usize,
            _deadline: Instant,
        ) -> Result<String, GenerationError> {
            tokio::time::sleep(Duration::from_secs(3)).await;
            self.finished.store(true, Ordering::SeqCst);
            Ok("The mill creaks.".to_string())
        }
    }

    struct CrashingGenerator;

    #[async_trait]
    impl Generator for CrashingGenerator {
        async fn generate(
            &self,
            _prompt: &Prompt,
            _max_tokens: usize,
            _deadline: Instant,
        ) -> Result<String, GenerationError> {
            panic!("generator fell over");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_align_with_tasks() {
        let tasks = vec![
            task(AgentKind::Archivist, Duration::from_secs(1)),
            task(AgentKind::Narrator, Duration::from_secs(5)),
        ];
        let results = executor(Duration::from_millis(500))
            .run(tasks, Instant::now() + Duration::from_secs(10))
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].kind, AgentKind::Archivist);
        assert_eq!(results[1].kind, AgentKind::Narrator);
        assert!(results.iter().all(|r| r.result.is_success()));
        assert!(results.iter().all(|r| r.correlation_id == Uuid::from_u128(7)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_agent_times_out_alone() {
        let tasks = vec![
            task(AgentKind::Narrator, Duration::from_secs(2)),
            task(AgentKind::Archivist, Duration::from_secs(2)),
        ];
        let start = Instant::now();
        let results = executor(Duration::from_secs(30))
            .run(tasks, Instant::now() + Duration::from_secs(10))
            .await;

        assert_eq!(results[0].result, AgentResult::Timeout);
        assert!(results[1].result.is_success());
        assert!(start.elapsed() <= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_turn_ceiling_bounds_everything() {
        let tasks = vec![task(AgentKind::Narrator, Duration::from_secs(60))];
        let start = Instant::now();
        let results = executor(Duration::from_secs(30))
            .run(tasks, Instant::now() + Duration::from_secs(1))
            .await;

        assert_eq!(results[0].result, AgentResult::Timeout);
        assert!(start.elapsed() <= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unregistered_agent_is_failure() {
        let tasks = vec![task(AgentKind::ContentKeeper, Duration::from_secs(1))];
        let results = executor(Duration::ZERO)
            .run(tasks, Instant::now() + Duration::from_secs(1))
            .await;
        assert!(matches!(&results[0].result, AgentResult::Failure(r) if r.contains("ContentKeeper")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_agent_is_failure() {
        let executor = ParallelExecutor::new()
            .with_agent(Narrator::new(Arc::new(CrashingGenerator)))
            .with_agent(Archivist::new(Arc::new(StandardRules)));
        let tasks = vec![
            task(AgentKind::Narrator, Duration::from_secs(1)),
            task(AgentKind::Archivist, Duration::from_secs(1)),
        ];
        let results = executor
            .run(tasks, Instant::now() + Duration::from_secs(5))
            .await;

        assert_eq!(
            results[0].result,
            AgentResult::Failure("Narrator agent crashed".to_string())
        );
        assert_eq!(results[0].result.status(), "failure");
        assert!(results[1].result.is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_turn_aborts_running_agents() {
        let finished = Arc::new(AtomicBool::new(false));
        let executor = ParallelExecutor::new().with_agent(Narrator::new(Arc::new(SlowGenerator {
            finished: finished.clone(),
        })));
        let tasks = vec![task(AgentKind::Narrator, Duration::from_secs(10))];

        let turn = executor.run(tasks, Instant::now() + Duration::from_secs(10));
        assert!(tokio::time::timeout(Duration::from_secs(1), turn).await.is_err());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }
}
