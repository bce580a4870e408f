//! Recording fakes for the orchestrator's collaborators.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use droidbench_agent::{AgentError, Trajectory};
use droidbench_core::{AgentRunPayload, Budget, TaskResult, TaskSpec};
use droidbench_device::{CapabilityControl, DeviceError, OverlayToggle};
use droidbench_env::{EnvError, Environment};

use crate::launcher::{AgentAttempt, AgentLauncher};
use crate::notify::{ExceptionChannel, ExceptionContext};
use crate::results::{ResultSink, SinkError};

fn api_error(path: &str) -> EnvError {
    EnvError::Api {
        status: 500,
        path: path.to_string(),
    }
}

/// In-memory environment with a fixed task table and per-operation failure
/// switches.
#[derive(Default)]
pub struct FakeEnv {
    tasks: Vec<(String, usize)>,
    complexity: f64,
    pub fail_reset: bool,
    pub fail_initialize: Vec<(String, usize)>,
    pub fail_score: bool,
    pub fail_teardown: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeEnv {
    /// Environment knowing the given (name, instance count) pairs, reporting
    /// the given complexity for every instance.
    pub fn new(tasks: &[(&str, usize)], complexity: f64) -> Self {
        Self {
            tasks: tasks.iter().map(|(n, c)| (n.to_string(), *c)).collect(),
            complexity,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Environment for FakeEnv {
    async fn health(&self) -> Result<bool, EnvError> {
        Ok(true)
    }

    async fn reset(&self, _go_home: bool) -> Result<(), EnvError> {
        if self.fail_reset {
            return Err(api_error("/reset"));
        }
        self.record("reset".to_string());
        Ok(())
    }

    async fn reinitialize_suite(
        &self,
        _n_task_combinations: u32,
        _seed: u64,
        task_family: &str,
    ) -> Result<(), EnvError> {
        self.record(format!("reinitialize {task_family}"));
        Ok(())
    }

    async fn list_tasks(
        &self,
        min_idx: Option<usize>,
        max_idx: Option<usize>,
    ) -> Result<Vec<String>, EnvError> {
        let names: Vec<String> = self.tasks.iter().map(|(n, _)| n.clone()).collect();
        let min = min_idx.unwrap_or(0).min(names.len());
        let max = max_idx.unwrap_or(names.len()).clamp(min, names.len());
        Ok(names[min..max].to_vec())
    }

    async fn task_instance_count(&self, task_name: &str) -> Result<usize, EnvError> {
        self.tasks
            .iter()
            .find(|(n, _)| n == task_name)
            .map(|(_, count)| *count)
            .ok_or_else(|| api_error("/task_length"))
    }

    async fn task_goal(&self, task_name: &str, task_idx: usize) -> Result<String, EnvError> {
        Ok(format!("goal for {task_name} {task_idx}"))
    }

    async fn task_complexity(&self, _task_name: &str, _task_idx: usize) -> Result<f64, EnvError> {
        Ok(self.complexity)
    }

    async fn initialize_task(&self, task_name: &str, task_idx: usize) -> Result<(), EnvError> {
        if self
            .fail_initialize
            .iter()
            .any(|(n, i)| n == task_name && *i == task_idx)
        {
            return Err(api_error("/initialize_task"));
        }
        self.record(format!("initialize {task_name} {task_idx}"));
        Ok(())
    }

    async fn task_score(&self, task_name: &str, task_idx: usize) -> Result<f64, EnvError> {
        if self.fail_score {
            return Err(api_error("/task_score"));
        }
        self.record(format!("score {task_name} {task_idx}"));
        Ok(0.5)
    }

    async fn tear_down_task(&self, task_name: &str, task_idx: usize) -> Result<(), EnvError> {
        if self.fail_teardown {
            return Err(api_error("/tear_down_task"));
        }
        self.record(format!("tear_down {task_name} {task_idx}"));
        Ok(())
    }
}

/// Capability control that counts calls and can be told to fail.
#[derive(Default)]
pub struct FakeCapability {
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl FakeCapability {
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CapabilityControl for FakeCapability {
    async fn enable_capability(&self, _disable_first: bool) -> Result<(), DeviceError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeviceError::CommandFailed {
                command: "settings put secure".to_string(),
                code: 1,
                stderr: "denied".to_string(),
            });
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Overlay toggle that counts commands.
#[derive(Default)]
pub struct FakeOverlay {
    commands: AtomicUsize,
}

impl FakeOverlay {
    pub fn count(&self) -> usize {
        self.commands.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OverlayToggle for FakeOverlay {
    async fn disable_overlay(&self) -> Result<(), DeviceError> {
        self.commands.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

enum LauncherBehavior {
    Succeed,
    TimeOut { steps: u32 },
    Error(String),
}

/// Launcher producing a canned outcome instead of driving a real agent.
pub struct FakeLauncher {
    behavior: LauncherBehavior,
    launches: AtomicUsize,
}

impl Default for FakeLauncher {
    fn default() -> Self {
        Self {
            behavior: LauncherBehavior::Succeed,
            launches: AtomicUsize::new(0),
        }
    }
}

impl FakeLauncher {
    pub fn timing_out(steps: u32) -> Self {
        Self {
            behavior: LauncherBehavior::TimeOut { steps },
            launches: AtomicUsize::new(0),
        }
    }

    pub fn erroring(message: &str) -> Self {
        Self {
            behavior: LauncherBehavior::Error(message.to_string()),
            launches: AtomicUsize::new(0),
        }
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentLauncher for FakeLauncher {
    async fn run_task(&self, _spec: &TaskSpec, budget: &Budget) -> AgentAttempt {
        self.launches.fetch_add(1, Ordering::SeqCst);

        let mut trajectory = Trajectory::new();
        trajectory.push(1, "<ui/>", "{\"action\":\"tap\",\"x\":1,\"y\":2}");

        let outcome = match &self.behavior {
            LauncherBehavior::Succeed => Ok(AgentRunPayload {
                steps: 3,
                success: true,
                reason: "done".to_string(),
            }),
            LauncherBehavior::TimeOut { steps } => Err(AgentError::Timeout {
                steps: *steps,
                timeout: budget.timeout,
            }),
            LauncherBehavior::Error(message) => Err(AgentError::Llm(message.clone())),
        };

        AgentAttempt {
            outcome,
            trajectory,
        }
    }
}

/// One recorded notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub stage: String,
    pub task: (String, usize),
    pub error: String,
}

/// Exception channel that records instead of delivering.
#[derive(Default)]
pub struct RecordingChannel {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingChannel {
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExceptionChannel for RecordingChannel {
    async fn notify(&self, error: &str, ctx: ExceptionContext<'_>) {
        self.notifications.lock().unwrap().push(Notification {
            stage: ctx.stage.label().to_string(),
            task: (ctx.task_name.to_string(), ctx.task_idx),
            error: error.to_string(),
        });
    }
}

/// Sink that records instead of writing files.
#[derive(Default)]
pub struct RecordingSink {
    results: Mutex<Vec<TaskResult>>,
    trajectories: Mutex<Vec<(String, usize)>>,
    fail_trajectory: AtomicBool,
}

impl RecordingSink {
    pub fn fail_trajectory(&self) {
        self.fail_trajectory.store(true, Ordering::SeqCst);
    }

    pub fn results(&self) -> Vec<TaskResult> {
        self.results.lock().unwrap().clone()
    }

    pub fn trajectories(&self) -> Vec<(String, usize)> {
        self.trajectories.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResultSink for RecordingSink {
    async fn persist(&self, result: &TaskResult) -> Result<(), SinkError> {
        self.results.lock().unwrap().push(result.clone());
        Ok(())
    }

    async fn persist_trajectory(
        &self,
        task_name: &str,
        task_idx: usize,
        _trajectory: &Trajectory,
    ) -> Result<(), SinkError> {
        if self.fail_trajectory.load(Ordering::SeqCst) {
            return Err(SinkError::Io(std::io::Error::other("disk full")));
        }
        self.trajectories
            .lock()
            .unwrap()
            .push((task_name.to_string(), task_idx));
        Ok(())
    }
}
