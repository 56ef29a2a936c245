use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info, warn};

use sluice_core::config::SchedulingConfig;
use sluice_core::error::SluiceError;
use sluice_core::types::{
    JobDescriptor, JobId, JobMap, JobState, ResourceId, ResourceMap, ResourceState,
    ResourceTopology, TaskDescriptor, TaskId, TaskMap, TaskState,
};
use sluice_graph::manager::FlowGraphManager;

use crate::cost::create_cost_model;
use crate::delta::{DeltaKind, SchedulingDelta};
use crate::dispatcher::Dispatcher;
use crate::solver::{ExternalSolver, FlowSolver, SspSolver};

/// Flow-based scheduler core: every event mutates the flow network, every
/// round solves it and applies the resulting placements.
///
/// A single scheduling lock serializes all graph mutations and the solver
/// call, which can take seconds on large clusters; events arriving
/// mid-round queue behind it. Binding a task prunes all of its alternative
/// arcs, so placements are final for the task's lifetime.
pub struct FlowScheduler {
    state: Mutex<SchedulerState>,
}

struct SchedulerState {
    graph: FlowGraphManager,
    dispatcher: Dispatcher,
    jobs: JobMap,
    tasks: TaskMap,
    resources: ResourceMap,
    bindings: HashMap<TaskId, ResourceId>,
}

impl FlowScheduler {
    pub fn new(config: SchedulingConfig) -> Self {
        let cost_model = create_cost_model(&config);
        let solver: Box<dyn FlowSolver> = match &config.solver {
            Some(solver_config) => Box::new(ExternalSolver::new(solver_config.clone())),
            None => Box::new(SspSolver::new()),
        };
        Self {
            state: Mutex::new(SchedulerState {
                graph: FlowGraphManager::new(cost_model),
                dispatcher: Dispatcher::new(solver),
                jobs: JobMap::new(),
                tasks: TaskMap::new(),
                resources: ResourceMap::new(),
                bindings: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().expect("scheduling lock poisoned")
    }

    /// Registers a machine topology (resource registration event).
    pub fn register_resource(&self, topology: &ResourceTopology, local: bool) {
        let mut guard = self.lock();
        let state = &mut *guard;
        debug!(
            "registering {} resource topology rooted at {}",
            if local { "local" } else { "remote" },
            topology.descriptor.id
        );
        for rd in topology.descriptors() {
            state.resources.insert(rd.id, rd.clone());
        }
        state.graph.update_resource_topology(topology);
    }

    /// Makes a job and its tasks visible to the scheduler.
    pub fn submit_job(&self, job: JobDescriptor, tasks: Vec<TaskDescriptor>) {
        let mut guard = self.lock();
        info!("job {} submitted with {} tasks", job.id, tasks.len());
        for mut td in tasks {
            td.job_id = job.id;
            if td.state == TaskState::Created {
                td.state = TaskState::Runnable;
            }
            guard.tasks.insert(td.uid, td);
        }
        let mut job = job;
        if job.state == JobState::New {
            job.state = JobState::Runnable;
        }
        guard.jobs.insert(job.id, job);
    }

    /// Installs the job's runnable tasks into the graph and runs a
    /// scheduling round. Returns how many tasks were placed.
    pub fn schedule_job(&self, job_id: JobId) -> Result<u64, SluiceError> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let Some(job) = state.jobs.get(&job_id).cloned() else {
            warn!("schedule_job: unknown job {}", job_id);
            return Ok(0);
        };
        let runnable: Vec<TaskDescriptor> = state
            .tasks
            .values()
            .filter(|td| td.job_id == job_id && td.is_runnable())
            .cloned()
            .collect();
        if runnable.is_empty() {
            debug!("job {} has no runnable tasks", job_id);
            return Ok(0);
        }
        info!("scheduling job {} ({} runnable tasks)", job_id, runnable.len());
        state.graph.add_or_update_job_nodes(&job, &runnable, &state.resources);
        Self::run_iteration(state)
    }

    /// Runs one solver round over the graph as it stands.
    pub fn run_scheduling_iteration(&self) -> Result<u64, SluiceError> {
        let mut guard = self.lock();
        Self::run_iteration(&mut guard)
    }

    fn run_iteration(state: &mut SchedulerState) -> Result<u64, SluiceError> {
        let mappings = state.dispatcher.run(&mut state.graph)?;
        let mut deltas = Vec::new();
        for (task_nid, leaf_nid) in mappings {
            let task_node = state
                .graph
                .node(task_nid)
                .unwrap_or_else(|| panic!("mapped task node {} vanished", task_nid));
            let leaf_node = state
                .graph
                .node(leaf_nid)
                .unwrap_or_else(|| panic!("mapped leaf node {} vanished", leaf_nid));
            let delta =
                Dispatcher::node_binding_to_scheduling_delta(task_node, leaf_node, &state.bindings);
            if delta.kind == DeltaKind::Noop {
                continue;
            }
            deltas.push(delta);
        }
        let scheduled = Self::apply_scheduling_deltas(state, &mut deltas);
        let leftover = deltas.iter().filter(|d| !d.actioned).count();
        if leftover > 0 {
            warn!("{} scheduling deltas were not actioned and are dropped", leftover);
        }
        Ok(scheduled)
    }

    /// Applies placement deltas: records the binding, locks the task's arcs
    /// onto the chosen leaf, and flips the job to running. Descriptors are
    /// contractually present for every placed task and resource.
    fn apply_scheduling_deltas(state: &mut SchedulerState, deltas: &mut [SchedulingDelta]) -> u64 {
        debug!("applying {} scheduling deltas", deltas.len());
        let mut scheduled = 0;
        for delta in deltas.iter_mut() {
            if delta.kind != DeltaKind::Place {
                continue;
            }
            let td = state
                .tasks
                .get_mut(&delta.task_id)
                .unwrap_or_else(|| panic!("no descriptor for placed task {}", delta.task_id));
            td.state = TaskState::Running;
            let td = td.clone();
            let job_id = td.job_id;
            let rd = state
                .resources
                .get_mut(&delta.resource_id)
                .unwrap_or_else(|| panic!("no descriptor for resource {}", delta.resource_id));
            rd.state = ResourceState::Busy;

            info!("placing task {} on resource {}", delta.task_id, delta.resource_id);
            state.bindings.insert(delta.task_id, delta.resource_id);
            state.graph.update_arcs_for_bound_task(delta.task_id, delta.resource_id, &td);
            if let Some(job) = state.jobs.get_mut(&job_id) {
                if job.state != JobState::Running {
                    job.state = JobState::Running;
                }
            }
            delta.actioned = true;
            scheduled += 1;
        }
        scheduled
    }

    /// Removes a finished task from the graph and frees its resource.
    pub fn handle_task_completion(&self, task_id: TaskId) {
        let mut guard = self.lock();
        let state = &mut *guard;
        info!("task {} completed", task_id);
        state.graph.delete_task_node(task_id);
        if let Some(td) = state.tasks.get_mut(&task_id) {
            td.state = TaskState::Completed;
        }
        if let Some(resource_id) = state.bindings.remove(&task_id) {
            if let Some(rd) = state.resources.get_mut(&resource_id) {
                rd.state = ResourceState::Idle;
            }
        }
    }

    /// Removes a finished job: all of its task nodes and its aggregator.
    pub fn handle_job_completion(&self, job_id: JobId) {
        let mut guard = self.lock();
        let state = &mut *guard;
        info!("job {} completed", job_id);
        state.graph.delete_nodes_for_job(job_id);
        if let Some(job) = state.jobs.get_mut(&job_id) {
            job.state = JobState::Completed;
        }
        let task_ids: Vec<TaskId> = state
            .tasks
            .values()
            .filter(|td| td.job_id == job_id)
            .map(|td| td.uid)
            .collect();
        for task_id in task_ids {
            if let Some(td) = state.tasks.get_mut(&task_id) {
                td.state = TaskState::Completed;
            }
            if let Some(resource_id) = state.bindings.remove(&task_id) {
                if let Some(rd) = state.resources.get_mut(&resource_id) {
                    rd.state = ResourceState::Idle;
                }
            }
        }
    }

    // ---- introspection ---------------------------------------------------

    pub fn task_binding(&self, task_id: TaskId) -> Option<ResourceId> {
        self.lock().bindings.get(&task_id).copied()
    }

    pub fn task_state(&self, task_id: TaskId) -> Option<TaskState> {
        self.lock().tasks.get(&task_id).map(|td| td.state)
    }

    pub fn job_state(&self, job_id: JobId) -> Option<JobState> {
        self.lock().jobs.get(&job_id).map(|jd| jd.state)
    }

    /// Runs a read-only closure over the graph under the scheduling lock.
    pub fn with_graph<R>(&self, f: impl FnOnce(&FlowGraphManager) -> R) -> R {
        f(&self.lock().graph)
    }
}
