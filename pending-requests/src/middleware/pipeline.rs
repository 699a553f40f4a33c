//! Pipeline - Manages stage registration, configuration, and execution
//!
//! The Pipeline is responsible for:
//! - Registering and unregistering stages
//! - Running stages in priority order, each wrapping the rest of the chain
//! - Tracking stage statistics
//! - Applying stage configuration overrides

use super::types::{BoxedStage, DispatchResult, Stage, StageConfig, StagePriority, StageStats};
use crate::store::StoreView;
use dashmap::DashMap;
use parking_lot::RwLock;
use pending_requests_types::Action;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Ordered stage chain between `dispatch` and the reducer
pub struct Pipeline<S> {
    /// Registered stages by ID
    stages: DashMap<String, BoxedStage<S>>,
    /// Stage IDs sorted by priority, ties in registration order
    order: RwLock<Vec<String>>,
    /// Stage configuration overrides
    configs: DashMap<String, StageConfig>,
    /// Stage statistics
    stats: DashMap<String, StageStats>,
}

impl<S> Pipeline<S> {
    /// Create an empty Pipeline
    pub fn new() -> Self {
        Self {
            stages: DashMap::new(),
            order: RwLock::new(Vec::new()),
            configs: DashMap::new(),
            stats: DashMap::new(),
        }
    }

    /// Register a stage, replacing any stage with the same ID
    pub fn register(&self, stage: BoxedStage<S>) {
        let id = stage.id().to_string();
        let name = stage.name().to_string();

        if self.stages.insert(id.clone(), stage).is_none() {
            self.order.write().push(id.clone());
        }
        self.sort_stages_by_priority();
        self.stats.insert(id, StageStats::default());

        log::debug!("[PIPELINE] Registered stage: {}", name);
    }

    /// Unregister a stage and drop its stats
    pub fn unregister(&self, id: &str) {
        if self.stages.remove(id).is_some() {
            self.order.write().retain(|stage_id| stage_id != id);
            self.stats.remove(id);
            log::debug!("[PIPELINE] Unregistered stage: {}", id);
        }
    }

    fn sort_stages_by_priority(&self) {
        let mut order = self.order.write();
        order.sort_by_key(|id| self.effective_priority(id) as i32);
    }

    fn effective_priority(&self, id: &str) -> StagePriority {
        if let Some(config) = self.configs.get(id) {
            if let Some(priority) = config.priority {
                return priority;
            }
        }
        self.stages
            .get(id)
            .map(|s| s.priority())
            .unwrap_or(StagePriority::Normal)
    }

    /// Set stage configuration
    pub fn configure(&self, config: StageConfig) {
        log::debug!(
            "[PIPELINE] Configured stage {} (enabled={}, priority={:?})",
            config.id,
            config.enabled,
            config.priority
        );
        self.configs.insert(config.id.clone(), config);
        self.sort_stages_by_priority();
    }

    fn is_enabled(&self, stage: &dyn Stage<S>) -> bool {
        if let Some(config) = self.configs.get(stage.id()) {
            return config.enabled;
        }
        stage.enabled()
    }

    /// Enabled stages in execution order
    pub fn active_stages(&self) -> Vec<BoxedStage<S>> {
        self.order
            .read()
            .iter()
            .filter_map(|id| self.stages.get(id).map(|s| s.clone()))
            .filter(|stage| self.is_enabled(stage.as_ref()))
            .collect()
    }

    /// Run `action` through every active stage, then hand it to `commit`
    ///
    /// `commit` only sees actions that every stage forwarded.
    pub fn run(
        &self,
        action: Action,
        store: StoreView<'_, S>,
        commit: &dyn Fn(Action) -> Action,
    ) -> DispatchResult {
        let stages = self.active_stages();
        let next = Next {
            pipeline: self,
            remaining: &stages,
            store,
            commit,
        };
        next.run(action)
    }

    fn record(&self, stage_id: &str, elapsed: Duration, result: &DispatchResult) {
        if let Some(mut stats) = self.stats.get_mut(stage_id) {
            stats.record_execution(elapsed, result);
        }

        log::trace!(
            "[PIPELINE] Stage {} completed in {}us with result: {}",
            stage_id,
            elapsed.as_micros(),
            if result.is_forwarded() { "forwarded" } else { "suppressed" }
        );
    }

    /// Get all registered stages in execution order, disabled ones included
    pub fn get_stages(&self) -> Vec<BoxedStage<S>> {
        self.order
            .read()
            .iter()
            .filter_map(|id| self.stages.get(id).map(|s| s.clone()))
            .collect()
    }

    /// Get statistics for a stage
    pub fn get_stats(&self, id: &str) -> Option<StageStats> {
        self.stats.get(id).map(|s| s.clone())
    }

    /// Get all statistics
    pub fn get_all_stats(&self) -> HashMap<String, StageStats> {
        self.stats
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Get stage count
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

impl<S> Default for Pipeline<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// The remainder of the pipeline after the current stage
pub struct Next<'a, S> {
    pipeline: &'a Pipeline<S>,
    remaining: &'a [BoxedStage<S>],
    store: StoreView<'a, S>,
    commit: &'a dyn Fn(Action) -> Action,
}

impl<'a, S> Next<'a, S> {
    /// Forward `action` to the next stage, or to the reducer after the last one
    pub fn run(self, action: Action) -> DispatchResult {
        let Some((stage, rest)) = self.remaining.split_first() else {
            return DispatchResult::Forwarded((self.commit)(action));
        };

        let next = Next {
            pipeline: self.pipeline,
            remaining: rest,
            store: self.store,
            commit: self.commit,
        };

        let start = Instant::now();
        let result = stage.handle(action, self.store, next);
        self.pipeline.record(stage.id(), start.elapsed(), &result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct TestStage {
        id: String,
        priority: StagePriority,
        suppress: bool,
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl TestStage {
        fn new(id: &str, priority: StagePriority, seen: &Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                id: id.to_string(),
                priority,
                suppress: false,
                seen: seen.clone(),
            }
        }

        fn suppressing(mut self) -> Self {
            self.suppress = true;
            self
        }
    }

    impl Stage<()> for TestStage {
        fn id(&self) -> &str {
            &self.id
        }

        fn name(&self) -> &str {
            &self.id
        }

        fn priority(&self) -> StagePriority {
            self.priority
        }

        fn handle(&self, action: Action, _store: StoreView<'_, ()>, next: Next<'_, ()>) -> DispatchResult {
            self.seen.lock().push(self.id.clone());
            if self.suppress {
                return DispatchResult::Suppressed;
            }
            next.run(action)
        }
    }

    fn run_once(pipeline: &Pipeline<()>, committed: &Mutex<Vec<String>>) -> DispatchResult {
        let state = RwLock::new(());
        pipeline.run(Action::new("TEST_ACTION"), StoreView::new(&state), &|action: Action| {
            committed.lock().push(action.kind.clone());
            action
        })
    }

    #[test]
    fn test_stage_registration() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let pipeline: Pipeline<()> = Pipeline::new();

        pipeline.register(Arc::new(TestStage::new("test_stage", StagePriority::Normal, &seen)));
        assert_eq!(pipeline.stage_count(), 1);

        pipeline.register(Arc::new(TestStage::new("test_stage", StagePriority::Normal, &seen)));
        assert_eq!(pipeline.stage_count(), 1);
        assert_eq!(pipeline.get_stages().len(), 1);

        pipeline.unregister("test_stage");
        assert_eq!(pipeline.stage_count(), 0);
        assert!(pipeline.active_stages().is_empty());
    }

    #[test]
    fn test_unregister_drops_stats() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let committed = Mutex::new(Vec::new());
        let pipeline: Pipeline<()> = Pipeline::new();

        pipeline.register(Arc::new(TestStage::new("kept", StagePriority::Normal, &seen)));
        pipeline.register(Arc::new(TestStage::new("removed", StagePriority::Normal, &seen)));
        let _ = run_once(&pipeline, &committed);
        assert_eq!(pipeline.get_all_stats().len(), 2);

        pipeline.unregister("removed");

        assert!(pipeline.get_stats("removed").is_none());
        let all = pipeline.get_all_stats();
        assert_eq!(all.len(), 1);
        assert_eq!(all["kept"].executions, 1);
    }

    #[test]
    fn test_stages_run_in_priority_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let committed = Mutex::new(Vec::new());
        let pipeline: Pipeline<()> = Pipeline::new();

        pipeline.register(Arc::new(TestStage::new("last", StagePriority::Lowest, &seen)));
        pipeline.register(Arc::new(TestStage::new("normal_a", StagePriority::Normal, &seen)));
        pipeline.register(Arc::new(TestStage::new("first", StagePriority::Critical, &seen)));
        pipeline.register(Arc::new(TestStage::new("normal_b", StagePriority::Normal, &seen)));

        let result = run_once(&pipeline, &committed);

        assert!(result.is_forwarded());
        assert_eq!(*seen.lock(), vec!["first", "normal_a", "normal_b", "last"]);
        assert_eq!(*committed.lock(), vec!["TEST_ACTION"]);
    }

    #[test]
    fn test_suppression_stops_the_chain() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let committed = Mutex::new(Vec::new());
        let pipeline: Pipeline<()> = Pipeline::new();

        pipeline.register(Arc::new(
            TestStage::new("gate", StagePriority::High, &seen).suppressing(),
        ));
        pipeline.register(Arc::new(TestStage::new("after", StagePriority::Low, &seen)));

        let result = run_once(&pipeline, &committed);

        assert!(result.is_suppressed());
        assert_eq!(*seen.lock(), vec!["gate"]);
        assert!(committed.lock().is_empty());

        let stats = pipeline.get_stats("gate").unwrap();
        assert_eq!(stats.executions, 1);
        assert_eq!(stats.suppressed, 1);
        assert_eq!(pipeline.get_stats("after").unwrap().executions, 0);
    }

    #[test]
    fn test_configure_disables_stage() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let committed = Mutex::new(Vec::new());
        let pipeline: Pipeline<()> = Pipeline::new();

        pipeline.register(Arc::new(
            TestStage::new("gate", StagePriority::High, &seen).suppressing(),
        ));
        pipeline.configure(StageConfig {
            id: "gate".to_string(),
            enabled: false,
            priority: None,
        });

        let result = run_once(&pipeline, &committed);

        assert!(result.is_forwarded());
        assert!(seen.lock().is_empty());
        assert_eq!(pipeline.get_stages().len(), 1);
    }

    #[test]
    fn test_configure_overrides_priority() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let committed = Mutex::new(Vec::new());
        let pipeline: Pipeline<()> = Pipeline::new();

        pipeline.register(Arc::new(TestStage::new("a", StagePriority::High, &seen)));
        pipeline.register(Arc::new(TestStage::new("b", StagePriority::Low, &seen)));
        pipeline.configure(StageConfig {
            id: "b".to_string(),
            enabled: true,
            priority: Some(StagePriority::Critical),
        });

        let _ = run_once(&pipeline, &committed);
        assert_eq!(*seen.lock(), vec!["b", "a"]);
    }

    #[test]
    fn test_empty_pipeline_commits() {
        let committed = Mutex::new(Vec::new());
        let pipeline: Pipeline<()> = Pipeline::new();

        let result = run_once(&pipeline, &committed);
        assert_eq!(result, DispatchResult::Forwarded(Action::new("TEST_ACTION")));
        assert_eq!(committed.lock().len(), 1);
    }
}
