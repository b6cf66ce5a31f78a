//! Plan execution
//!
//! [`ActionExecutor`] applies resolved operations in order through their
//! managers. When an operation fails, the operations completed so far are
//! undone in reverse order and the original error is returned.

use std::fmt;
use std::sync::Arc;

use crate::error::ExecuteError;
use crate::logging::{Logger, MessageLevel, NullLogger};
use crate::operation::{ExecutionTarget, Operation, PackageAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorOptions {
    /// Log and skip failed project operations instead of aborting the batch.
    /// Packages-folder failures always abort.
    pub catch_project_errors: bool,
    /// Regenerate binding redirects after project installs.
    pub binding_redirects: bool,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            catch_project_errors: false,
            binding_redirects: true,
        }
    }
}

/// Lifecycle of one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchState {
    #[default]
    NotStarted,
    Executing,
    Completed,
    RollingBack,
    Failed,
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchState::NotStarted => write!(f, "not started"),
            BatchState::Executing => write!(f, "executing"),
            BatchState::Completed => write!(f, "completed"),
            BatchState::RollingBack => write!(f, "rolling back"),
            BatchState::Failed => write!(f, "failed"),
        }
    }
}

/// Receives progress of a batch.
#[cfg_attr(test, mockall::automock)]
pub trait ExecutionObserver: Send + Sync {
    fn on_state_changed(&self, _state: BatchState) {}

    fn on_operation_completed(&self, _operation: &Operation) {}

    /// A project operation failed and was skipped.
    fn on_project_error(&self, _operation: &Operation, _error: &anyhow::Error) {}
}

/// Outcome of a batch that did not abort.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionSummary {
    /// Operations applied successfully.
    pub completed: usize,
    /// Project operations that failed and were skipped, as `operation: error`.
    pub skipped: Vec<String>,
}

pub struct ActionExecutor {
    options: ExecutorOptions,
    logger: Arc<dyn Logger>,
    observer: Option<Arc<dyn ExecutionObserver>>,
    state: BatchState,
}

impl ActionExecutor {
    pub fn new(options: ExecutorOptions, logger: Arc<dyn Logger>) -> Self {
        Self {
            options,
            logger,
            observer: None,
            state: BatchState::NotStarted,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// State of the last batch.
    pub fn state(&self) -> BatchState {
        self.state
    }

    /// Apply `operations` in order.
    ///
    /// On failure every completed operation is inverted in reverse order with
    /// logging suppressed, and the failure is returned. Rollback errors are
    /// not reported beyond the debug log.
    #[tracing::instrument(skip_all, fields(count = operations.len()))]
    pub fn execute(&mut self, operations: &[Operation]) -> Result<ExecutionSummary, ExecuteError> {
        self.set_state(BatchState::Executing);
        let mut completed: Vec<&Operation> = Vec::with_capacity(operations.len());
        let mut summary = ExecutionSummary::default();

        for operation in operations {
            match apply(operation, self.logger.as_ref()) {
                Ok(()) => {
                    completed.push(operation);
                    if let Some(observer) = &self.observer {
                        observer.on_operation_completed(operation);
                    }
                    self.update_binding_redirects(operation);
                }
                Err(e) if self.options.catch_project_errors && !operation.is_packages_folder() => {
                    log::debug!("Skipping failed {}: {:#}", operation, e);
                    self.logger.log(MessageLevel::Error, &format!("{}", e));
                    if let Some(observer) = &self.observer {
                        observer.on_project_error(operation, &e);
                    }
                    summary.skipped.push(format!("{}: {}", operation, e));
                }
                Err(e) => {
                    self.logger.log(MessageLevel::Error, &format!("{}", e));
                    self.set_state(BatchState::RollingBack);
                    let rolled_back = rollback(&completed);
                    self.set_state(BatchState::Failed);
                    return Err(ExecuteError::OperationFailed {
                        operation: operation.to_string(),
                        rolled_back,
                        source: e,
                    });
                }
            }
        }

        summary.completed = completed.len();
        self.set_state(BatchState::Completed);
        Ok(summary)
    }

    fn update_binding_redirects(&self, operation: &Operation) {
        if !self.options.binding_redirects || operation.action() != PackageAction::Install {
            return;
        }
        if let ExecutionTarget::Project(project) = &operation.target {
            if project.supports_binding_redirects() {
                if let Err(e) = project.add_binding_redirects(self.logger.as_ref()) {
                    self.logger.log(
                        MessageLevel::Warning,
                        &format!("Failed to update binding redirects for {}: {}", project.name(), e),
                    );
                }
            }
        }
    }

    fn set_state(&mut self, state: BatchState) {
        log::debug!("Batch {} -> {}", self.state, state);
        self.state = state;
        if let Some(observer) = &self.observer {
            observer.on_state_changed(state);
        }
    }
}

fn apply(operation: &Operation, logger: &dyn Logger) -> anyhow::Result<()> {
    match &operation.target {
        ExecutionTarget::Project(project) => project.execute(&operation.operation, logger),
        ExecutionTarget::PackagesFolder(manager) => manager.execute(&operation.operation, logger),
    }
}

/// Undo `completed` in reverse order. Returns how many operations were undone.
fn rollback(completed: &[&Operation]) -> usize {
    let mut undone = 0;
    for operation in completed.iter().rev() {
        let inverse = operation.inverse();
        match apply(&inverse, &NullLogger) {
            Ok(()) => undone += 1,
            Err(e) => log::debug!("Rollback of {} failed: {:#}", inverse, e),
        }
    }
    undone
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::{LocalPackageManager, LocalProjectManager, MockPackageManager, MockProjectManager, ProjectManager};
    use crate::operation::{PackageOperation, PackageOperationTarget};
    use crate::package::{Package, PackageIdentity};
    use crate::repository::{InMemoryRepository, SharedPackagesFolder};
    use mockall::Sequence;
    use mockall::predicate::eq;

    fn package(id: &str) -> Arc<Package> {
        Arc::new(Package::new(id, "1.0".parse().unwrap()))
    }

    fn identity(id: &str) -> PackageIdentity {
        PackageIdentity::new(id, "1.0".parse().unwrap())
    }

    fn folder_install(manager: &Arc<LocalPackageManager>, id: &str) -> Operation {
        Operation::for_packages_folder(
            PackageOperation::install(package(id), PackageOperationTarget::PackagesFolder),
            manager.clone(),
        )
    }

    fn project_install(project: Arc<dyn ProjectManager>, id: &str) -> Operation {
        Operation::for_project(
            PackageOperation::install(package(id), PackageOperationTarget::Project),
            project,
        )
    }

    fn failing_project() -> MockProjectManager {
        let mut project = MockProjectManager::new();
        project.expect_name().returning(|| "Broken".to_string());
        project
            .expect_execute()
            .returning(|_, _| Err(anyhow::anyhow!("project file is locked")));
        project
    }

    fn local_manager() -> Arc<LocalPackageManager> {
        Arc::new(LocalPackageManager::new(
            Arc::new(SharedPackagesFolder::new()),
            Arc::new(InMemoryRepository::new()),
        ))
    }

    #[test]
    fn test_executes_in_order() {
        let manager = local_manager();
        let web = Arc::new(LocalProjectManager::new("Web", None).with_binding_redirects());
        let operations = vec![folder_install(&manager, "Foo"), project_install(web.clone(), "Foo")];

        let mut executor = ActionExecutor::new(ExecutorOptions::default(), Arc::new(NullLogger));
        let summary = executor.execute(&operations).unwrap();

        assert_eq!(summary.completed, 2);
        assert_eq!(executor.state(), BatchState::Completed);
        assert!(manager.folder().contains(&identity("Foo")));
        assert!(web.repository().contains(&identity("Foo")));
        assert_eq!(web.redirect_updates(), 1);
    }

    #[test]
    fn test_binding_redirects_disabled() {
        let web = Arc::new(LocalProjectManager::new("Web", None).with_binding_redirects());
        let options = ExecutorOptions {
            binding_redirects: false,
            ..Default::default()
        };

        let mut executor = ActionExecutor::new(options, Arc::new(NullLogger));
        executor.execute(&[project_install(web.clone(), "Foo")]).unwrap();
        assert_eq!(web.redirect_updates(), 0);
    }

    #[test_log::test]
    fn test_failure_rolls_back_in_reverse() {
        let manager = local_manager();
        let web = Arc::new(LocalProjectManager::new("Web", None));
        let operations = vec![
            folder_install(&manager, "Foo"),
            project_install(web.clone(), "Foo"),
            project_install(Arc::new(failing_project()), "Bar"),
        ];

        let mut executor = ActionExecutor::new(ExecutorOptions::default(), Arc::new(NullLogger));
        let err = executor.execute(&operations).unwrap_err();

        assert_eq!(executor.state(), BatchState::Failed);
        assert_eq!(err.cause().to_string(), "project file is locked");
        assert_eq!(
            err.to_string(),
            "Install Bar 1.0 @ Broken failed; rolled back 2 completed operation(s)"
        );
        assert!(manager.folder().packages().is_empty());
        assert!(web.repository().is_empty());
    }

    #[test]
    fn test_rollback_uses_inverse_actions() {
        let mut seq = Sequence::new();
        let mut folder = MockPackageManager::new();
        folder
            .expect_execute()
            .withf(|op, _| op.action == PackageAction::Install && op.package.id == "A")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        folder
            .expect_execute()
            .withf(|op, _| op.action == PackageAction::Install && op.package.id == "B")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(anyhow::anyhow!("disk full")));
        folder
            .expect_execute()
            .withf(|op, _| op.action == PackageAction::Uninstall && op.package.id == "A")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(anyhow::anyhow!("rollback also failed")));
        let folder: Arc<dyn crate::manager::PackageManager> = Arc::new(folder);

        let operations = vec![
            Operation::for_packages_folder(
                PackageOperation::install(package("A"), PackageOperationTarget::PackagesFolder),
                folder.clone(),
            ),
            Operation::for_packages_folder(
                PackageOperation::install(package("B"), PackageOperationTarget::PackagesFolder),
                folder,
            ),
        ];

        let mut executor = ActionExecutor::new(ExecutorOptions::default(), Arc::new(NullLogger));
        let err = executor.execute(&operations).unwrap_err();
        assert_eq!(err.cause().to_string(), "disk full");
        assert!(matches!(err, ExecuteError::OperationFailed { rolled_back: 0, .. }));
    }

    #[test]
    fn test_project_errors_can_be_caught() {
        let web = Arc::new(LocalProjectManager::new("Web", None));
        let mut observer = MockExecutionObserver::new();
        observer.expect_on_state_changed().return_const(());
        observer.expect_on_operation_completed().times(1).return_const(());
        observer
            .expect_on_project_error()
            .withf(|op, e| op.operation.package.id == "Bar" && e.to_string() == "project file is locked")
            .times(1)
            .return_const(());

        let options = ExecutorOptions {
            catch_project_errors: true,
            ..Default::default()
        };
        let mut executor = ActionExecutor::new(options, Arc::new(NullLogger)).with_observer(Arc::new(observer));
        let summary = executor
            .execute(&[
                project_install(Arc::new(failing_project()), "Bar"),
                project_install(web.clone(), "Foo"),
            ])
            .unwrap();

        assert_eq!(summary.completed, 1);
        assert_eq!(summary.skipped, vec!["Install Bar 1.0 @ Broken: project file is locked".to_string()]);
        assert!(web.repository().contains(&identity("Foo")));
    }

    #[test]
    fn test_folder_errors_are_never_caught() {
        let mut folder = MockPackageManager::new();
        folder
            .expect_execute()
            .returning(|_, _| Err(anyhow::anyhow!("network down")));
        let options = ExecutorOptions {
            catch_project_errors: true,
            ..Default::default()
        };

        let operation = Operation::for_packages_folder(
            PackageOperation::install(package("Foo"), PackageOperationTarget::PackagesFolder),
            Arc::new(folder),
        );
        let mut executor = ActionExecutor::new(options, Arc::new(NullLogger));
        assert!(executor.execute(&[operation]).is_err());
    }

    #[test]
    fn test_state_transitions_reported() {
        let mut seq = Sequence::new();
        let mut observer = MockExecutionObserver::new();
        for state in [BatchState::Executing, BatchState::RollingBack, BatchState::Failed] {
            observer
                .expect_on_state_changed()
                .with(eq(state))
                .times(1)
                .in_sequence(&mut seq)
                .return_const(());
        }

        let mut executor =
            ActionExecutor::new(ExecutorOptions::default(), Arc::new(NullLogger)).with_observer(Arc::new(observer));
        let result = executor.execute(&[project_install(Arc::new(failing_project()), "Bar")]);
        assert!(result.is_err());
    }
}
