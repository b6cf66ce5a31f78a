//! Planner configuration
//!
//! A [`PlannerConfig`] is read from a camelCase JSON file, optionally
//! overridden from `PKGPLAN_*` environment variables, then projected onto the
//! option structs each component takes.

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::executor::ExecutorOptions;
use crate::resolver::{ResolverOptions, UninstallOptions, UpdateOptions};
use crate::version::DependencyVersion;

const ENV_PREFIX: &str = "PKGPLAN_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlannerConfig {
    pub dependency_version: DependencyVersion,
    pub allow_prerelease: bool,
    pub ignore_dependencies: bool,
    pub force_remove: bool,
    pub remove_dependencies: bool,
    pub safe_updates: bool,
    pub catch_project_errors: bool,
    pub binding_redirects: bool,
    pub update_dependencies: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            dependency_version: DependencyVersion::Lowest,
            allow_prerelease: false,
            ignore_dependencies: false,
            force_remove: false,
            remove_dependencies: false,
            safe_updates: false,
            catch_project_errors: false,
            binding_redirects: true,
            update_dependencies: true,
        }
    }
}

impl PlannerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let config = Self::from_json(&content).with_context(|| format!("Failed to parse config {:?}", path))?;
        debug!("Loaded config from {:?}: {:?}", path, config);
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Override fields from `PKGPLAN_*` variables returned by `lookup`.
    ///
    /// Booleans accept `true/false/1/0/yes/no`. Unparsable values are errors.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(value) = var("DEPENDENCY_VERSION") {
            self.dependency_version = value
                .parse()
                .with_context(|| format!("Invalid {}DEPENDENCY_VERSION", ENV_PREFIX))?;
        }

        let flags: [(&str, &mut bool); 8] = [
            ("ALLOW_PRERELEASE", &mut self.allow_prerelease),
            ("IGNORE_DEPENDENCIES", &mut self.ignore_dependencies),
            ("FORCE_REMOVE", &mut self.force_remove),
            ("REMOVE_DEPENDENCIES", &mut self.remove_dependencies),
            ("SAFE_UPDATES", &mut self.safe_updates),
            ("CATCH_PROJECT_ERRORS", &mut self.catch_project_errors),
            ("BINDING_REDIRECTS", &mut self.binding_redirects),
            ("UPDATE_DEPENDENCIES", &mut self.update_dependencies),
        ];
        for (name, field) in flags {
            if let Some(value) = var(name) {
                *field = parse_flag(&value).with_context(|| format!("Invalid {}{}", ENV_PREFIX, name))?;
                debug!("{}{} overrides config: {}", ENV_PREFIX, name, field);
            }
        }
        Ok(())
    }

    /// Install and uninstall options. Installs keep satisfied dependencies.
    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            allow_prerelease: self.allow_prerelease,
            dependency_version: self.dependency_version,
            ignore_dependencies: self.ignore_dependencies,
            update_dependencies: false,
            uninstall: self.uninstall_options(),
        }
    }

    pub fn uninstall_options(&self) -> UninstallOptions {
        UninstallOptions {
            force: self.force_remove,
            remove_dependencies: self.remove_dependencies,
        }
    }

    pub fn update_options(&self) -> UpdateOptions {
        UpdateOptions {
            safe: self.safe_updates,
            update_dependencies: self.update_dependencies,
        }
    }

    pub fn executor_options(&self) -> ExecutorOptions {
        ExecutorOptions {
            catch_project_errors: self.catch_project_errors,
            binding_redirects: self.binding_redirects,
        }
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("expected a boolean, got '{}'", other),
    }
}
