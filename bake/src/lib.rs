/*
 * Copyright 2020 Nikhil Marathe <nsm.nikhil@gmail.com>
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! Build-automation helpers layered on a small rule graph.
//!
//! A [`Session`] collects rule declarations (protobuf code generation,
//! dependency fetching, anything declared by hand) together with the
//! cleanup registry those declarations report into. Sealing the session
//! adds the `clean` task and hands the finished graph to the engine in
//! `bake-builder` for mtime based evaluation.

use std::path::{Path, PathBuf};

use bake_builder::{mtime_rebuilder, TopoScheduler};

mod fetch;
mod protoc;

pub use bake_builder::{run_and_check, BuildError, RebuildError, TaskError, TaskResult};
pub use bake_graph::{Action, CleanupRegistry, Invocation, Key, Rule, RuleSet};
pub use fetch::FetchConfig;
pub use protoc::{GenerateError, ProtocConfig};

/// Name of the one task the helper always declares.
pub const CLEAN_TASK: &str = "clean";

/// One build configuration session: the rule set under construction and
/// the cleanup registry every generator reports into. Construct one per
/// configuration run; nothing here is global.
#[derive(Debug, Default)]
pub struct Session {
    rules: RuleSet,
    cleanup: CleanupRegistry,
}

impl Session {
    pub fn new() -> Session {
        Session::default()
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn cleanup(&self) -> &CleanupRegistry {
        &self.cleanup
    }

    /// Declare a rule directly. Generated file targets should go through
    /// the generators below so they participate in clean.
    pub fn declare(&mut self, target: Key, rule: Rule) {
        self.rules.declare(target, rule);
    }

    /// Mark a path for removal when the clean task runs.
    pub fn register_cleanup_target<P: Into<PathBuf>>(&mut self, path: P) {
        self.cleanup.register(path);
    }

    /// Remove everything registered for cleanup. Best-effort, never fails.
    pub fn clean_all(&self) {
        self.cleanup.clean_all();
    }

    /// Declare one code generation rule per schema file directly inside
    /// `source_dir`, producing into `dest_dir`. The destination directory
    /// becomes a target of its own and every output is registered for
    /// cleanup. Returns the declared output paths.
    pub fn protoc_fanout(
        &mut self,
        config: &ProtocConfig,
        source_dir: &Path,
        dest_dir: &Path,
    ) -> Result<Vec<PathBuf>, GenerateError> {
        protoc::fanout(&mut self.rules, &mut self.cleanup, config, source_dir, dest_dir)
    }

    /// Declare one code generation rule per schema file anywhere under
    /// `source_dir`, each output sitting next to its schema. Include and
    /// output path are both `source_dir` as given. Every output is
    /// registered for cleanup. Returns the declared output paths.
    pub fn protoc_in_place(
        &mut self,
        config: &ProtocConfig,
        source_dir: &Path,
    ) -> Result<Vec<PathBuf>, GenerateError> {
        protoc::in_place(&mut self.rules, &mut self.cleanup, config, source_dir)
    }

    /// Declare one fetch rule per package under `dest_root`, stripping a
    /// trailing `/...` wildcard from the on-disk path while fetching the
    /// identifier as given. Returns the declared local paths.
    pub fn fetch_dependencies<S: AsRef<str>>(
        &mut self,
        config: &FetchConfig,
        dest_root: &Path,
        packages: &[S],
    ) -> Vec<PathBuf> {
        fetch::fetch_dependencies(&mut self.rules, config, dest_root, packages)
    }

    /// Finish configuration: snapshot the registry into the `clean` task
    /// and hand the graph over for evaluation.
    pub fn into_rules(mut self) -> RuleSet {
        self.rules.declare(
            Key::task(CLEAN_TASK),
            Rule::new(vec![], Action::RemovePaths(self.cleanup.paths().to_vec())),
        );
        self.rules
    }
}

/// Bring the requested targets up to date.
pub fn build(rules: &RuleSet, targets: Vec<Key>) -> anyhow::Result<()> {
    let rebuilder = mtime_rebuilder();
    bake_builder::build(TopoScheduler::new(), &rebuilder, rules, targets)?;
    Ok(())
}

/// Bring every root file target up to date. Named tasks such as `clean`
/// only run when requested through [`build`].
pub fn build_all(rules: &RuleSet) -> anyhow::Result<()> {
    let rebuilder = mtime_rebuilder();
    bake_builder::build_externals(TopoScheduler::new(), &rebuilder, rules)?;
    Ok(())
}
