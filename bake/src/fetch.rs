use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
};

use bake_graph::{Action, Invocation, Key, Rule, RuleSet};

/// How to materialize remote packages. The default is the Go toolchain's
/// `go get`.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    fetcher: OsString,
}

impl Default for FetchConfig {
    fn default() -> FetchConfig {
        FetchConfig {
            fetcher: "go".into(),
        }
    }
}

impl FetchConfig {
    pub fn new() -> FetchConfig {
        FetchConfig::default()
    }

    pub fn fetcher<S: AsRef<OsStr>>(mut self, fetcher: S) -> FetchConfig {
        self.fetcher = fetcher.as_ref().to_owned();
        self
    }
}

/// A `pkg/...` identifier fetches recursively but lands at `pkg` on disk.
const RECURSIVE_SUFFIX: &str = "/...";

pub(crate) fn fetch_dependencies<S: AsRef<str>>(
    rules: &mut RuleSet,
    config: &FetchConfig,
    dest_root: &Path,
    packages: &[S],
) -> Vec<PathBuf> {
    let mut declared = Vec::with_capacity(packages.len());
    for package in packages {
        let package = package.as_ref();
        let on_disk = package.strip_suffix(RECURSIVE_SUFFIX).unwrap_or(package);
        let local = dest_root.join(on_disk);
        rules.declare(
            Key::path(&local),
            Rule::new(
                vec![],
                Action::Invoke(Invocation::new(&config.fetcher).arg("get").arg(package)),
            ),
        );
        declared.push(local);
    }
    declared
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_wildcard_suffix_is_stripped_on_disk_only() {
        let mut rules = RuleSet::new();
        let declared = fetch_dependencies(
            &mut rules,
            &FetchConfig::default(),
            Path::new("vendor"),
            &["github.com/x/y", "github.com/x/z/..."],
        );
        assert_eq!(
            declared,
            vec![
                PathBuf::from("vendor/github.com/x/y"),
                PathBuf::from("vendor/github.com/x/z"),
            ]
        );
        let rule = rules
            .rule(&Key::path("vendor/github.com/x/z"))
            .expect("declared rule");
        let invocation = rule.action().invocation().expect("a fetch invocation");
        // The wildcard survives in the fetched identifier.
        assert_eq!(
            invocation.argv(),
            &[OsString::from("get"), OsString::from("github.com/x/z/...")]
        );
    }

    #[test]
    fn test_overlapping_packages_redeclare_without_error() {
        let mut rules = RuleSet::new();
        let first = fetch_dependencies(
            &mut rules,
            &FetchConfig::default(),
            Path::new("vendor"),
            &["github.com/x/y"],
        );
        let second = fetch_dependencies(
            &mut rules,
            &FetchConfig::default(),
            Path::new("vendor"),
            &["github.com/x/y/..."],
        );
        assert_eq!(first, second);
        assert_eq!(rules.len(), 1);
        // Last declaration wins.
        let rule = rules
            .rule(&Key::path("vendor/github.com/x/y"))
            .expect("declared rule");
        assert_eq!(
            rule.action().invocation().expect("a fetch invocation").argv()[1],
            OsString::from("github.com/x/y/...")
        );
    }
}
