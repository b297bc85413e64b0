//! End-to-end invocation scenarios against in-memory tools.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use ecrwatch_core::{marker, CommitId, Config, ImageTag, RemoteUrl};
use ecrwatch_pipeline::{
    build, pipeline, BuildError, Clock, CommandError, Decision, ImageBuilder, Mode, Outcome,
    PipelineError, PublishError, RegistryClient, Stage, SyncError, Tools, VcsError, VcsOp,
    VersionControl,
};
use rstest::rstest;
use secrecy::{ExposeSecret, SecretString};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

fn exit(command: &str) -> CommandError {
    CommandError::Exit {
        command: command.to_string(),
        code: Some(1),
        detail: "fatal: simulated failure".to_string(),
    }
}

struct FakeVcs {
    remote: Option<String>,
    head: RefCell<String>,
    after_pull: Option<String>,
    fail: Option<VcsOp>,
    calls: RefCell<Vec<&'static str>>,
}

impl FakeVcs {
    fn new(remote: &str) -> Self {
        Self {
            remote: Some(remote.to_string()),
            head: RefCell::new(String::new()),
            after_pull: Some(remote.to_string()),
            fail: None,
            calls: RefCell::new(Vec::new()),
        }
    }

    fn failing(mut self, op: VcsOp) -> Self {
        self.fail = Some(op);
        self
    }

    fn step(&self, name: &'static str, op: VcsOp) -> Result<(), VcsError> {
        self.calls.borrow_mut().push(name);
        if self.fail == Some(op) {
            return Err(VcsError::Command {
                op,
                source: exit(&format!("git {op}")),
            });
        }
        Ok(())
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }
}

impl VersionControl for FakeVcs {
    fn clone_branch(&self, _remote: &RemoteUrl, _branch: &str, dest: &Path) -> Result<(), VcsError> {
        self.step("clone", VcsOp::Clone)?;
        std::fs::create_dir_all(dest).expect("create fake clone");
        *self.head.borrow_mut() = self.remote.clone().unwrap_or_default();
        Ok(())
    }

    fn fetch(&self, _working_copy: &Path, _branch: &str) -> Result<(), VcsError> {
        self.step("fetch", VcsOp::Fetch)
    }

    fn pull(&self, _working_copy: &Path) -> Result<(), VcsError> {
        self.step("pull", VcsOp::Pull)?;
        if let Some(next) = &self.after_pull {
            *self.head.borrow_mut() = next.clone();
        }
        Ok(())
    }

    fn local_head(&self, _working_copy: &Path) -> Result<CommitId, VcsError> {
        self.step("rev-parse", VcsOp::RevParse)?;
        Ok(CommitId::from(self.head.borrow().as_str()))
    }

    fn remote_head(&self, _remote: &RemoteUrl, branch: &str) -> Result<CommitId, VcsError> {
        self.step("ls-remote", VcsOp::LsRemote)?;
        self.remote
            .as_deref()
            .map(CommitId::from)
            .ok_or_else(|| VcsError::RefNotFound {
                branch: branch.to_string(),
            })
    }
}

#[derive(Default)]
struct FakeBuilder {
    fail: bool,
    builds: RefCell<Vec<Vec<ImageTag>>>,
}

impl ImageBuilder for FakeBuilder {
    fn build(&self, _context: &Path, tags: &[ImageTag]) -> Result<(), CommandError> {
        self.builds.borrow_mut().push(tags.to_vec());
        if self.fail {
            return Err(exit("docker build"));
        }
        Ok(())
    }
}

#[derive(Default)]
struct FakeRegistry {
    fail_at: Option<&'static str>,
    logins: RefCell<Vec<(String, String)>>,
    pushes: RefCell<Vec<ImageTag>>,
}

impl RegistryClient for FakeRegistry {
    fn login_password(&self, region: &str) -> Result<SecretString, CommandError> {
        if self.fail_at == Some("credential") {
            return Err(exit("aws ecr get-login-password"));
        }
        Ok(SecretString::from(format!("pw-{region}")))
    }

    fn login(&self, host: &str, password: &SecretString) -> Result<(), CommandError> {
        if self.fail_at == Some("login") {
            return Err(exit("docker login"));
        }
        self.logins
            .borrow_mut()
            .push((host.to_string(), password.expose_secret().to_string()));
        Ok(())
    }

    fn push(&self, tag: &ImageTag) -> Result<(), CommandError> {
        if self.fail_at == Some("push") {
            return Err(exit("docker push"));
        }
        self.pushes.borrow_mut().push(tag.clone());
        Ok(())
    }
}

struct FixedClock(NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

fn at(h: u32, m: u32, s: u32) -> FixedClock {
    FixedClock(
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(h, m, s))
            .expect("valid time"),
    )
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn config(root: &Path, extra: &[(&'static str, &str)]) -> Config {
    let mut env: HashMap<&'static str, String> = HashMap::from([
        ("PROJECT", "acme/repo".to_string()),
        ("PAT_TOKEN", "ghp_token".to_string()),
        ("ECR", "myregistry/repo".to_string()),
        ("AWS_DEFAULT_REGION", "eu-west-1".to_string()),
    ]);
    for (k, v) in extra {
        env.insert(*k, v.to_string());
    }
    Config::from_lookup(|name: &str| env.get(name).cloned(), &root.join("repos")).expect("config")
}

fn seed_working_copy(config: &Config, stored: &str) {
    std::fs::create_dir_all(&config.repository.working_copy).expect("mkdir working copy");
    marker::write_at(&config.repository.working_copy, &CommitId::from(stored)).expect("seed marker");
}

fn stored(config: &Config) -> Option<CommitId> {
    marker::read_at(&config.repository.working_copy).expect("read marker")
}

fn tools<'a>(
    vcs: &'a FakeVcs,
    builder: &'a FakeBuilder,
    registry: &'a FakeRegistry,
    clock: &'a FixedClock,
) -> Tools<'a> {
    Tools {
        vcs,
        builder,
        registry,
        clock,
    }
}

// ---------------------------------------------------------------------------
// 1. Scenarios
// ---------------------------------------------------------------------------

#[test]
fn fresh_working_copy_is_cloned_built_and_published() {
    let root = TempDir::new().expect("root");
    let config = config(root.path(), &[]);
    let vcs = FakeVcs::new("abc123");
    let (builder, registry, clock) = (FakeBuilder::default(), FakeRegistry::default(), at(0, 0, 0));

    let outcome = pipeline::run(&config, tools(&vcs, &builder, &registry, &clock), Mode::Full)
        .expect("run");

    let version = ImageTag::from("myregistry/repo:2024-01-01t000000");
    let alias = ImageTag::from("myregistry/repo:latest");
    match outcome {
        Outcome::Published { build, pushed } => {
            assert_eq!(build.version_tag, version);
            assert_eq!(build.alias_tag, alias);
            assert_eq!(build.commit, CommitId::from("abc123"));
            assert_eq!(pushed, vec![version.clone()]);
        }
        other => panic!("expected published, got {other:?}"),
    }
    assert_eq!(builder.builds.borrow().as_slice(), &[vec![version.clone(), alias]]);
    assert_eq!(registry.pushes.borrow().as_slice(), &[version]);
    assert_eq!(
        registry.logins.borrow().as_slice(),
        &[("myregistry".to_string(), "pw-eu-west-1".to_string())]
    );
    assert_eq!(stored(&config), Some(CommitId::from("abc123")));
    assert_eq!(
        vcs.calls(),
        vec!["clone", "rev-parse", "pull", "rev-parse"],
        "fresh clone must not fetch or query the remote"
    );
}

#[test]
fn unchanged_remote_needs_no_build() {
    let root = TempDir::new().expect("root");
    let config = config(root.path(), &[]);
    seed_working_copy(&config, "abc123");
    let vcs = FakeVcs::new("abc123");
    let (builder, registry, clock) = (FakeBuilder::default(), FakeRegistry::default(), at(0, 0, 0));

    let outcome = pipeline::run(&config, tools(&vcs, &builder, &registry, &clock), Mode::Full)
        .expect("run");

    assert_eq!(
        outcome,
        Outcome::NoBuild {
            commit: CommitId::from("abc123")
        }
    );
    assert_eq!(vcs.calls(), vec!["fetch", "ls-remote"]);
    assert!(builder.builds.borrow().is_empty());
    assert!(registry.pushes.borrow().is_empty());
}

#[test]
fn failed_image_build_leaves_marker_unchanged() {
    let root = TempDir::new().expect("root");
    let config = config(root.path(), &[]);
    seed_working_copy(&config, "abc123");
    let vcs = FakeVcs::new("def456");
    let builder = FakeBuilder {
        fail: true,
        ..FakeBuilder::default()
    };
    let (registry, clock) = (FakeRegistry::default(), at(0, 0, 0));

    let err = pipeline::run(&config, tools(&vcs, &builder, &registry, &clock), Mode::Full)
        .unwrap_err();

    assert_eq!(err.stage(), Stage::Build);
    assert!(matches!(err, PipelineError::Build(BuildError::Image(_))), "got: {err}");
    assert!(err.to_string().contains("docker build"), "got: {err}");
    assert_eq!(stored(&config), Some(CommitId::from("abc123")));
    assert!(registry.pushes.borrow().is_empty());
}

#[test]
fn failed_push_leaves_marker_advanced() {
    let root = TempDir::new().expect("root");
    let config = config(root.path(), &[]);
    seed_working_copy(&config, "abc123");
    let vcs = FakeVcs::new("def456");
    let registry = FakeRegistry {
        fail_at: Some("push"),
        ..FakeRegistry::default()
    };
    let (builder, clock) = (FakeBuilder::default(), at(12, 30, 15));

    let err = pipeline::run(&config, tools(&vcs, &builder, &registry, &clock), Mode::Full)
        .unwrap_err();

    match &err {
        PipelineError::Publish {
            version_tag,
            commit,
            source: PublishError::Push { tag, .. },
        } => {
            assert_eq!(version_tag.as_str(), "myregistry/repo:2024-01-01t123015");
            assert_eq!(tag, version_tag);
            assert_eq!(commit, &CommitId::from("def456"));
        }
        other => panic!("expected push failure, got {other:?}"),
    }
    assert_eq!(err.stage(), Stage::Publish);
    assert_eq!(stored(&config), Some(CommitId::from("def456")));
}

#[rstest]
#[case("credential")]
#[case("login")]
fn registry_auth_failures_are_distinct(#[case] fail_at: &'static str) {
    let root = TempDir::new().expect("root");
    let config = config(root.path(), &[]);
    seed_working_copy(&config, "abc123");
    let vcs = FakeVcs::new("def456");
    let registry = FakeRegistry {
        fail_at: Some(fail_at),
        ..FakeRegistry::default()
    };
    let (builder, clock) = (FakeBuilder::default(), at(0, 0, 0));

    let err = pipeline::run(&config, tools(&vcs, &builder, &registry, &clock), Mode::Full)
        .unwrap_err();

    match (fail_at, &err) {
        ("credential", PipelineError::Publish { source: PublishError::Credential(_), .. }) => {}
        ("login", PipelineError::Publish { source: PublishError::Login(_), .. }) => {}
        _ => panic!("unexpected error for {fail_at}: {err:?}"),
    }
    assert!(registry.pushes.borrow().is_empty());
}

#[test]
fn push_latest_pushes_alias_after_version() {
    let root = TempDir::new().expect("root");
    let config = config(root.path(), &[("PUSH_LATEST", "true")]);
    seed_working_copy(&config, "abc123");
    let vcs = FakeVcs::new("def456");
    let (builder, registry, clock) = (FakeBuilder::default(), FakeRegistry::default(), at(0, 0, 0));

    pipeline::run(&config, tools(&vcs, &builder, &registry, &clock), Mode::Full).expect("run");

    assert_eq!(
        registry.pushes.borrow().as_slice(),
        &[
            ImageTag::from("myregistry/repo:2024-01-01t000000"),
            ImageTag::from("myregistry/repo:latest"),
        ]
    );
}

#[test]
fn detect_only_stops_after_decision() {
    let root = TempDir::new().expect("root");
    let config = config(root.path(), &[]);
    seed_working_copy(&config, "abc123");
    let vcs = FakeVcs::new("def456");
    let (builder, registry, clock) = (FakeBuilder::default(), FakeRegistry::default(), at(0, 0, 0));

    let outcome = pipeline::run(&config, tools(&vcs, &builder, &registry, &clock), Mode::DetectOnly)
        .expect("run");

    assert_eq!(
        outcome,
        Outcome::BuildRequired {
            decision: Decision::Changed {
                stored: Some(CommitId::from("abc123")),
                remote: CommitId::from("def456"),
            }
        }
    );
    assert!(builder.builds.borrow().is_empty());
    assert_eq!(stored(&config), Some(CommitId::from("abc123")));
}

#[test]
fn detect_only_without_working_copy_does_not_clone() {
    let root = TempDir::new().expect("root");
    let config = config(root.path(), &[]);
    let vcs = FakeVcs::new("abc123");
    let (builder, registry, clock) = (FakeBuilder::default(), FakeRegistry::default(), at(0, 0, 0));

    let outcome = pipeline::run(&config, tools(&vcs, &builder, &registry, &clock), Mode::DetectOnly)
        .expect("run");

    assert_eq!(
        outcome,
        Outcome::BuildRequired {
            decision: Decision::Changed {
                stored: None,
                remote: CommitId::from("abc123"),
            }
        }
    );
    assert_eq!(vcs.calls(), vec!["ls-remote"]);
    assert!(!config.repository.working_copy.exists());
}

// ---------------------------------------------------------------------------
// 2. Sync failures
// ---------------------------------------------------------------------------

#[rstest]
#[case(VcsOp::Fetch)]
#[case(VcsOp::LsRemote)]
fn sync_failures_abort_before_build(#[case] op: VcsOp) {
    let root = TempDir::new().expect("root");
    let config = config(root.path(), &[]);
    seed_working_copy(&config, "abc123");
    let vcs = FakeVcs::new("def456").failing(op);
    let (builder, registry, clock) = (FakeBuilder::default(), FakeRegistry::default(), at(0, 0, 0));

    let err = pipeline::run(&config, tools(&vcs, &builder, &registry, &clock), Mode::Full)
        .unwrap_err();

    assert_eq!(err.stage(), Stage::Sync);
    assert!(
        matches!(&err, PipelineError::Sync(SyncError::Vcs(VcsError::Command { op: failed, .. })) if *failed == op),
        "got: {err:?}"
    );
    assert!(builder.builds.borrow().is_empty());
    assert_eq!(stored(&config), Some(CommitId::from("abc123")));
}

#[test]
fn missing_remote_branch_is_ref_not_found() {
    let root = TempDir::new().expect("root");
    let config = config(root.path(), &[("BRANCH", "gone")]);
    seed_working_copy(&config, "abc123");
    let vcs = FakeVcs {
        remote: None,
        ..FakeVcs::new("unused")
    };
    let (builder, registry, clock) = (FakeBuilder::default(), FakeRegistry::default(), at(0, 0, 0));

    let err = pipeline::run(&config, tools(&vcs, &builder, &registry, &clock), Mode::Full)
        .unwrap_err();

    assert!(
        matches!(err, PipelineError::Sync(SyncError::Vcs(VcsError::RefNotFound { ref branch })) if branch == "gone"),
        "got: {err:?}"
    );
}

#[test]
fn failed_clone_writes_no_marker() {
    let root = TempDir::new().expect("root");
    let config = config(root.path(), &[]);
    let vcs = FakeVcs::new("abc123").failing(VcsOp::Clone);
    let (builder, registry, clock) = (FakeBuilder::default(), FakeRegistry::default(), at(0, 0, 0));

    let err = pipeline::run(&config, tools(&vcs, &builder, &registry, &clock), Mode::Full)
        .unwrap_err();

    assert_eq!(err.stage(), Stage::Sync);
    assert!(!config.repository.working_copy.exists());
}

// ---------------------------------------------------------------------------
// 3. Build pipeline
// ---------------------------------------------------------------------------

#[test]
fn failed_pull_skips_image_build() {
    let root = TempDir::new().expect("root");
    let config = config(root.path(), &[]);
    seed_working_copy(&config, "abc123");
    let vcs = FakeVcs::new("def456").failing(VcsOp::Pull);
    let builder = FakeBuilder::default();

    let err = build::build(
        &vcs,
        &builder,
        &at(0, 0, 0),
        &config.repository.working_copy,
        &config.registry,
    )
    .unwrap_err();

    assert!(matches!(err, BuildError::Pull(_)), "got: {err}");
    assert!(builder.builds.borrow().is_empty());
    assert_eq!(stored(&config), Some(CommitId::from("abc123")));
}

#[test]
fn marker_records_post_pull_head() {
    let root = TempDir::new().expect("root");
    let config = config(root.path(), &[]);
    seed_working_copy(&config, "abc123");
    let vcs = FakeVcs {
        after_pull: Some("0a1b2c".to_string()),
        ..FakeVcs::new("def456")
    };

    let built = build::build(
        &vcs,
        &FakeBuilder::default(),
        &at(0, 0, 0),
        &config.repository.working_copy,
        &config.registry,
    )
    .expect("build");

    assert_eq!(built.commit, CommitId::from("0a1b2c"));
    assert_eq!(stored(&config), Some(CommitId::from("0a1b2c")));
}

#[rstest]
#[case(at(9, 0, 0), at(9, 0, 1), false)]
#[case(at(9, 0, 0), at(9, 0, 0), true)]
fn version_tags_collide_only_within_one_second(
    #[case] first: FixedClock,
    #[case] second: FixedClock,
    #[case] identical: bool,
) {
    let root = TempDir::new().expect("root");
    let config = config(root.path(), &[]);
    seed_working_copy(&config, "abc123");
    let vcs = FakeVcs::new("def456");
    let builder = FakeBuilder::default();
    let wc = &config.repository.working_copy;

    let a = build::build(&vcs, &builder, &first, wc, &config.registry).expect("first build");
    let b = build::build(&vcs, &builder, &second, wc, &config.registry).expect("second build");

    assert_eq!(a.version_tag == b.version_tag, identical);
    assert_eq!(a.alias_tag, b.alias_tag);
}

// ---------------------------------------------------------------------------
// 4. Decision table
// ---------------------------------------------------------------------------

#[rstest]
#[case("abc123", "abc123", false)]
#[case("abc123", "def456", true)]
#[case("def456", "abc123", true)]
#[case("", "abc123", true)]
fn build_required_iff_commits_differ(
    #[case] marker_value: &str,
    #[case] remote: &str,
    #[case] expected: bool,
) {
    let root = TempDir::new().expect("root");
    let config = config(root.path(), &[]);
    seed_working_copy(&config, marker_value);
    let vcs = FakeVcs::new(remote);

    let report = ecrwatch_pipeline::sync::sync(&vcs, &config.repository, &config.remote)
        .expect("sync");

    assert!(report.working_copy_ready);
    assert_eq!(report.build_required, expected);
}
