use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anvil_patch::{
    Author, Git, PatchError, PatchWorkflow, RepositoryState, Resolution, BASELINE_MESSAGE,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tracing_subscriber::fmt::MakeWriter;

const A_JAVA: &str = "package net.minecraft.server;\n\nclass A {\n    int x = 1;\n}\n";

struct Fixture {
    _dir: TempDir,
    git: Git,
    workflow: PatchWorkflow,
}

impl Fixture {
    fn source(&self) -> &Path {
        self.git.root()
    }

    fn a_java(&self) -> std::path::PathBuf {
        self.source().join("net/minecraft/server/A.java")
    }

    fn set_x(&self, value: u32) {
        fs::write(self.a_java(), A_JAVA.replace("x = 1", &format!("x = {value}"))).unwrap();
    }

    fn commit(&self, message: &str) {
        self.git.run(["commit", "-q", "-a", "-m", message]).unwrap();
    }

    fn init(&self) {
        let created = self
            .workflow
            .init_baseline(|dir| {
                let package = dir.join("net/minecraft/server");
                fs::create_dir_all(&package).unwrap();
                fs::write(package.join("A.java"), A_JAVA).unwrap();
                Ok::<(), PatchError>(())
            })
            .unwrap();
        assert!(created);
    }
}

/// Collects formatted log output in memory.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Leaves the repository in the middle of a conflicted `git am`.
fn leave_conflict(fx: &Fixture) {
    fx.init();
    fx.set_x(2);
    fx.commit("Make x two");
    fx.set_x(3);
    fx.commit("Make x three");
    let patches = fx.workflow.generate().unwrap();
    fs::remove_file(&patches[0]).unwrap();
    assert!(matches!(
        fx.workflow.clone().force(true).apply(),
        Err(PatchError::Conflict { .. })
    ));
    assert_eq!(fx.workflow.state().unwrap(), RepositoryState::Applying);
}

/// `None` when git is not installed; the calling test then passes vacuously.
fn fixture() -> Option<Fixture> {
    if let Err(err) = Git::version() {
        eprintln!("skipping git workflow test: {err}");
        return None;
    }
    let dir = tempfile::tempdir().unwrap();
    let git = Git::new(dir.path().join("src"), Author::default())
        .with_timeout(Some(Duration::from_secs(60)));
    let workflow = PatchWorkflow::new(git.clone(), dir.path().join("patches"));
    Some(Fixture {
        _dir: dir,
        git,
        workflow,
    })
}

#[test]
fn baseline_is_committed_on_upstream_once() {
    let Some(fx) = fixture() else { return };
    assert_eq!(fx.workflow.state().unwrap(), RepositoryState::Uninitialized);
    // nothing to protect yet
    fx.workflow.safeguard().unwrap();

    fx.init();
    assert_eq!(fx.workflow.state().unwrap(), RepositoryState::Baseline);
    assert_eq!(fx.git.run(["log", "-1", "--format=%s"]).unwrap(), BASELINE_MESSAGE);
    assert_eq!(fx.git.run(["log", "-1", "--format=%an"]).unwrap(), "Anvil");

    let again = fx
        .workflow
        .init_baseline(|_| -> Result<(), PatchError> { panic!("must not repopulate") })
        .unwrap();
    assert!(!again);
}

#[test]
fn generated_patches_reapply_after_reset() {
    let Some(fx) = fixture() else { return };
    fx.init();

    fx.set_x(2);
    fx.commit("Make x two");
    assert_eq!(fx.workflow.state().unwrap(), RepositoryState::Patched);

    let patches = fx.workflow.generate().unwrap();
    assert_eq!(patches.len(), 1);
    let name = patches[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("0001-") && name.ends_with(".patch"), "{name}");

    let applied = fx.workflow.apply().unwrap();
    assert_eq!(applied, patches);
    assert_eq!(fx.workflow.state().unwrap(), RepositoryState::Patched);
    assert!(fs::read_to_string(fx.a_java()).unwrap().contains("int x = 2;"));
    assert_eq!(fx.git.run(["rev-list", "--count", "upstream..HEAD"]).unwrap(), "1");
}

#[test]
fn empty_patch_set_round_trips() {
    let Some(fx) = fixture() else { return };
    fx.init();

    assert!(fx.workflow.generate().unwrap().is_empty());
    assert!(fx.workflow.patch_dir().is_dir());

    assert!(fx.workflow.apply().unwrap().is_empty());
    assert_eq!(fx.workflow.state().unwrap(), RepositoryState::Baseline);
}

#[test]
fn missing_patch_directory_skips_apply() {
    let Some(fx) = fixture() else { return };
    fx.init();
    fx.set_x(5);

    // nothing is reset, so the dirty tree survives
    assert!(fx.workflow.apply().unwrap().is_empty());
    assert_eq!(fx.workflow.state().unwrap(), RepositoryState::Dirty);
}

#[test]
fn dirty_tree_blocks_reset_unless_forced() {
    let Some(fx) = fixture() else { return };
    fx.init();
    fs::create_dir_all(fx.workflow.patch_dir()).unwrap();

    fx.set_x(7);
    assert_eq!(fx.workflow.state().unwrap(), RepositoryState::Dirty);
    assert!(matches!(
        fx.workflow.safeguard(),
        Err(PatchError::DirtyWorkingTree { .. })
    ));
    assert!(matches!(
        fx.workflow.apply(),
        Err(PatchError::DirtyWorkingTree { .. })
    ));
    assert!(fs::read_to_string(fx.a_java()).unwrap().contains("x = 7"));

    let forced = fx.workflow.clone().force(true);
    forced.apply().unwrap();
    assert_eq!(fs::read_to_string(fx.a_java()).unwrap(), A_JAVA);
    assert_eq!(forced.state().unwrap(), RepositoryState::Baseline);
}

#[test]
fn unexported_commits_block_reset() {
    let Some(fx) = fixture() else { return };
    fx.init();
    fs::create_dir_all(fx.workflow.patch_dir()).unwrap();

    fx.set_x(2);
    fx.commit("Never exported");

    match fx.workflow.safeguard() {
        Err(PatchError::UnexportedCommits { commits, patches }) => {
            assert_eq!((commits, patches), (1, 0));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn conflicting_patch_leaves_repository_applying() {
    let Some(fx) = fixture() else { return };
    fx.init();

    fx.set_x(2);
    fx.commit("Make x two");
    fx.set_x(3);
    fx.commit("Make x three");
    let patches = fx.workflow.generate().unwrap();
    assert_eq!(patches.len(), 2);

    // the second patch now applies against the baseline, which it does not fit
    fs::remove_file(&patches[0]).unwrap();
    let workflow = fx.workflow.clone().force(true);

    match workflow.apply() {
        Err(PatchError::Conflict {
            patch, remaining, ..
        }) => {
            assert_eq!(patch, patches[1]);
            assert!(remaining.is_empty());
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(workflow.state().unwrap(), RepositoryState::Applying);
    assert!(matches!(
        fx.workflow.safeguard(),
        Err(PatchError::DirtyWorkingTree { .. })
    ));

    let state = workflow.resolve(Resolution::Abort).unwrap();
    assert_eq!(state, RepositoryState::Baseline);
    assert!(matches!(
        workflow.resolve(Resolution::Continue),
        Err(PatchError::NoOperationInProgress)
    ));
}

#[test]
fn unforced_apply_keeps_pending_conflict_resolution() {
    let Some(fx) = fixture() else { return };
    leave_conflict(&fx);

    // resolution in progress
    fx.set_x(99);

    assert!(matches!(
        fx.workflow.apply(),
        Err(PatchError::DirtyWorkingTree { .. })
    ));
    assert_eq!(fx.workflow.state().unwrap(), RepositoryState::Applying);
    let source = fs::read_to_string(fx.a_java()).unwrap();
    assert!(source.contains("int x = 99;"), "{source}");
    assert!(!source.contains("<<<<<<<"), "{source}");
}

#[test]
fn forced_apply_aborts_pending_conflict() {
    let Some(fx) = fixture() else { return };
    leave_conflict(&fx);
    fx.set_x(99);

    let forced = fx.workflow.clone().force(true);
    // the remaining patch still conflicts with the baseline
    assert!(matches!(forced.apply(), Err(PatchError::Conflict { .. })));
    assert!(!fs::read_to_string(fx.a_java()).unwrap().contains("x = 99"));
}

#[test]
fn failed_population_leaves_no_repository() {
    let Some(fx) = fixture() else { return };

    let err = fx
        .workflow
        .init_baseline(|dir| {
            fs::write(dir.join("partial.txt"), "x").unwrap();
            Err(PatchError::NoOperationInProgress)
        })
        .unwrap_err();
    assert!(matches!(err, PatchError::NoOperationInProgress));
    assert_eq!(fx.workflow.state().unwrap(), RepositoryState::Uninitialized);
    assert!(!fx.source().exists());

    fx.init();
    assert_eq!(fx.workflow.state().unwrap(), RepositoryState::Baseline);
}

#[test]
fn failed_population_keeps_an_existing_directory() {
    let Some(fx) = fixture() else { return };
    fs::create_dir_all(fx.source()).unwrap();
    fs::write(fx.source().join("notes.txt"), "keep").unwrap();

    assert!(fx
        .workflow
        .init_baseline(|_| Err(PatchError::NoOperationInProgress))
        .is_err());
    assert!(!fx.source().join(".git").exists());
    assert_eq!(fs::read_to_string(fx.source().join("notes.txt")).unwrap(), "keep");
}

#[test]
fn forced_reset_of_dirty_tree_is_logged() {
    let Some(fx) = fixture() else { return };
    fx.init();
    fs::create_dir_all(fx.workflow.patch_dir()).unwrap();
    fx.set_x(7);

    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    let forced = fx.workflow.clone().force(true);
    tracing::subscriber::with_default(subscriber, || forced.apply()).unwrap();

    let text = logs.text();
    assert!(text.contains("WARN"), "{text}");
    assert!(text.contains("force=true"), "{text}");
    assert!(text.contains("continuing because force is set"), "{text}");
    assert_eq!(forced.state().unwrap(), RepositoryState::Baseline);
}

#[test]
fn unforced_safeguard_logs_nothing_about_force() {
    let Some(fx) = fixture() else { return };
    fx.init();
    fs::create_dir_all(fx.workflow.patch_dir()).unwrap();
    fx.set_x(7);

    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, || fx.workflow.safeguard());

    assert!(matches!(result, Err(PatchError::DirtyWorkingTree { .. })));
    assert!(!logs.text().contains("force=true"));
}
