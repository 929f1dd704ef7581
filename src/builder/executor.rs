//! Target executor.
//!
//! Runs the tasks of a target in order and stops at the first failure.
//! Inside a binary task every object is compiled, in declaration order,
//! before the link step. A nested object compiles with the binary's merged
//! parameters as parent and its own preset and inline parameters on top.
//! Presets are looked up here, lazily, through the memoizing resolver; the
//! merged parameters are fresh values and the tasks themselves are never
//! modified.

use std::collections::HashSet;
use std::path::Path;

use rayon::prelude::*;

use crate::builder::toolchain::{Backend, BackendKind, CommandSpec};
use crate::core::errors::{BuildError, BuildResult};
use crate::core::preset::{merge, CompileParams, PresetResolver};
use crate::core::task::{BinaryTask, ObjectTask, Target, Task};
use crate::util::process::{run_checked, Executor};

/// Runs targets against an [`Executor`].
pub struct TargetExecutor<'a> {
    presets: &'a PresetResolver,
    exec: &'a dyn Executor,
    jobs: usize,
}

/// One compile step with its merged parameters.
struct CompileUnit<'t> {
    backend: &'t BackendKind,
    source: &'t Path,
    output: &'t Path,
    params: CompileParams,
}

impl<'a> TargetExecutor<'a> {
    /// Create a sequential executor.
    pub fn new(presets: &'a PresetResolver, exec: &'a dyn Executor) -> Self {
        TargetExecutor {
            presets,
            exec,
            jobs: 1,
        }
    }

    /// Allow up to `jobs` sibling objects of one binary to compile at once.
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Run every task of a target, stopping at the first failure.
    pub fn run_target(&self, target: &Target) -> BuildResult<()> {
        tracing::debug!("running target `{}` ({} tasks)", target.name, target.tasks.len());

        for task in &target.tasks {
            self.run_task(task)?;
        }
        Ok(())
    }

    /// Run a single task.
    pub fn run_task(&self, task: &Task) -> BuildResult<()> {
        match task {
            Task::Echo(echo) => {
                println!("{}", echo.text);
                Ok(())
            }
            Task::Exec(exec) => run_checked(
                self.exec,
                &CommandSpec::shell(exec.command.as_str()).cwd(&exec.cwd),
            ),
            Task::Object(obj) => {
                let units = self.compile_units(obj, None)?;
                self.compile_sequential(units)
            }
            Task::Executable(bin) | Task::SharedLibrary(bin) => self.run_binary(bin),
        }
    }

    fn run_binary(&self, bin: &BinaryTask) -> BuildResult<()> {
        check_collisions(bin)?;

        let params = self.presets.apply(bin.preset.as_deref(), &bin.params)?;

        let mut units = Vec::new();
        for obj in &bin.objects {
            units.extend(self.compile_units(obj, Some(&params))?);
        }

        let parallel = self.jobs > 1 && units.iter().all(|u| u.backend.supports_parallel());
        if parallel {
            self.compile_parallel(units)?;
        } else {
            self.compile_sequential(units)?;
        }

        let objects = bin.object_files();
        tracing::info!(
            "{} [{}] -> {}",
            bin.mode.as_str(),
            objects
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
            bin.output.display()
        );

        bin.backend
            .link(bin.mode, &bin.output, &objects, &bin.link_libs, &params, self.exec)
    }

    /// Resolve the parameters of an object task and list its compile steps.
    ///
    /// `inherited` holds the owning binary's merged parameters, if any.
    fn compile_units<'t>(
        &self,
        obj: &'t ObjectTask,
        inherited: Option<&CompileParams>,
    ) -> BuildResult<Vec<CompileUnit<'t>>> {
        let own = self.presets.apply(obj.preset.as_deref(), &obj.params)?;
        let mut params = match inherited {
            Some(parent) => merge(parent, &own),
            None => own,
        };
        if obj.for_shlib {
            params = params.forced_for_shlib();
        }

        Ok(obj
            .compile_units()
            .into_iter()
            .map(|(source, output)| CompileUnit {
                backend: &obj.backend,
                source,
                output,
                params: params.clone(),
            })
            .collect())
    }

    fn compile_sequential(&self, units: Vec<CompileUnit<'_>>) -> BuildResult<()> {
        for unit in &units {
            compile(unit, self.exec)?;
        }
        Ok(())
    }

    /// Compile units concurrently; the first failure in declaration order wins.
    fn compile_parallel(&self, units: Vec<CompileUnit<'_>>) -> BuildResult<()> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .map_err(|e| BuildError::io("failed to start compile workers", std::io::Error::other(e)))?;

        // The preset resolver stays on this thread; workers only see the executor.
        let exec = self.exec;
        let results: Vec<BuildResult<()>> =
            pool.install(|| units.par_iter().map(|unit| compile(unit, exec)).collect());

        results.into_iter().collect()
    }
}

fn compile(unit: &CompileUnit<'_>, exec: &dyn Executor) -> BuildResult<()> {
    tracing::info!("compile {} -> {}", unit.source.display(), unit.output.display());
    unit.backend
        .create_object(unit.output, unit.source, &unit.params, exec)
}

/// Reject binaries where two compile steps write the same object.
fn check_collisions(bin: &BinaryTask) -> BuildResult<()> {
    let mut seen = HashSet::new();
    for obj in &bin.objects {
        for (_, output) in obj.compile_units() {
            if !seen.insert(output) {
                return Err(BuildError::OutputCollision {
                    path: output.to_path_buf(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::builder::toolchain::{BackendRegistry, LinkMode};
    use crate::core::preset::PresetDecl;
    use crate::core::task::{EchoTask, ExecTask};
    use crate::test_support::MockExecutor;
    use crate::util::config::ToolchainSettings;

    fn clang() -> BackendKind {
        BackendRegistry::builtin(&ToolchainSettings::default(), Path::new("/p"))
            .find(Some("clang"), None)
            .unwrap()
            .clone()
    }

    fn object(sources: &[&str], preset: Option<&str>) -> ObjectTask {
        let backend = clang();
        let sources: Vec<PathBuf> = sources.iter().map(PathBuf::from).collect();
        ObjectTask {
            outputs: sources.iter().map(|s| backend.default_object_path(s)).collect(),
            sources,
            file: None,
            backend,
            preset: preset.map(str::to_string),
            params: CompileParams::default(),
            for_shlib: false,
        }
    }

    fn binary(mode: LinkMode, objects: Vec<ObjectTask>) -> BinaryTask {
        let mut objects = objects;
        if mode == LinkMode::SharedLib {
            for o in &mut objects {
                o.for_shlib = true;
            }
        }
        BinaryTask {
            mode,
            output: PathBuf::from("/p/out"),
            objects,
            link_libs: vec![PathBuf::from("/libs/libfoo.so")],
            backend: clang(),
            preset: None,
            params: CompileParams::default(),
        }
    }

    fn presets() -> PresetResolver {
        let mut r = PresetResolver::new();
        r.declare(PresetDecl {
            name: "release".into(),
            parent: None,
            params: CompileParams {
                debug_symbols: Some(false),
                opts: vec!["-O2".into()],
                ..Default::default()
            },
        });
        r
    }

    #[test]
    fn test_objects_compile_in_order_before_link() {
        let presets = presets();
        let exec = MockExecutor::new();
        let bin = binary(
            LinkMode::Executable,
            vec![object(&["/p/a.c", "/p/b.c"], None), object(&["/p/c.c"], None)],
        );

        TargetExecutor::new(&presets, &exec)
            .run_task(&Task::Executable(bin))
            .unwrap();

        let lines = exec.command_lines();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("/p/a.c"));
        assert!(lines[1].contains("/p/b.c"));
        assert!(lines[2].contains("/p/c.c"));
        assert!(lines[3].contains("-o /p/out /p/a.c.o /p/b.c.o /p/c.c.o"));
    }

    #[test]
    fn test_failed_object_stops_target() {
        let presets = presets();
        let exec = MockExecutor::new().fail_when("/p/o2.c", 4);
        let target = Target {
            name: "all".into(),
            tasks: vec![
                Task::Executable(binary(
                    LinkMode::Executable,
                    vec![object(&["/p/o1.c"], None), object(&["/p/o2.c"], None)],
                )),
                Task::Exec(ExecTask {
                    command: "touch never".into(),
                    cwd: PathBuf::from("/p"),
                }),
            ],
        };

        let err = TargetExecutor::new(&presets, &exec)
            .run_target(&target)
            .unwrap_err();

        match err {
            BuildError::CommandFailed { command, code } => {
                assert_eq!(code, 4);
                assert!(command.contains("/p/o2.c"));
            }
            other => panic!("unexpected error: {other}"),
        }
        // o1, o2 and nothing after
        assert_eq!(exec.commands().len(), 2);
    }

    #[test]
    fn test_shared_library_objects_get_pic() {
        let presets = presets();
        let exec = MockExecutor::new();
        let bin = binary(LinkMode::SharedLib, vec![object(&["/p/a.c"], Some("release"))]);

        TargetExecutor::new(&presets, &exec)
            .run_task(&Task::SharedLibrary(bin))
            .unwrap();

        let cmds = exec.commands();
        assert!(cmds[0].args.contains(&"-fPIC".to_string()));
        assert!(cmds[0].args.contains(&"-O2".to_string()));
        assert!(!cmds[1].args.contains(&"-fPIC".to_string()));
        assert_eq!(cmds[1].args[0], "-shared");
        // The shared preset itself is unchanged
        assert!(!presets.resolve("release").unwrap().for_shlib());
    }

    #[test]
    fn test_objects_inherit_binary_params() {
        let mut presets = presets();
        presets.declare(PresetDecl {
            name: "debug".into(),
            parent: None,
            params: CompileParams {
                debug_symbols: Some(true),
                defines: vec!["DEBUG".into()],
                ..Default::default()
            },
        });
        let exec = MockExecutor::new();
        let mut bin = binary(
            LinkMode::Executable,
            vec![object(&["/p/a.c"], None), object(&["/p/b.c"], Some("release"))],
        );
        bin.preset = Some("debug".into());

        TargetExecutor::new(&presets, &exec)
            .run_task(&Task::Executable(bin))
            .unwrap();

        let cmds = exec.commands();
        assert!(cmds[0].args.contains(&"-g".to_string()));
        assert!(cmds[0].args.windows(2).any(|w| w[0] == "-D" && w[1] == "DEBUG"));
        // The object's own preset overrides scalars and appends lists
        assert!(!cmds[1].args.contains(&"-g".to_string()));
        assert!(cmds[1].args.windows(2).any(|w| w[0] == "-D" && w[1] == "DEBUG"));
        assert!(cmds[1].args.contains(&"-O2".to_string()));
        // A standalone object gets nothing from binaries
        let exec = MockExecutor::new();
        TargetExecutor::new(&presets, &exec)
            .run_task(&Task::Object(object(&["/p/c.c"], None)))
            .unwrap();
        assert!(!exec.commands()[0].args.contains(&"-g".to_string()));
    }

    #[test]
    fn test_exec_runs_in_declaring_directory() {
        let presets = presets();
        let exec = MockExecutor::new();
        let task = Task::Exec(ExecTask {
            command: "make".into(),
            cwd: PathBuf::from("/work/proj"),
        });
        TargetExecutor::new(&presets, &exec).run_task(&task).unwrap();

        let cmds = exec.commands();
        assert_eq!(cmds[0].cwd.as_deref(), Some(Path::new("/work/proj")));
        assert_eq!(cmds[0].args.last().map(String::as_str), Some("make"));
    }

    #[test]
    fn test_link_line_references_library_file() {
        let presets = presets();
        let exec = MockExecutor::new();
        let bin = binary(LinkMode::Executable, vec![object(&["/p/a.c"], None)]);
        TargetExecutor::new(&presets, &exec)
            .run_task(&Task::Executable(bin))
            .unwrap();

        let link = &exec.commands()[1];
        assert!(link.args.contains(&"-Wl,-rpath,/libs".to_string()));
        assert!(link.args.windows(2).any(|w| w[0] == "-L" && w[1] == "/libs"));
        assert!(link.args.contains(&"-l:libfoo.so".to_string()));
    }

    #[test]
    fn test_unknown_preset_fails_before_running() {
        let presets = presets();
        let exec = MockExecutor::new();
        let task = Task::Object(object(&["/p/a.c"], Some("nope")));
        let err = TargetExecutor::new(&presets, &exec).run_task(&task).unwrap_err();
        assert!(matches!(err, BuildError::UnknownPreset { .. }));
        assert!(exec.recorded().is_empty());
    }

    #[test]
    fn test_output_collision_detected() {
        let presets = presets();
        let exec = MockExecutor::new();
        let bin = binary(
            LinkMode::Executable,
            vec![object(&["/p/a.c"], None), object(&["/p/a.c"], None)],
        );
        let err = TargetExecutor::new(&presets, &exec)
            .run_task(&Task::Executable(bin))
            .unwrap_err();
        assert!(matches!(err, BuildError::OutputCollision { .. }));
        assert!(exec.recorded().is_empty());
    }

    #[test]
    fn test_parallel_compile_reports_first_failure_and_skips_link() {
        let presets = presets();
        let exec = MockExecutor::new()
            .fail_when("/p/b.c", 1)
            .fail_when("/p/d.c", 2);
        let bin = binary(
            LinkMode::Executable,
            vec![object(&["/p/a.c", "/p/b.c", "/p/c.c", "/p/d.c"], None)],
        );

        let err = TargetExecutor::new(&presets, &exec)
            .jobs(4)
            .run_task(&Task::Executable(bin))
            .unwrap_err();

        assert!(matches!(err, BuildError::CommandFailed { code: 1, .. }));
        assert!(exec.command_lines().iter().all(|l| !l.contains("-o /p/out")));
    }

    #[test]
    fn test_echo_runs_nothing() {
        let presets = presets();
        let exec = MockExecutor::new();
        TargetExecutor::new(&presets, &exec)
            .run_task(&Task::Echo(EchoTask { text: "hi".into() }))
            .unwrap();
        assert!(exec.recorded().is_empty());
    }
}
