use std::ffi::OsStr;
use std::fmt::Display;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};

use tracing::info;

use crate::Error;

/// Role of a launched subordinate process within the distributed session running on this host.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProcessRole {
    /// Process that performs training work on one compute device.
    Worker,

    /// Process that coordinates the workers running on this host.
    Controller,
}

impl Display for ProcessRole {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(match self {
            Self::Worker => "worker",
            Self::Controller => "controller",
        })
    }
}

/// Options used to configure [`launch_process`]. The defaults launch a worker through the `python` interpreter
/// with device placement communicated through `THEANO_FLAGS`, which is what the training scripts this layer was
/// built for expect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LauncherOptions {
    /// [`ProcessRole`] of the launched process.
    pub role: ProcessRole,

    /// Interpreter that runs the experiment script.
    pub interpreter: String,

    /// Extension of the experiment script resolved as `<experiment-name>_<role>.<extension>`.
    pub script_extension: String,

    /// Name of the environment variable through which the launched process reads its device placement. The
    /// variable's existing value is preserved as a prefix, followed by `device=<device>`; no other channel is used
    /// to communicate device placement.
    pub device_variable: String,
}

impl Default for LauncherOptions {
    fn default() -> Self {
        Self {
            role: ProcessRole::Worker,
            interpreter: "python".to_string(),
            script_extension: "py".to_string(),
            device_variable: "THEANO_FLAGS".to_string(),
        }
    }
}

/// Handle to a launched subordinate process. The caller owns the handle and with it the process lifecycle:
/// nothing in this crate waits for, reaps, or terminates the process implicitly. Dropping the handle leaves the
/// process running.
#[derive(Debug)]
pub struct ProcessHandle {
    /// Underlying [`Child`] process.
    child: Child,

    /// Name of the compute device the process was bound to.
    device: String,

    /// [`ProcessRole`] the process was launched as.
    role: ProcessRole,

    /// Path of the log file capturing the process's standard output.
    stdout_path: PathBuf,

    /// Path of the log file capturing the process's standard error.
    stderr_path: PathBuf,
}

impl ProcessHandle {
    /// Returns the OS process identifier of the launched process.
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Returns the name of the compute device the process was bound to.
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Returns the [`ProcessRole`] the process was launched as.
    pub fn role(&self) -> ProcessRole {
        self.role
    }

    /// Returns the path of the log file capturing the process's standard output.
    pub fn stdout_path(&self) -> &Path {
        &self.stdout_path
    }

    /// Returns the path of the log file capturing the process's standard error.
    pub fn stderr_path(&self) -> &Path {
        &self.stderr_path
    }

    /// Waits for the process to exit, returning its [`ExitStatus`].
    pub fn wait(&mut self) -> Result<ExitStatus, Error> {
        self.child.wait().map_err(|error| Error::from_io(format!("failed to wait for {}", self.role), &error))
    }

    /// Returns the process's [`ExitStatus`] if it has already exited, without blocking.
    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>, Error> {
        self.child.try_wait().map_err(|error| Error::from_io(format!("failed to poll {}", self.role), &error))
    }

    /// Terminates the process. The caller should still [`ProcessHandle::wait`] afterwards to reap it.
    pub fn kill(&mut self) -> Result<(), Error> {
        self.child.kill().map_err(|error| Error::from_io(format!("failed to kill {}", self.role), &error))
    }
}

/// Launches a subordinate process bound to the named compute `device`, redirecting its output and error streams
/// to per-process log files under `logs_directory`.
///
/// The two log files, `<logs-directory>/<role><device>.out` and `...err`, are created (truncating any previous
/// contents) before the process starts; the spawned process owns their descriptors for the duration of its life.
/// The launched command line is `<interpreter> -u <experiment_name>_<role>.<extension> [args...]`, with `args`
/// appended verbatim and in order, and the script path resolved relative to the caller's working directory. The
/// process inherits the launcher's environment with the device-selection variable extended to
/// `<existing-value>,device=<device>`; the environment delta is private to each launch, so concurrent launches for
/// different devices never observe each other's device assignment.
///
/// The launcher does not wait for the process: it returns immediately with the running [`ProcessHandle`], whose
/// lifecycle belongs to the caller from then on. If a log file cannot be created or the spawn itself fails, the
/// underlying OS error is returned and no process is left running.
pub fn launch_process<P: AsRef<Path>, S: AsRef<OsStr>>(
    logs_directory: P,
    experiment_name: &str,
    args: &[S],
    device: &str,
    options: LauncherOptions,
) -> Result<ProcessHandle, Error> {
    let role = options.role;
    info!("starting {role} on {device} ...");

    let logs_directory = logs_directory.as_ref();
    let stdout_path = logs_directory.join(format!("{role}{device}.out"));
    let stderr_path = logs_directory.join(format!("{role}{device}.err"));
    let stdout_file = File::create(&stdout_path)
        .map_err(|error| Error::from_io(format!("failed to create the log file '{}'", stdout_path.display()), &error))?;
    let stderr_file = File::create(&stderr_path)
        .map_err(|error| Error::from_io(format!("failed to create the log file '{}'", stderr_path.display()), &error))?;

    let device_flags = std::env::var(&options.device_variable).unwrap_or_default();
    let script = format!("{experiment_name}_{role}.{}", options.script_extension);

    let child = Command::new(&options.interpreter)
        .arg("-u")
        .arg(&script)
        .args(args)
        .env(&options.device_variable, format!("{device_flags},device={device}"))
        .stdout(Stdio::from(stdout_file))
        .stderr(Stdio::from(stderr_file))
        .spawn()
        .map_err(|error| {
            Error::from_io(format!("failed to spawn '{} -u {script}'", options.interpreter), &error)
        })?;

    info!("done; {role} running on {device} with pid {}", child.id());

    Ok(ProcessHandle { child, device: device.to_string(), role, stdout_path, stderr_path })
}

#[cfg(test)]
mod tests {
    use crate::{Error, LauncherOptions, ProcessRole, launch_process};

    /// Returns [`LauncherOptions`] that run experiment scripts through `sh` so that the tests do not depend on a
    /// Python installation.
    fn shell_options(role: ProcessRole) -> LauncherOptions {
        LauncherOptions {
            role,
            interpreter: "sh".to_string(),
            script_extension: "sh".to_string(),
            device_variable: "PHALANX_TEST_DEVICE_FLAGS".to_string(),
        }
    }

    /// Writes an experiment script for `role` that prints the device-selection variable, and returns the
    /// experiment name under which [`launch_process`] resolves it.
    fn write_experiment_script(directory: &std::path::Path, role: ProcessRole) -> String {
        let experiment_name = directory.join("experiment").to_str().unwrap().to_string();
        std::fs::write(
            format!("{experiment_name}_{role}.sh"),
            "printf '%s\\n' \"$PHALANX_TEST_DEVICE_FLAGS\"\n",
        )
        .unwrap();
        experiment_name
    }

    #[test]
    fn test_launch_creates_log_files_and_handle() {
        let directory = tempfile::tempdir().unwrap();
        let experiment_name = write_experiment_script(directory.path(), ProcessRole::Worker);

        let args: &[&str] = &[];
        let mut handle =
            launch_process(directory.path(), &experiment_name, args, "0", shell_options(ProcessRole::Worker))
                .unwrap();

        // Both log files exist as soon as the launcher returns, before the child is observed to run.
        assert!(directory.path().join("worker0.out").exists());
        assert!(directory.path().join("worker0.err").exists());
        assert_eq!(handle.device(), "0");
        assert_eq!(handle.role(), ProcessRole::Worker);
        assert_eq!(handle.stdout_path(), directory.path().join("worker0.out"));

        assert!(handle.wait().unwrap().success());
    }

    #[test]
    fn test_launch_controller_log_naming() {
        let directory = tempfile::tempdir().unwrap();
        let experiment_name = write_experiment_script(directory.path(), ProcessRole::Controller);

        let args: &[&str] = &[];
        let mut handle =
            launch_process(directory.path(), &experiment_name, args, "1", shell_options(ProcessRole::Controller))
                .unwrap();
        assert!(directory.path().join("controller1.out").exists());
        assert!(directory.path().join("controller1.err").exists());
        assert!(handle.wait().unwrap().success());
    }

    #[test]
    fn test_concurrent_launches_isolate_device_assignment() {
        let directory = tempfile::tempdir().unwrap();
        let experiment_name = write_experiment_script(directory.path(), ProcessRole::Worker);

        // Both processes run at the same time; each must observe only its own device id.
        let args: &[&str] = &[];
        let mut first =
            launch_process(directory.path(), &experiment_name, args, "0", shell_options(ProcessRole::Worker))
                .unwrap();
        let mut second =
            launch_process(directory.path(), &experiment_name, args, "1", shell_options(ProcessRole::Worker))
                .unwrap();
        assert!(first.wait().unwrap().success());
        assert!(second.wait().unwrap().success());

        let first_flags = std::fs::read_to_string(directory.path().join("worker0.out")).unwrap();
        let second_flags = std::fs::read_to_string(directory.path().join("worker1.out")).unwrap();
        assert!(first_flags.contains("device=0") && !first_flags.contains("device=1"));
        assert!(second_flags.contains("device=1") && !second_flags.contains("device=0"));

        // The existing value of the device-selection variable (empty here) is preserved as a prefix.
        assert_eq!(first_flags.trim(), ",device=0");
    }

    #[test]
    fn test_launch_arguments_are_forwarded() {
        let directory = tempfile::tempdir().unwrap();
        let experiment_name = directory.path().join("experiment").to_str().unwrap().to_string();
        std::fs::write(format!("{experiment_name}_worker.sh"), "printf '%s\\n' \"$@\"\n").unwrap();

        let mut handle = launch_process(
            directory.path(),
            &experiment_name,
            &["--learning-rate", "0.1"],
            "0",
            shell_options(ProcessRole::Worker),
        )
        .unwrap();
        assert!(handle.wait().unwrap().success());

        let output = std::fs::read_to_string(directory.path().join("worker0.out")).unwrap();
        assert_eq!(output, "--learning-rate\n0.1\n");
    }

    #[test]
    fn test_launch_fails_without_logs_directory() {
        let directory = tempfile::tempdir().unwrap();
        let missing = directory.path().join("missing");

        let args: &[&str] = &[];
        assert!(matches!(
            launch_process(&missing, "experiment", args, "0", shell_options(ProcessRole::Worker)),
            Err(Error::Os { code, .. }) if code != 0,
        ));
    }

    #[test]
    fn test_launch_fails_for_missing_interpreter() {
        let directory = tempfile::tempdir().unwrap();
        let options = LauncherOptions {
            interpreter: "phalanx-missing-interpreter".to_string(),
            ..shell_options(ProcessRole::Worker)
        };

        let args: &[&str] = &[];
        assert!(matches!(
            launch_process(directory.path(), "experiment", args, "0", options),
            Err(Error::Os { code, .. }) if code != 0,
        ));
    }

    #[test]
    fn test_launcher_options_defaults() {
        let options = LauncherOptions::default();
        assert_eq!(options.role, ProcessRole::Worker);
        assert_eq!(options.interpreter, "python");
        assert_eq!(options.script_extension, "py");
        assert_eq!(options.device_variable, "THEANO_FLAGS");
        assert_eq!(format!("{}", ProcessRole::Worker), "worker");
        assert_eq!(format!("{}", ProcessRole::Controller), "controller");
    }
}
