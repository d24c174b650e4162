//! Game source compilation
//!
//! Each game directory holds at most one source file that gets compiled.
//! The compiler runs as a child process with the game directory as its
//! working directory; the process-wide working directory is never touched.
//! A failed compile is recorded as a [`CompileOutcome`] rather than an
//! error so the rest of the batch still gets packaged.

use serde::{Serialize, Serializer};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::PackConfig;

/// How often a running compiler is polled for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Longest stderr excerpt kept in a failure reason.
const STDERR_EXCERPT_CHARS: usize = 400;

/// Result of the compile step for one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum CompileOutcome {
    /// The source compiled and the executable was marked runnable.
    Compiled { source: String, executable: String },
    /// No file with the source extension; nothing to do.
    Skipped,
    /// Compilation was attempted and did not produce a usable executable.
    Failed {
        source: String,
        reason: CompileFailure,
    },
    /// The game was never compiled because its copy failed.
    NotAttempted,
}

impl CompileOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, CompileOutcome::Failed { .. })
    }
}

/// Why a compile attempt failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileFailure {
    #[error("failed to list game directory: {0}")]
    Scan(String),

    #[error("failed to start {program}: {message}")]
    Spawn { program: String, message: String },

    #[error("compiler did not finish within {}s and was killed", .0.as_secs_f32())]
    TimedOut(Duration),

    #[error("failed waiting for compiler: {0}")]
    Wait(String),

    #[error("compiler failed ({status}){}", stderr_suffix(.stderr))]
    ExitStatus { status: String, stderr: String },

    #[error("compiler reported success but {0} was not produced")]
    MissingArtifact(String),

    #[error("failed to mark {path} executable: {message}")]
    Permissions { path: String, message: String },
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", excerpt(trimmed, STDERR_EXCERPT_CHARS))
    }
}

fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

impl Serialize for CompileFailure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// External compiler invocation: `<program> <args...> -o <executable> <source>`
#[derive(Debug, Clone)]
pub struct Toolchain {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl Toolchain {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Build the toolchain from config, resolving the program on PATH.
    ///
    /// Resolution happens up front so that relative program paths refer to
    /// the directory gamepack was started in, not the game directory. A
    /// program that cannot be found is kept as written; only games that
    /// actually have source to compile report it, when the spawn fails.
    pub fn from_config(config: &PackConfig) -> Self {
        let (program, args) = match config.compile_command.split_first() {
            Some((program, args)) => (program.as_str(), args.to_vec()),
            None => ("", Vec::new()),
        };

        let resolved = match which::which(program) {
            Ok(path) => path,
            Err(err) => {
                tracing::debug!("Compiler '{}' not found on PATH: {}", program, err);
                PathBuf::from(program)
            }
        };

        Self::new(resolved, args, config.compile_timeout())
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the compiler in `dir` and wait for it.
    ///
    /// One deadline covers both the process exit and the capture of its
    /// output, so a background process that keeps the pipes open cannot
    /// stretch the wait. When the deadline passes, the compiler and
    /// everything it started are killed.
    pub fn invoke(
        &self,
        dir: &Path,
        executable: &str,
        source: &str,
    ) -> Result<CompilerOutput, CompileFailure> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .args(["-o", executable, source])
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Own process group, so a timeout can take down the whole tree
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = command.spawn().map_err(|err| CompileFailure::Spawn {
            program: self.program.display().to_string(),
            message: err.to_string(),
        })?;
        let deadline = Instant::now() + self.timeout;

        // Drain both pipes concurrently so a chatty compiler cannot block
        let (tx, rx) = mpsc::channel();
        if let Some(stdout) = child.stdout.take() {
            drain(stdout, Stream::Stdout, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            drain(stderr, Stream::Stderr, tx.clone());
        }
        drop(tx);

        let status = wait_until(&mut child, deadline, self.timeout)?;

        let mut output = CompilerOutput {
            status,
            stdout: String::new(),
            stderr: String::new(),
        };
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok((Stream::Stdout, text)) => output.stdout = text,
                Ok((Stream::Stderr, text)) => output.stderr = text,
                Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {
                    // The compiler exited but left something holding its output
                    kill_process_group(&mut child);
                    return Err(CompileFailure::TimedOut(self.timeout));
                }
            }
        }

        Ok(output)
    }
}

/// Captured result of a finished compiler process.
#[derive(Debug)]
pub struct CompilerOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

fn drain<R: Read + Send + 'static>(mut pipe: R, stream: Stream, tx: Sender<(Stream, String)>) {
    thread::spawn(move || {
        let mut bytes = Vec::new();
        let _ = pipe.read_to_end(&mut bytes);
        let _ = tx.send((stream, String::from_utf8_lossy(&bytes).into_owned()));
    });
}

fn wait_until(
    child: &mut Child,
    deadline: Instant,
    timeout: Duration,
) -> Result<ExitStatus, CompileFailure> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) if Instant::now() >= deadline => {
                kill_process_group(child);
                let _ = child.wait();
                return Err(CompileFailure::TimedOut(timeout));
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(err) => {
                kill_process_group(child);
                return Err(CompileFailure::Wait(err.to_string()));
            }
        }
    }
}

/// Kill the compiler and every process in its group.
fn kill_process_group(child: &mut Child) {
    #[cfg(unix)]
    {
        // The compiler leads its own group; a negative pid signals all of it
        let pgid = child.id() as libc::pid_t;
        unsafe {
            libc::kill(-pgid, libc::SIGKILL);
        }
    }
    let _ = child.kill();
}

/// Find the first file in `dir` (listing order, no recursion) whose name
/// ends with `extension`.
pub fn find_source_file(dir: &Path, extension: &str) -> io::Result<Option<String>> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.path().is_file() {
            continue;
        }

        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        if name.len() > extension.len() && name.ends_with(extension) {
            return Ok(Some(name));
        }
    }

    Ok(None)
}

/// Compile the game source in `dir`, if there is one.
pub fn compile_game(dir: &Path, toolchain: &Toolchain, extension: &str) -> CompileOutcome {
    let source = match find_source_file(dir, extension) {
        Ok(Some(source)) => source,
        Ok(None) => {
            tracing::info!("  No {} source in {}, skipping compile", extension, dir.display());
            return CompileOutcome::Skipped;
        }
        Err(err) => {
            return CompileOutcome::Failed {
                source: String::new(),
                reason: CompileFailure::Scan(err.to_string()),
            };
        }
    };

    let executable = source[..source.len() - extension.len()].to_string();

    match build_executable(dir, toolchain, &source, &executable) {
        Ok(()) => {
            tracing::info!("  Compiled {} to {}", source, executable);
            CompileOutcome::Compiled { source, executable }
        }
        Err(reason) => {
            tracing::warn!("  Error compiling {}: {}", source, reason);
            CompileOutcome::Failed { source, reason }
        }
    }
}

fn build_executable(
    dir: &Path,
    toolchain: &Toolchain,
    source: &str,
    executable: &str,
) -> Result<(), CompileFailure> {
    let output = toolchain.invoke(dir, executable, source)?;

    for line in output.stdout.lines() {
        tracing::debug!("  [compiler] {}", line);
    }
    for line in output.stderr.lines() {
        tracing::debug!("  [compiler] {}", line);
    }

    if !output.status.success() {
        return Err(CompileFailure::ExitStatus {
            status: output.status.to_string(),
            stderr: output.stderr,
        });
    }

    let artifact = dir.join(executable);
    if !artifact.is_file() {
        return Err(CompileFailure::MissingArtifact(executable.to_string()));
    }

    make_executable(&artifact).map_err(|err| CompileFailure::Permissions {
        path: artifact.display().to_string(),
        message: err.to_string(),
    })?;
    tracing::debug!("  Made {} executable", executable);

    Ok(())
}

/// Add execute permission for owner, group and other, keeping other bits.
#[cfg(unix)]
pub fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    fs::set_permissions(path, permissions)
}

#[cfg(not(unix))]
pub fn make_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}
