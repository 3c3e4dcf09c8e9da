use std::env;
use std::ffi::OsString;
use std::fmt::Debug;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use log::debug;
use crate::batch::ExtractionRequest;
use crate::core::constants::{ARCHIVER_ALIASES, DEFAULT_ARCHIVER};
use crate::error::types::ExtractError;

/// Kill and reap access to a running archiver.
pub trait ProcessControl: Send {
    fn kill(&mut self) -> io::Result<()>;

    /// Waits for exit and returns the exit code when there is one.
    fn wait(&mut self) -> io::Result<Option<i32>>;
}

impl ProcessControl for Child {
    fn kill(&mut self) -> io::Result<()> {
        Child::kill(self)
    }

    fn wait(&mut self) -> io::Result<Option<i32>> {
        Child::wait(self).map(|status| status.code())
    }
}

/// A launched archiver split into its streams and its process handle.
pub struct ArchiverChild {
    pub outputs: Vec<Box<dyn Read + Send>>,
    pub input: Box<dyn Write + Send>,
    pub process: Box<dyn ProcessControl>,
}

/// Launches an archiver for one request.
pub trait Archiver: Send + Sync + Debug {
    /// Name used in failure messages.
    fn program(&self) -> String;

    fn spawn(&self, request: &ExtractionRequest) -> Result<ArchiverChild, ExtractError>;
}

/// Drives the `7z` command line tool.
///
/// Runs `7z x <archive> -o<destination> -bsp1`. Stdout and stderr share one
/// pipe so messages keep the order 7z wrote them in. On unix the child gets
/// its own session and has no controlling terminal, which makes 7z read the
/// password from stdin. The password is never put on the command line.
#[derive(Debug, Clone)]
pub struct SevenZip {
    program: PathBuf,
}

impl SevenZip {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }

    /// Uses `configured` if given, otherwise searches for an installed 7z.
    pub fn locate(configured: Option<&Path>) -> Self {
        Self::new(locate_archiver(configured))
    }

    pub fn program_path(&self) -> &Path {
        &self.program
    }

    pub fn command(&self, request: &ExtractionRequest) -> Command {
        let mut output_flag = OsString::from("-o");
        output_flag.push(request.destination.as_os_str());

        let mut command = Command::new(&self.program);
        command
            .arg("x")
            .arg(&request.source)
            .arg(output_flag)
            .arg("-bsp1")
            .stdin(Stdio::piped());
        detach_from_terminal(&mut command);
        command
    }
}

impl Archiver for SevenZip {
    fn program(&self) -> String {
        self.program.display().to_string()
    }

    fn spawn(&self, request: &ExtractionRequest) -> Result<ArchiverChild, ExtractError> {
        let (output, writer) = io::pipe().map_err(|e| ExtractError::Pipe(e.to_string()))?;
        let error_writer = writer.try_clone().map_err(|e| ExtractError::Pipe(e.to_string()))?;

        let mut command = self.command(request);
        command.stdout(writer).stderr(error_writer);
        debug!("Full command: {:?}", command);

        let spawned = command.spawn();
        // The parent's copies of the write end must close or the reader never sees EOF.
        drop(command);
        let mut child = spawned.map_err(|e| ExtractError::Spawn {
            program: self.program(),
            reason: match e.kind() {
                io::ErrorKind::NotFound => "program not found".to_string(),
                _ => e.to_string(),
            },
        })?;

        let Some(stdin) = child.stdin.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ExtractError::Pipe("archiver stdin was not captured".to_string()));
        };

        Ok(ArchiverChild {
            outputs: vec![Box::new(output)],
            input: Box::new(stdin),
            process: Box::new(child),
        })
    }
}

#[cfg(unix)]
fn detach_from_terminal(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    // SAFETY: only setsid runs between fork and exec, and it is async-signal-safe.
    unsafe {
        command.pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        });
    }
}

#[cfg(not(unix))]
fn detach_from_terminal(_command: &mut Command) {}

/// Resolution order: explicit path, `bin/7z` beside the executable, a 7z
/// alias on `PATH`, then `./7z`.
pub fn locate_archiver(configured: Option<&Path>) -> PathBuf {
    if let Some(path) = configured {
        return path.to_path_buf();
    }
    if let Some(bundled) = bundled_archiver() {
        debug!("Using bundled archiver {}", bundled.display());
        return bundled;
    }
    for alias in ARCHIVER_ALIASES {
        if let Ok(path) = which::which(alias) {
            debug!("Found {} on PATH at {}", alias, path.display());
            return path;
        }
    }
    Path::new(".").join(DEFAULT_ARCHIVER)
}

fn bundled_archiver() -> Option<PathBuf> {
    let exe = env::current_exe().ok()?;
    let path = exe
        .parent()?
        .join("bin")
        .join(format!("{}{}", DEFAULT_ARCHIVER, env::consts::EXE_SUFFIX));
    path.is_file().then_some(path)
}
