//! Runs external programs and captures their merged output.
use std::{
    backtrace::Backtrace,
    ffi::OsStr,
    io::{self, Read},
    process::{Command, Stdio},
};

use tracing::{debug, error};

use crate::error::CommandError;

/// Runs `argv` without a shell and returns its merged stdout/stderr.
///
/// The first element is looked up on the search path and the rest are passed
/// verbatim. Stdin is closed. The output is decoded as UTF-8 with trailing
/// whitespace removed. Every failure is logged at ERROR level before being
/// returned.
pub fn run_command<S: AsRef<OsStr>>(argv: &[S]) -> Result<String, CommandError> {
    let result = execute(argv);
    if let Err(err) = &result {
        let backtrace = Backtrace::force_capture();
        error!("{err}\n{backtrace}");
    }
    result
}

/// Renders an argument vector the way it is shown in log lines.
pub fn display_command<S: AsRef<OsStr>>(argv: &[S]) -> String {
    argv.iter()
        .map(|arg| arg.as_ref().to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

fn execute<S: AsRef<OsStr>>(argv: &[S]) -> Result<String, CommandError> {
    let (program, args) = argv.split_first().ok_or(CommandError::EmptyCommand)?;
    let program_name = program.as_ref().to_string_lossy().into_owned();
    let rendered = display_command(argv);
    let io_error = |source: io::Error| CommandError::Io {
        program: program_name.clone(),
        source,
    };

    debug!("Start subprocess \"{rendered}\"");
    let (mut reader, writer) = io::pipe().map_err(io_error)?;

    // The command holds the parent's copies of the write end; it must be
    // dropped before reading or the pipe never reports EOF.
    let mut child = {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(writer.try_clone().map_err(io_error)?)
            .stderr(writer);
        cmd.spawn().map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => CommandError::NotFound {
                program: program_name.clone(),
            },
            _ => CommandError::Spawn {
                program: program_name.clone(),
                source,
            },
        })?
    };

    let mut raw = Vec::new();
    reader.read_to_end(&mut raw).map_err(io_error)?;
    let status = child.wait().map_err(io_error)?;
    debug!("Finished subprocess \"{rendered}\"");

    let output = String::from_utf8(raw)
        .map_err(|source| CommandError::Decode {
            program: program_name.clone(),
            source,
        })?
        .trim_end()
        .to_string();
    debug!("[output] {output}");

    if !status.success() {
        return Err(CommandError::Execution {
            code: status.code(),
            output,
        });
    }

    Ok(output)
}
