#![allow(dead_code)]

use std::{fs, path::Path};

use tempfile::{TempDir, tempdir};

pub const START_MARKER: &str = "=== START OF APPLICATION AT ";
pub const END_MARKER: &str = "=== END OF APPLICATION AT ";

/// Scratch directory holding a `config.ini` with the given contents.
pub fn workspace(config: &str) -> TempDir {
    let temp = tempdir().expect("failed to create tempdir");
    fs::write(temp.path().join("config.ini"), config).expect("failed to write config");
    temp
}

pub fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap_or_else(|err| panic!("failed to read {:?}: {err}", path))
        .lines()
        .map(str::to_string)
        .collect()
}

pub fn count_containing(lines: &[String], needle: &str) -> usize {
    lines.iter().filter(|line| line.contains(needle)).count()
}

pub fn position_of(lines: &[String], needle: &str) -> Option<usize> {
    lines.iter().position(|line| line.contains(needle))
}

/// Parses the `H:MM:SS.ffffff` duration out of an END marker line.
pub fn end_marker_seconds(line: &str) -> f64 {
    let open = line.rfind('(').expect("END marker has a duration");
    let close = line.rfind(')').expect("END marker has a duration");
    let mut parts = line[open + 1..close].split(':');
    let hours: f64 = parts.next().unwrap().parse().unwrap();
    let minutes: f64 = parts.next().unwrap().parse().unwrap();
    let seconds: f64 = parts.next().unwrap().parse().unwrap();
    hours * 3600.0 + minutes * 60.0 + seconds
}
