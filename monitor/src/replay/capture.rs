use anyhow::Context;
use seisfeed::connection::ScriptedFrame;
use std::fs;
use std::path::Path;

/// Reads a JSON-lines capture of feed frames. Blank lines and lines starting
/// with `#` are skipped.
pub fn load_capture<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<ScriptedFrame>> {
    let path_ref = path.as_ref();
    let contents = fs::read_to_string(path_ref)
        .with_context(|| format!("reading capture {}", path_ref.display()))?;
    Ok(parse_capture(&contents))
}

pub fn parse_capture(contents: &str) -> Vec<ScriptedFrame> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ScriptedFrame::text)
        .collect()
}
