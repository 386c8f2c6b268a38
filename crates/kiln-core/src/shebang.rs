//! Shebang detection for scripts the in-process runtime can load.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::runtime::ScriptRuntime;

/// Matches a file's first bytes against known interpreter lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShebangSniffer {
    patterns: Vec<Vec<u8>>,
}

impl ShebangSniffer {
    /// Sniffer with an explicit pattern list. Each pattern includes its
    /// trailing newline.
    pub fn new(patterns: Vec<Vec<u8>>) -> Self {
        Self { patterns }
    }

    /// Patterns for a script runtime:
    ///
    /// ```text
    /// #!/usr/bin/env <name>\n
    /// #!/usr/bin/env -S <name>\n
    /// #!<interpreter path>\n
    /// ```
    pub fn for_runtime(runtime: &dyn ScriptRuntime) -> Self {
        let mut patterns: Vec<Vec<u8>> = runtime
            .names()
            .iter()
            .flat_map(|name| {
                [
                    format!("#!/usr/bin/env {name}\n").into_bytes(),
                    format!("#!/usr/bin/env -S {name}\n").into_bytes(),
                ]
            })
            .collect();

        if let Some(path) = runtime.interpreter_path() {
            patterns.push(format!("#!{}\n", path.display()).into_bytes());
        }

        Self::new(patterns)
    }

    pub fn patterns(&self) -> &[Vec<u8>] {
        &self.patterns
    }

    /// Number of bytes read from a file when sniffing it.
    pub fn probe_len(&self) -> usize {
        self.patterns.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Whether the file at `path` starts with one of the known patterns.
    ///
    /// Unreadable files never match.
    pub fn matches(&self, path: &Path) -> bool {
        match self.read_prefix(path) {
            Ok(prefix) => self
                .patterns
                .iter()
                .any(|pattern| prefix.starts_with(pattern)),
            Err(e) => {
                tracing::debug!("Cannot sniff {}: {}", path.display(), e);
                false
            }
        }
    }

    fn read_prefix(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        let file = File::open(path)?;
        let mut prefix = Vec::with_capacity(self.probe_len());
        file.take(self.probe_len() as u64).read_to_end(&mut prefix)?;
        Ok(prefix)
    }
}
