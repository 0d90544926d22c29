//! Dockerfile dependency extraction.
//!
//! Dependencies are the files `COPY` and `ADD` pull from the build
//! workspace, plus the Dockerfile itself. Paths are workspace-relative with
//! `/` separators, deduplicated in first-seen order.

use deploylint_core::utils;
use deploylint_core::{DependencyExtractor, ExtractionError};
use glob::{MatchOptions, Pattern};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

const DOCKERIGNORE: &str = ".dockerignore";

/// Reads Dockerfiles from disk and resolves their copied sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct DockerfileExtractor;

impl DockerfileExtractor {
    /// Creates an extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl DependencyExtractor for DockerfileExtractor {
    fn dependencies(&self, workspace: &Path, dockerfile: &Path) -> Result<Vec<String>, ExtractionError> {
        let text = std::fs::read_to_string(dockerfile)
            .map_err(|e| ExtractionError::new(dockerfile, e.to_string()))?;
        let ignore =
            IgnoreList::load(workspace).map_err(|message| ExtractionError::new(dockerfile, message))?;

        let mut seen = HashSet::new();
        let mut deps = vec![relative(workspace, dockerfile)];
        seen.insert(deps[0].clone());

        for source in copy_sources(&text) {
            if utils::is_url(&source) {
                info!("Skipping remote source {} in {}", source, dockerfile.display());
                continue;
            }
            let paths =
                expand(workspace, &source).map_err(|message| ExtractionError::new(dockerfile, message))?;
            for path in paths {
                let rel = relative(workspace, &path);
                if ignore.excludes(&rel) {
                    debug!("Ignoring {} per {}", rel, DOCKERIGNORE);
                    continue;
                }
                if seen.insert(rel.clone()) {
                    deps.push(rel);
                }
            }
        }
        Ok(deps)
    }
}

/// Sources of every local `COPY`/`ADD`, with build args expanded.
fn copy_sources(text: &str) -> Vec<String> {
    let mut args = HashMap::new();
    let mut sources = Vec::new();
    for line in logical_lines(text) {
        let Some((instruction, rest)) = line.split_once(char::is_whitespace) else {
            continue;
        };
        match instruction.to_ascii_uppercase().as_str() {
            "ARG" => {
                for decl in rest.split_whitespace() {
                    if let Some((name, value)) = decl.split_once('=') {
                        args.insert(name.to_string(), unquote(value).to_string());
                    }
                }
            }
            "COPY" | "ADD" => {
                if let Some(srcs) = copy_args(rest) {
                    sources.extend(
                        srcs.iter()
                            .filter(|s| !s.starts_with("<<"))
                            .map(|s| expand_args(s, &args)),
                    );
                }
            }
            _ => {}
        }
    }
    sources
}

/// Joins `\` continuations and drops comments and blank lines.
fn logical_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for raw in text.lines() {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some(body) = trimmed.strip_suffix('\\') {
            current.push_str(body);
            current.push(' ');
            continue;
        }
        current.push_str(trimmed);
        lines.push(current.trim().to_string());
        current.clear();
    }
    if !current.trim().is_empty() {
        lines.push(current.trim().to_string());
    }
    lines
}

/// Source arguments of a `COPY`/`ADD`; `None` for copies from another stage.
fn copy_args(rest: &str) -> Option<Vec<String>> {
    let mut rest = rest.trim_start();
    while let Some(flag) = rest.strip_prefix("--") {
        let (name, tail) = flag.split_once(char::is_whitespace).unwrap_or((flag, ""));
        if name.starts_with("from") {
            return None;
        }
        rest = tail.trim_start();
    }

    let mut parts: Vec<String> = if rest.starts_with('[') {
        serde_json::from_str(rest)
            .unwrap_or_else(|_| rest.split_whitespace().map(String::from).collect())
    } else {
        rest.split_whitespace().map(String::from).collect()
    };
    parts.pop()?;
    Some(parts)
}

/// Expands `$name`, `${name}` and `${name:-default}`; unknown args expand to nothing.
fn expand_args(value: &str, args: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let (expr, consumed) = match after.strip_prefix('{') {
            Some(braced) => match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            },
            None => {
                let end = after
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .unwrap_or(after.len());
                (&after[..end], end)
            }
        };
        if expr.is_empty() {
            out.push('$');
            rest = after;
            continue;
        }

        let (name, default) = expr.split_once(":-").unwrap_or((expr, ""));
        match args.get(name) {
            Some(v) if !v.is_empty() => out.push_str(v),
            _ => out.push_str(default),
        }
        rest = &after[consumed..];
    }
    out.push_str(rest);
    out
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Files a source resolves to; directories are walked recursively.
fn expand(workspace: &Path, source: &str) -> Result<Vec<PathBuf>, String> {
    let path = utils::normalize(&workspace.join(source));
    let matches: Vec<PathBuf> = if source.contains(['*', '?', '[']) {
        glob::glob(&utils::to_slash(&path))
            .map_err(|e| format!("invalid source pattern `{source}`: {e}"))?
            .flatten()
            .collect()
    } else if path.exists() {
        vec![path]
    } else {
        Vec::new()
    };
    if matches.is_empty() {
        return Err(format!(
            "source `{source}` matches no file in {}",
            workspace.display()
        ));
    }

    let mut files = Vec::new();
    for path in matches {
        if path.is_dir() {
            files.extend(
                WalkDir::new(&path)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_map(Result::ok)
                    .filter(|e| e.file_type().is_file())
                    .map(walkdir::DirEntry::into_path),
            );
        } else {
            files.push(path);
        }
    }
    Ok(files)
}

fn relative(workspace: &Path, path: &Path) -> String {
    path.strip_prefix(workspace)
        .map_or_else(|_| utils::to_slash(path), utils::to_slash)
}

/// Patterns of a workspace's `.dockerignore`; the last matching line wins.
#[derive(Debug, Default)]
struct IgnoreList {
    patterns: Vec<(Pattern, bool)>,
}

impl IgnoreList {
    fn load(workspace: &Path) -> Result<Self, String> {
        let path = workspace.join(DOCKERIGNORE);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(format!("failed to read {}: {e}", path.display())),
        };
        let mut patterns = Vec::new();
        for line in text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
        {
            let (negated, raw) = match line.strip_prefix('!') {
                Some(r) => (true, r.trim()),
                None => (false, line),
            };
            let raw = raw.trim_start_matches("./").trim_matches('/');
            let pattern = Pattern::new(raw)
                .map_err(|e| format!("invalid {DOCKERIGNORE} pattern `{raw}`: {e}"))?;
            patterns.push((pattern, negated));
        }
        Ok(Self { patterns })
    }

    fn excludes(&self, rel: &str) -> bool {
        let options = MatchOptions {
            require_literal_separator: true,
            ..MatchOptions::new()
        };
        let mut excluded = false;
        for (pattern, negated) in &self.patterns {
            // A match on any parent directory covers everything beneath it.
            let mut candidate = rel;
            loop {
                if pattern.matches_with(candidate, options) {
                    excluded = !negated;
                    break;
                }
                match candidate.rfind('/') {
                    Some(i) => candidate = &candidate[..i],
                    None => break,
                }
            }
        }
        excluded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn workspace(files: &[(&str, &str)]) -> TempDir {
        let tmp = TempDir::new().unwrap();
        for (rel, text) in files {
            let path = tmp.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, text).unwrap();
        }
        tmp
    }

    fn deps(tmp: &TempDir) -> Result<Vec<String>, ExtractionError> {
        DockerfileExtractor::new().dependencies(tmp.path(), &tmp.path().join("Dockerfile"))
    }

    #[test]
    fn copies_files_and_directories() {
        let tmp = workspace(&[
            (
                "Dockerfile",
                "FROM python:3.12\n\
                 ARG APP=src\n\
                 # COPY secret.txt .\n\
                 COPY requirements.txt ./\n\
                 COPY ${APP}/ /app/\n\
                 COPY --from=builder /out /bin\n\
                 ADD https://example.com/x.tar.gz /tmp/\n",
            ),
            ("requirements.txt", ""),
            ("secret.txt", ""),
            ("src/main.py", ""),
            ("src/util/helpers.py", ""),
        ]);
        assert_eq!(
            deps(&tmp).unwrap(),
            [
                "Dockerfile",
                "requirements.txt",
                "src/main.py",
                "src/util/helpers.py"
            ]
        );
    }

    #[test]
    fn json_form_continuations_and_globs() {
        let tmp = workspace(&[
            (
                "Dockerfile",
                "FROM x\nCOPY [\"a.py\", \"b.py\", \"/app/\"]\ncopy --chown=1000 \\\n  *.txt \\\n  /app/\n",
            ),
            ("a.py", ""),
            ("b.py", ""),
            ("y.txt", ""),
            ("x.txt", ""),
        ]);
        assert_eq!(
            deps(&tmp).unwrap(),
            ["Dockerfile", "a.py", "b.py", "x.txt", "y.txt"]
        );
    }

    #[test]
    fn dockerignore_excludes_matches() {
        let tmp = workspace(&[
            ("Dockerfile", "FROM x\nCOPY . /app\n"),
            (".dockerignore", "*.pyc\nsecrets/\n"),
            ("app.py", ""),
            ("app.pyc", ""),
            ("secrets/key", ""),
        ]);
        assert_eq!(
            deps(&tmp).unwrap(),
            ["Dockerfile", ".dockerignore", "app.py"]
        );
    }

    #[test]
    fn unreadable_dockerignore_is_an_error() {
        let tmp = workspace(&[("Dockerfile", "FROM x\n"), (".dockerignore/nested", "")]);
        let err = deps(&tmp).unwrap_err();
        assert!(err.message.contains(DOCKERIGNORE));
    }

    #[test]
    fn missing_source_is_an_error() {
        let tmp = workspace(&[("Dockerfile", "FROM x\nCOPY missing.py /app/\n")]);
        let err = deps(&tmp).unwrap_err();
        assert!(err.message.contains("missing.py"));
    }

    #[test]
    fn missing_dockerfile_is_an_error() {
        let tmp = TempDir::new().unwrap();
        assert!(deps(&tmp).is_err());
    }

    #[test]
    fn build_arg_expansion() {
        let args = HashMap::from([("APP".to_string(), "web".to_string())]);
        assert_eq!(expand_args("$APP/main.py", &args), "web/main.py");
        assert_eq!(expand_args("${APP}-x", &args), "web-x");
        assert_eq!(expand_args("${OTHER:-lib}/a", &args), "lib/a");
        assert_eq!(expand_args("cost$", &args), "cost$");
    }
}
