/* 📖 # How are exclusion rules matched?

This is a lightweight reading of `.gitignore`, covering the idioms repositories
actually use:
- blank lines and `#` comments are skipped
- `!pattern` re-includes what an earlier rule excluded
- `pattern/` only applies to directories
- `/pattern` is anchored to the repository root
- patterns without `/` match the base name; patterns with `/` may start at any
  segment boundary
- `*`, `?` and `[...]` are globs where `*` never crosses `/`; `**` is just `*` and
  braces are literal characters

Rules are checked in file order and the last matching rule decides. Excluding a
directory stops the walk from descending, so `vendor/` drops everything below any
`vendor` directory. Patterns that fail to compile as globs compare by plain equality.
*/

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use tracing::{debug, instrument, warn};

use todoscan_base::FilePath;

/// File holding the exclusion rules, looked up at the repository root.
pub const IGNORE_FILE_NAME: &str = ".gitignore";

/// A single parsed exclusion rule.
#[derive(Debug, Clone)]
pub struct IgnoreRule {
    pattern: String,
    negative: bool,
    anchored: bool,
    directory_only: bool,
    has_separator: bool,
    // None when the pattern is not a valid glob
    matcher: Option<GlobMatcher>,
}

impl IgnoreRule {
    /// Parse one line of an exclusion file. Returns `None` for lines that carry no rule.
    pub fn parse(line: &str) -> Option<IgnoreRule> {
        let mut line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let negative = match line.strip_prefix('!') {
            Some(rest) => {
                line = rest.trim();
                if line.is_empty() {
                    return None;
                }
                true
            }
            None => false,
        };
        let directory_only = match line.strip_suffix('/') {
            Some(rest) => {
                line = rest;
                true
            }
            None => false,
        };
        let anchored = match line.strip_prefix('/') {
            Some(rest) => {
                line = rest;
                true
            }
            None => false,
        };
        if line.is_empty() {
            return None;
        }

        let pattern = line.to_string();
        Some(IgnoreRule {
            matcher: compile_glob(&pattern),
            has_separator: pattern.contains('/'),
            pattern,
            negative,
            anchored,
            directory_only,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    pub fn is_directory_only(&self) -> bool {
        self.directory_only
    }

    pub fn has_separator(&self) -> bool {
        self.has_separator
    }

    /// Whether this rule applies to `rel`, a forward-slash path relative to the
    /// repository root.
    pub fn matches(&self, rel: &str, is_dir: bool) -> bool {
        if self.directory_only && !is_dir {
            return false;
        }
        if self.anchored {
            return self.glob_matches(rel);
        }
        if !self.has_separator {
            let base = base_name(rel);
            return self.glob_matches(base) || (is_dir && self.pattern == base);
        }
        self.glob_matches(rel)
            || rel
                .match_indices('/')
                .any(|(i, _)| i + 1 < rel.len() && self.glob_matches(&rel[i + 1..]))
    }

    fn glob_matches(&self, candidate: &str) -> bool {
        match &self.matcher {
            Some(matcher) => matcher.is_match(candidate),
            None => self.pattern == candidate,
        }
    }
}

fn compile_glob(pattern: &str) -> Option<GlobMatcher> {
    match GlobBuilder::new(&plain_glob(pattern))
        .literal_separator(true)
        .backslash_escape(true)
        .build()
    {
        Ok(glob) => Some(glob.compile_matcher()),
        Err(e) => {
            debug!(pattern, error = %e, "invalid glob, falling back to literal comparison");
            None
        }
    }
}

// globset reads `**` as "any number of directories" and `{a,b}` as alternatives.
// Neither is part of the rule dialect: runs of `*` collapse to one and braces are
// escaped so they match literally.
fn plain_glob(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    let mut in_class = false;
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push(c);
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            '[' if !in_class => {
                in_class = true;
                out.push(c);
                if let Some(negation) = chars.next_if(|&next| next == '!' || next == '^') {
                    out.push(negation);
                }
                // A leading `]` is a member of the class, not its end
                if chars.next_if_eq(&']').is_some() {
                    out.push(']');
                }
            }
            ']' if in_class => {
                in_class = false;
                out.push(c);
            }
            '*' if !in_class => {
                out.push(c);
                while chars.next_if_eq(&'*').is_some() {}
            }
            '{' | '}' if !in_class => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

fn base_name(rel: &str) -> &str {
    rel.rsplit('/').next().unwrap_or(rel)
}

/// The ordered exclusion rules of one repository.
#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
    root: PathBuf,
    rules: Vec<IgnoreRule>,
}

impl IgnoreSet {
    /// A rule set that excludes nothing.
    pub fn empty(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            rules: Vec::new(),
        }
    }

    /// Parse rules from the text of an exclusion file.
    pub fn parse(root: impl Into<PathBuf>, contents: &str) -> Self {
        Self {
            root: root.into(),
            rules: contents.lines().filter_map(IgnoreRule::parse).collect(),
        }
    }

    /// Parse rules from a line-oriented reader.
    pub fn from_reader(root: impl Into<PathBuf>, reader: impl BufRead) -> io::Result<Self> {
        let mut rules = Vec::new();
        for line in reader.lines() {
            rules.extend(IgnoreRule::parse(&line?));
        }
        Ok(Self {
            root: root.into(),
            rules,
        })
    }

    /// Load `<repo_root>/.gitignore`.
    ///
    /// A missing file means no rules. An unreadable file is logged and also treated
    /// as having no rules, since exclusion rules are never a reason to fail a scan.
    #[instrument(level = "debug", fields(repo_root = %repo_root.display()))]
    pub fn load(repo_root: &Path) -> Self {
        let path = repo_root.join(IGNORE_FILE_NAME);
        let file = match std::fs::File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("no exclusion file present");
                return Self::empty(repo_root);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot open exclusion file, ignoring it");
                return Self::empty(repo_root);
            }
        };
        match Self::from_reader(repo_root, io::BufReader::new(file)) {
            Ok(set) => {
                debug!(rules = set.len(), "loaded exclusion rules");
                set
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read exclusion file, ignoring it");
                Self::empty(repo_root)
            }
        }
    }

    /// The repository root rules are anchored to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn rules(&self) -> &[IgnoreRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Whether `rel`, a forward-slash path relative to [`IgnoreSet::root`], is excluded.
    pub fn is_excluded(&self, rel: &str, is_dir: bool) -> bool {
        let mut excluded = false;
        for rule in &self.rules {
            if rule.matches(rel, is_dir) {
                excluded = !rule.negative;
            }
        }
        excluded
    }

    /// Like [`IgnoreSet::is_excluded`] for a native path below the root.
    ///
    /// The root itself is checked as `.`. Paths outside the root are never excluded.
    pub fn is_excluded_path(&self, path: &Path, is_dir: bool) -> bool {
        if self.rules.is_empty() {
            return false;
        }
        match path.strip_prefix(&self.root) {
            Ok(rel) if rel.as_os_str().is_empty() => self.is_excluded(".", is_dir),
            Ok(rel) => self.is_excluded(FilePath::from(rel).as_str(), is_dir),
            Err(_) => false,
        }
    }
}
