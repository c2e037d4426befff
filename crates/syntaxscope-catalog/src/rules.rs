//! Heuristic pattern tables used by the classifier and the tag extractor.
//!
//! A table is an ordered list of `label -> patterns`. Order matters: the
//! classifier breaks score ties in favour of the label declared first.
//! Patterns are regular expressions compiled case-insensitively; word
//! patterns use `\b` anchors, free-text patterns are plain substrings.
//!
//! Tables are built once (either the built-in ones or a JSON rules file) and
//! passed by reference, so classification stays a pure function of
//! `(text, table)`.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Built-in category table, in tie-break order.
pub const CATEGORY_PATTERNS: &[(&str, &[&str])] = &[
    (
        "file-management",
        &[
            r"\bcp\b", r"\bmv\b", r"\brm\b", r"\bls\b", r"\bfind\b", r"\bgrep\b",
            r"\bchmod\b", r"\bchown\b", r"\btouch\b", r"\bmkdir\b", r"\brmdir\b",
            r"file", r"directory", r"folder", r"path",
        ],
    ),
    (
        "system-admin",
        &[
            r"\bsystemctl\b", r"\bservice\b", r"\bchroot\b", r"\bdmesg\b",
            r"\bsudo\b", r"\bsu\b", r"\bcrontab\b", r"\bapt\b", r"\bpacman\b",
            r"\byum\b", r"\bdnf\b", r"\bbrew\b", r"install", r"update", r"system",
        ],
    ),
    (
        "network",
        &[
            r"\bcurl\b", r"\bwget\b", r"\bping\b", r"\bssh\b", r"\bscp\b",
            r"\brsync\b", r"\btelnet\b", r"\bnetstat\b", r"\bifconfig\b",
            r"\bcertbot\b", r"\bnslookup\b", r"\bdig\b", r"network", r"http",
        ],
    ),
    (
        "development",
        &[
            r"\bgit\b", r"\bnpm\b", r"\bpip\b", r"\bcargo\b", r"\bmake\b",
            r"\bpython\b", r"\bnode\b", r"\bgcc\b", r"\bclang\b", r"\bjava\b",
            r"compile", r"build", r"code",
        ],
    ),
    (
        "database",
        &[
            r"\bmysql\b", r"\bpsql\b", r"\bmongo\b", r"\bredis\b", r"\bsqlite\b",
            r"database", r"query", r"sql",
        ],
    ),
    (
        "text-processing",
        &[
            r"\bcat\b", r"\bgrep\b", r"\bsed\b", r"\bawk\b", r"\bcut\b",
            r"\bsort\b", r"\buniq\b", r"\bwc\b", r"\btr\b", r"\btail\b", r"\bhead\b",
            r"text", r"string", r"replace",
        ],
    ),
    (
        "monitoring",
        &[
            r"\btop\b", r"\bhtop\b", r"\bps\b", r"\bfree\b", r"\bdf\b",
            r"\bdu\b", r"\blsof\b", r"monitor", r"stats", r"usage", r"process",
        ],
    ),
    (
        "containers",
        &[
            r"\bdocker\b", r"\bpodman\b", r"\bkubectl\b", r"\bhelm\b",
            r"container", r"image", r"kubernetes", r"k8s",
        ],
    ),
    (
        "security",
        &[
            r"\bopenssl\b", r"\bssh-keygen\b", r"\bgpg\b", r"\bcertbot\b",
            r"\bfirewall\b", r"\bufw\b", r"\biptables\b", r"security",
            r"encrypt", r"password", r"firewall",
        ],
    ),
    (
        "shell",
        &[
            r"\balias\b", r"\becho\b", r"\benv\b", r"\bexport\b", r"\bset\b",
            r"\bshopt\b", r"\bbash\b", r"\bzsh\b", r"\bsh\b", r"variable",
            r"environment", r"shell",
        ],
    ),
];

/// Built-in tag table.
pub const TAG_PATTERNS: &[(&str, &[&str])] = &[
    ("file", &[r"file", r"files", r"folder", r"directory", r"path"]),
    ("search", &[r"search", r"find", r"locate", r"grep"]),
    ("network", &[r"network", r"http", r"url", r"web", r"ping", r"connect"]),
    ("install", &[r"install", r"update", r"upgrade", r"package"]),
    ("git", &[r"git", r"commit", r"branch", r"merge", r"repository"]),
    ("docker", &[r"docker", r"container", r"image", r"volume"]),
    ("user", &[r"user", r"permission", r"group", r"access"]),
    ("process", &[r"process", r"kill", r"job", r"background"]),
    ("archive", &[r"compress", r"extract", r"zip", r"tar", r"archive"]),
    ("text", &[r"text", r"string", r"pattern", r"replace", r"format"]),
];

#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("invalid pattern `{pattern}` for `{label}`: {message}")]
    InvalidPattern {
        label: String,
        pattern: String,
        message: String,
    },
    #[error("failed to read rules file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse rules file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("rules file defines no {0}")]
    EmptyTable(&'static str),
}

/// A compiled, case-insensitive match pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub fn new(label: &str, source: &str) -> Result<Self, RulesError> {
        let regex = RegexBuilder::new(source)
            .case_insensitive(true)
            .build()
            .map_err(|e| RulesError::InvalidPattern {
                label: label.to_string(),
                pattern: source.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Ordered `label -> patterns` table.
#[derive(Debug, Clone, Default)]
pub struct PatternTable {
    entries: Vec<(String, Vec<Pattern>)>,
}

impl PatternTable {
    /// Compile a table from pattern sources. Identical sources under one label
    /// are kept once, so every pattern counts at most once towards a score.
    pub fn compile<L, P, S>(entries: L) -> Result<Self, RulesError>
    where
        L: IntoIterator<Item = (S, P)>,
        P: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = Vec::new();
        for (label, sources) in entries {
            let label = label.as_ref().to_string();
            let mut patterns: Vec<Pattern> = Vec::new();
            for source in sources {
                let source = source.as_ref();
                if patterns.iter().any(|p| p.as_str() == source) {
                    continue;
                }
                patterns.push(Pattern::new(&label, source)?);
            }
            table.push((label, patterns));
        }
        Ok(Self { entries: table })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Pattern])> {
        self.entries
            .iter()
            .map(|(label, patterns)| (label.as_str(), patterns.as_slice()))
    }

    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|(label, _)| label.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Serialized form of a rules file.
///
/// ```json
/// {
///   "categories": [{ "label": "network", "patterns": ["\\bcurl\\b", "http"] }],
///   "tags": [{ "label": "search", "patterns": ["grep", "find"] }]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesFile {
    pub categories: Vec<RuleEntry>,
    pub tags: Vec<RuleEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleEntry {
    pub label: String,
    pub patterns: Vec<String>,
}

/// The category and tag tables used for one pipeline run.
#[derive(Debug, Clone)]
pub struct Rules {
    pub categories: PatternTable,
    pub tags: PatternTable,
}

impl Rules {
    pub fn builtin() -> Result<Self, RulesError> {
        Ok(Self {
            categories: PatternTable::compile(
                CATEGORY_PATTERNS
                    .iter()
                    .map(|(label, patterns)| (*label, patterns.iter().copied())),
            )?,
            tags: PatternTable::compile(
                TAG_PATTERNS
                    .iter()
                    .map(|(label, patterns)| (*label, patterns.iter().copied())),
            )?,
        })
    }

    pub fn from_rules_file(file: &RulesFile) -> Result<Self, RulesError> {
        if file.categories.is_empty() {
            return Err(RulesError::EmptyTable("categories"));
        }
        let compile = |entries: &[RuleEntry]| {
            PatternTable::compile(
                entries
                    .iter()
                    .map(|e| (e.label.as_str(), e.patterns.iter().map(String::as_str))),
            )
        };
        Ok(Self {
            categories: compile(&file.categories)?,
            tags: compile(&file.tags)?,
        })
    }

    pub fn load(path: &Path) -> Result<Self, RulesError> {
        let text = std::fs::read_to_string(path).map_err(|source| RulesError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: RulesFile = serde_json::from_str(&text).map_err(|source| RulesError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_rules_file(&file)
    }

    /// Rules from `path` when given, otherwise the built-in tables.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self, RulesError> {
        match path {
            Some(path) => {
                let rules = Self::load(path)?;
                tracing::info!(
                    path = %path.display(),
                    categories = rules.categories.len(),
                    tags = rules.tags.len(),
                    "loaded rules file"
                );
                Ok(rules)
            }
            None => Self::builtin(),
        }
    }
}
