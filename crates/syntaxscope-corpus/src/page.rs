//! tldr-pages markdown parsing.
//!
//! A page looks like:
//!
//! ```text
//! # tar
//!
//! > Archiving utility.
//! > More information: <https://www.gnu.org/software/tar>.
//!
//! - Create an archive from files:
//!
//! `tar cf {{target.tar}} {{file1 file2}}`
//! ```
//!
//! The command name is the file stem. The language is derived from the
//! platform directory below `pages/`.

use crate::{detect_shell, CorpusError};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::path::{Component, Path};
use syntaxscope_catalog::{assign_id, namespace_key, Example, RawEntry, Source};

pub const TLDR_SOURCE_NAME: &str = "tldr-pages";
pub const TLDR_LICENSE: &str = "MIT";
pub const TLDR_BLOB_BASE: &str = "https://github.com/tldr-pages/tldr/blob/main/pages";

/// Map a tldr platform directory to the shell namespace used for ids.
pub fn map_platform(platform: &str) -> String {
    match platform {
        "common" | "linux" | "osx" | "sunos" | "android" => "bash".to_string(),
        "windows" => "powershell".to_string(),
        other => other.to_string(),
    }
}

/// The directory right below the nearest `pages` component, if any.
pub fn platform_for_path(path: &Path) -> Option<String> {
    let parts: Vec<&str> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect();
    let idx = parts.iter().rposition(|p| *p == "pages")?;
    // The component after `pages` must be a directory, not the page itself.
    if idx + 2 < parts.len() {
        Some(parts[idx + 1].to_string())
    } else {
        None
    }
}

#[derive(Debug)]
pub struct PageParser {
    title: Regex,
    description: Regex,
    example: Regex,
    whitespace: Regex,
}

impl PageParser {
    pub fn new() -> Result<Self, CorpusError> {
        let compile = |re: &str| Regex::new(re).map_err(|e| CorpusError::Pattern(e.to_string()));
        Ok(Self {
            title: compile(r"(?m)^# (.*?)\s*$")?,
            description: compile(r"(?ms)^# [^\n]*\n+> (.*?)(?:\n>|\n\n)")?,
            example: compile(r"(?m)^- (.+?):\s*\n\s*`(.+)`\s*$")?,
            whitespace: compile(r"\s+")?,
        })
    }

    fn collapse(&self, text: &str) -> String {
        self.whitespace.replace_all(text.trim(), " ").into_owned()
    }

    /// Parse a page file into a raw entry.
    pub fn parse_page(&self, path: &Path, now: DateTime<Utc>) -> Result<RawEntry, CorpusError> {
        let text = std::fs::read_to_string(path).map_err(|source| CorpusError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let command = path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CorpusError::InvalidPage {
                path: path.to_path_buf(),
                reason: "file name is not a command".to_string(),
            })?;
        let platform = platform_for_path(path);
        self.parse_page_text(&text, command, platform.as_deref(), now)
            .map_err(|reason| CorpusError::InvalidPage {
                path: path.to_path_buf(),
                reason,
            })
    }

    /// Parse page `text` for `command`. `platform` is the tldr platform
    /// directory; without one the shell is guessed from the command.
    pub fn parse_page_text(
        &self,
        text: &str,
        command: &str,
        platform: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<RawEntry, String> {
        let mut text = text.replace("\r\n", "\n");
        text.push_str("\n\n");

        let title = self
            .title
            .captures(&text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| "missing `# title` line".to_string())?;

        let description = self
            .description
            .captures(&text)
            .and_then(|c| c.get(1))
            .map(|m| self.collapse(m.as_str()))
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| title.clone());

        let examples: Vec<Example> = self
            .example
            .captures_iter(&text)
            .map(|c| Example {
                code: c[2].trim().to_string(),
                description: self.collapse(&c[1]),
            })
            .collect();

        let language = match platform {
            Some(p) => map_platform(p),
            None => detect_shell(command).to_string(),
        };
        let url = format!(
            "{TLDR_BLOB_BASE}/{}/{command}.md",
            platform.unwrap_or(language.as_str())
        );

        Ok(RawEntry {
            id: Some(assign_id(&namespace_key(&language, command))),
            command: command.to_string(),
            description,
            title: Some(title),
            category: Some(detect_shell(command).to_string()),
            language: Some(language),
            tags: Vec::new(),
            examples,
            explanation: None,
            source: Some(Source {
                name: TLDR_SOURCE_NAME.to_string(),
                url,
                license: TLDR_LICENSE.to_string(),
            }),
            created_at: Some(now),
            updated_at: Some(now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const TAR: &str = "# tar

> Archiving utility.
> Often combined with a compression method, such as `gzip` or `bzip2`.
> More information: <https://www.gnu.org/software/tar>.

- [c]reate an archive and write it to a [f]ile:

`tar cf {{path/to/target.tar}} {{path/to/file1 path/to/file2 ...}}`

- E[x]tract a (compressed) archive [f]ile into the current directory [v]erbosely:

`tar xvf {{path/to/source.tar[.gz|.bz2|.xz]}}`
";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn parses_title_description_and_examples() {
        let parser = PageParser::new().unwrap();
        let entry = parser
            .parse_page_text(TAR, "tar", Some("common"), now())
            .unwrap();

        assert_eq!(entry.title.as_deref(), Some("tar"));
        assert_eq!(entry.description, "Archiving utility.");
        assert_eq!(entry.language.as_deref(), Some("bash"));
        assert_eq!(entry.id.as_deref(), Some("8808550e9833"));
        assert_eq!(entry.examples.len(), 2);
        assert_eq!(
            entry.examples[0].description,
            "[c]reate an archive and write it to a [f]ile"
        );
        assert_eq!(
            entry.examples[1].code,
            "tar xvf {{path/to/source.tar[.gz|.bz2|.xz]}}"
        );
        let source = entry.source.unwrap();
        assert_eq!(source.name, TLDR_SOURCE_NAME);
        assert_eq!(
            source.url,
            "https://github.com/tldr-pages/tldr/blob/main/pages/common/tar.md"
        );
        assert_eq!(entry.created_at, Some(now()));
    }

    #[test]
    fn windows_pages_are_powershell() {
        let parser = PageParser::new().unwrap();
        let page = "# Get-ChildItem\r\n\r\n> List items in a directory.\r\n\r\n- List all items:\r\n\r\n`Get-ChildItem`\r\n";
        let entry = parser
            .parse_page_text(page, "get-childitem", Some("windows"), now())
            .unwrap();
        assert_eq!(entry.language.as_deref(), Some("powershell"));
        assert_eq!(entry.id.as_deref(), Some("9cf2c13c493f"));
        assert_eq!(entry.examples.len(), 1);
        assert_eq!(entry.examples[0].code, "Get-ChildItem");
    }

    #[test]
    fn missing_description_falls_back_to_title() {
        let parser = PageParser::new().unwrap();
        let entry = parser
            .parse_page_text("# frobnicate\n", "frobnicate", Some("linux"), now())
            .unwrap();
        assert_eq!(entry.description, "frobnicate");
        assert!(entry.examples.is_empty());
    }

    #[test]
    fn page_without_title_is_rejected() {
        let parser = PageParser::new().unwrap();
        assert!(parser
            .parse_page_text("> no heading\n", "x", None, now())
            .is_err());
    }

    #[test]
    fn unmapped_or_missing_platform() {
        let parser = PageParser::new().unwrap();
        let entry = parser
            .parse_page_text("# zmv\n\n> Move files in zsh.\n", "zmv", Some("freebsd"), now())
            .unwrap();
        assert_eq!(entry.language.as_deref(), Some("freebsd"));

        let entry = parser
            .parse_page_text("# setopt\n\n> Set zsh options.\n", "setopt", None, now())
            .unwrap();
        assert_eq!(entry.language.as_deref(), Some("zsh"));
    }

    #[test]
    fn platform_is_the_directory_below_pages() {
        assert_eq!(
            platform_for_path(Path::new("/data/repo/pages/osx/say.md")).as_deref(),
            Some("osx")
        );
        assert_eq!(platform_for_path(Path::new("/data/repo/pages/say.md")), None);
        assert_eq!(platform_for_path(Path::new("notes/say.md")), None);
        assert_eq!(map_platform("sunos"), "bash");
        assert_eq!(map_platform("windows"), "powershell");
    }
}
