//! Built-in sample entries for exercising augmentation without a corpus.

use syntaxscope_catalog::{Example, RawEntry};

fn entry(command: &str, description: &str, code: &str, example: &str) -> RawEntry {
    RawEntry {
        command: command.to_string(),
        description: description.to_string(),
        category: Some("bash".to_string()),
        examples: vec![Example {
            code: code.to_string(),
            description: example.to_string(),
        }],
        ..Default::default()
    }
}

pub fn sample_entries() -> Vec<RawEntry> {
    vec![
        entry(
            "ls -la",
            "List directory contents with detailed information",
            "ls -la /etc",
            "List detailed contents of /etc directory",
        ),
        entry(
            "grep -r 'pattern' .",
            "Search recursively for a pattern in current directory",
            "grep -r 'TODO' ./src",
            "Find all TODOs in source code",
        ),
        entry(
            "curl -X POST https://api.example.com/data",
            "Send POST request to an API endpoint",
            r#"curl -X POST -H 'Content-Type: application/json' -d '{"key":"value"}' https://api.example.com/data"#,
            "POST JSON data to an API",
        ),
    ]
}
