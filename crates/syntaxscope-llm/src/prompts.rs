//! Prompt templates. Both are pure functions of the record.

use syntaxscope_catalog::Record;

/// Examples listed in the explanation prompt.
pub const PROMPT_EXAMPLES: usize = 3;

pub fn explanation_prompt(record: &Record) -> String {
    let mut examples = String::new();
    if !record.examples.is_empty() {
        examples.push_str("Examples:\n");
        for (i, example) in record.examples.iter().take(PROMPT_EXAMPLES).enumerate() {
            examples.push_str(&format!(
                "{}. {}: {}\n",
                i + 1,
                example.code,
                example.description
            ));
        }
    }

    format!(
        "Explain the following command in detail:

Command: {command}
Description: {description}
Category: {category}
{examples}
Provide a comprehensive explanation that covers:
1. What the command does
2. How it works
3. Common use cases
4. Important options or flags
5. Any potential pitfalls or security considerations

Keep your explanation clear, concise, and informative for someone who might be new to this command.
Limit your response to 300 words.
",
        command = record.command,
        description = record.description,
        category = record.category,
    )
}

pub fn tags_prompt(record: &Record) -> String {
    format!(
        r#"You are an expert shell tutor. Given this command, suggest 2-3 general tags that describe what it does.

Command: {command}
Description: {description}
Category: {category}

Return ONLY a JSON array of 2-3 lowercase string tags without explanation, like this:
["tag1", "tag2", "tag3"]

Focus on functional categories like "filesystem", "networking", "search", "permissions", "compression", etc.
"#,
        command = record.command,
        description = record.description,
        category = record.category,
    )
}
