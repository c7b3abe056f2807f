//! System prompt construction for the self-correcting text loop.

use crate::llm::schema::Schema;

/// A failed attempt, fed back to the model on the next try.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryAttempt {
    pub error_message: String,
    pub raw_response: String,
}

/// Build the system prompt for one attempt of the text loop.
///
/// Layout: the caller's system prompt (if any), the JSON output instructions
/// with the rendered schema, then the transcript of every earlier attempt.
pub fn build_correction_prompt(
    system_prompt: Option<&str>,
    schema: &Schema,
    previous_errors: &[RetryAttempt],
) -> String {
    let mut sections = Vec::new();

    if let Some(system) = system_prompt.map(str::trim).filter(|s| !s.is_empty()) {
        sections.push(system.to_string());
    }

    sections.push(format!(
        r#"## Output Format
Respond with a single valid JSON object that matches this JSON schema:

{schema}

Respond with the JSON object only. Do not wrap it in markdown code fences and do not add any text before or after it."#,
        schema = schema.render()
    ));

    if !previous_errors.is_empty() {
        sections.push(render_previous_errors(previous_errors));
    }

    sections.join("\n\n")
}

fn render_previous_errors(previous_errors: &[RetryAttempt]) -> String {
    let attempts: Vec<String> = previous_errors
        .iter()
        .enumerate()
        .map(|(idx, attempt)| {
            format!(
                "Attempt {n} error: {error}\nAttempt {n} response:\n{raw}",
                n = idx + 1,
                error = attempt.error_message,
                raw = attempt.raw_response
            )
        })
        .collect();

    format!(
        "## Previous Attempts\nYour previous responses were rejected. Each failed attempt is listed below with the error it caused.\n\n{}\n\nCorrect these issues and respond with a valid JSON object only.",
        attempts.join("\n\n")
    )
}
