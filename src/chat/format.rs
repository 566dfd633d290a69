//! Post-processing of assembled assistant responses.

/// Wrap triple-backtick fenced regions in display-ready `<pre>` blocks.
///
/// Runs only on the fully accumulated response text: a fence marker can be
/// split across token boundaries, so per-token detection is unreliable.
pub fn format_code_fences(response: &str) -> String {
    response
        .split("```")
        .enumerate()
        .map(|(index, part)| {
            if index % 2 != 0 {
                format!("<pre class=\"code-block\">{}</pre>", part)
            } else {
                part.to_string()
            }
        })
        .collect()
}

/// Strip quote characters from a generated chat title.
pub fn strip_title_quotes(title: &str) -> String {
    title.replace(['\'', '"'], "").trim().to_string()
}
