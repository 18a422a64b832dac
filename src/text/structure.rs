use super::heading::HeadingDetector;

const SENTENCE_ENDINGS: &[char] = &['.', '!', '?'];

/// Terminate every line as a sentence; headings get an extra blank line so the
/// voice pauses after them.
pub fn structure_for_audio(text: &str, headings: &dyn HeadingDetector) -> String {
    let mut lines: Vec<String> = Vec::new();

    for line in text.split('\n') {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if headings.is_heading(line) {
            lines.push(format!("{}.", line));
            lines.push(String::new());
        } else if line.ends_with(SENTENCE_ENDINGS) {
            lines.push(line.to_string());
        } else {
            lines.push(format!("{}.", line));
        }
    }

    lines.join("\n")
}
