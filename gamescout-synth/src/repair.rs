//! Truncation repair for JSON cut off at the token limit.

/// Best-effort repair of a JSON document that was cut off mid-structure.
///
/// Finds the first `{`, scans forward tracking the stack of expected
/// closers and an in-string flag (toggled by unescaped `"`), trims any
/// trailing whitespace and commas, then appends the missing closers in
/// reverse nesting order. Returns `None` when the text contains no `{`
/// or the brackets are inconsistent rather than merely unfinished.
pub fn repair_truncated_json(raw: &str) -> Option<String> {
    let start = raw.find('{')?;
    let text = &raw[start..];

    let mut closers: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for ch in text.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => closers.push('}'),
            '[' => closers.push(']'),
            '}' | ']' => {
                // Mismatched closer means the text is malformed, not truncated.
                if closers.pop() != Some(ch) {
                    return None;
                }
            }
            _ => {}
        }
    }

    let mut repaired = text.to_string();
    if in_string {
        repaired.push('"');
    }
    while repaired.ends_with([' ', '\t', '\n', '\r', ',']) {
        repaired.pop();
    }
    for closer in closers.iter().rev() {
        repaired.push(*closer);
    }
    Some(repaired)
}
