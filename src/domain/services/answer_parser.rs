#[cfg(test)]
#[path = "answer_parser_test.rs"]
mod tests;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedAnswer {
    /// Answer with citations replaced by `[n]` markers.
    pub text: String,
    /// Cited document names, numbered by position starting at 1.
    pub citations: Vec<String>,
    pub followup_questions: Vec<String>,
}

/// Finds the next `open` + content + `close` span in `text` starting at byte
/// `from`, where content is non-empty and free of `stop`. Returns the span's
/// start, the content, and the byte just after the span.
fn next_span<'a>(
    text: &'a str,
    from: usize,
    open: &str,
    close: &str,
    stop: char,
) -> Option<(usize, &'a str, usize)> {
    let mut cursor = from;
    while let Some(pos) = text[cursor..].find(open) {
        let start = cursor + pos;
        let content_start = start + open.len();
        if let Some(len) = text[content_start..].find(stop) {
            let content_end = content_start + len;
            if len > 0 && text[content_end..].starts_with(close) {
                return Some((
                    start,
                    &text[content_start..content_end],
                    content_end + close.len(),
                ));
            }
        }

        // Step over the opening character only, a match may start inside it.
        cursor = start + open.chars().next().map(|e| return e.len_utf8()).unwrap_or(1);
    }

    return None;
}

/// Splits `text` into plain fragments and the contents of every
/// `open`..`close` span, calling `on_span` for each span in order.
fn replace_spans(
    text: &str,
    open: &str,
    close: &str,
    stop: char,
    mut on_span: impl FnMut(&str) -> String,
) -> String {
    let mut res = String::with_capacity(text.len());
    let mut cursor = 0;
    while let Some((start, content, end)) = next_span(text, cursor, open, close, stop) {
        res.push_str(&text[cursor..start]);
        res.push_str(&on_span(content));
        cursor = end;
    }
    res.push_str(&text[cursor..]);

    return res;
}

/// Reduces a cited path to its document name.
fn citation_name(citation: &str) -> &str {
    return citation.rsplit('/').next().unwrap_or(citation);
}

/// Parses a document search answer. `<<question>>` spans are collected as
/// follow-up questions and removed, and `[path/to/doc.pdf]` spans become
/// numbered citations. Repeated documents share the same number.
pub fn parse_docsearch_answer(answer: &str) -> ParsedAnswer {
    let mut followup_questions = vec![];
    let without_followups = replace_spans(answer, "<<", ">>", '>', |question| {
        followup_questions.push(question.to_string());
        return "".to_string();
    });

    let mut citations: Vec<String> = vec![];
    let text = replace_spans(without_followups.trim(), "[", "]", ']', |citation| {
        let name = citation_name(citation);
        let idx = match citations.iter().position(|e| return e == name) {
            Some(idx) => idx + 1,
            None => {
                citations.push(name.to_string());
                citations.len()
            }
        };

        return format!("[{idx}]");
    });

    return ParsedAnswer {
        text,
        citations,
        followup_questions,
    };
}

/// Chat answers carry no citations. Bracketed spans are unwrapped so only
/// their content remains.
pub fn parse_chat_answer(answer: &str) -> String {
    return replace_spans(answer.trim(), "[", "]", ']', |content| {
        return content.to_string();
    });
}

/// Backend path serving a cited document, with the viewer options the
/// document viewer expects.
pub fn citation_file_path(citation: &str) -> String {
    return format!("/content/{citation}#view=FitV&pagemode=none&toolbar=0");
}
