//! Keyword bold-emphasis pass over highlight and skill strings.

use regex::RegexBuilder;

/// Wrap case-insensitive whole-word keyword matches in `**...**`.
///
/// Matches that overlap an existing `**...**` span, or a match already
/// accepted for another keyword, are skipped; everything else is copied
/// through untouched. Span detection pairs `**` markers left to right and is
/// a best-effort heuristic, not a markup parser.
pub fn embolden(text: &str, keywords: &[String]) -> String {
    if text.is_empty() || keywords.is_empty() {
        return text.to_string();
    }

    let existing = bold_spans(text);
    let mut accepted: Vec<(usize, usize)> = Vec::new();

    // Longest keyword first, so "distributed systems" wins over "systems".
    let mut keywords: Vec<&str> = keywords.iter().map(String::as_str).collect();
    keywords.sort_by_key(|k| std::cmp::Reverse(k.len()));

    for keyword in keywords {
        if keyword.trim().is_empty() {
            continue;
        }
        let Ok(re) = RegexBuilder::new(&boundary_pattern(keyword))
            .case_insensitive(true)
            .build()
        else {
            continue;
        };

        for found in re.find_iter(text) {
            let range = (found.start(), found.end());
            if overlaps(&existing, range) || overlaps(&accepted, range) {
                continue;
            }
            accepted.push(range);
        }
    }

    if accepted.is_empty() {
        return text.to_string();
    }
    accepted.sort_unstable();

    let mut out = String::with_capacity(text.len() + accepted.len() * 4);
    let mut cursor = 0;
    for (start, end) in accepted {
        out.push_str(&text[cursor..start]);
        out.push_str("**");
        out.push_str(&text[start..end]);
        out.push_str("**");
        cursor = end;
    }
    out.push_str(&text[cursor..]);

    out
}

/// `\b` only applies next to word characters; keywords like "C++" need the
/// trailing anchor dropped to match at all.
fn boundary_pattern(keyword: &str) -> String {
    let escaped = regex::escape(keyword);
    let starts_word = keyword
        .chars()
        .next()
        .is_some_and(|c| c.is_alphanumeric() || c == '_');
    let ends_word = keyword
        .chars()
        .next_back()
        .is_some_and(|c| c.is_alphanumeric() || c == '_');

    format!(
        "{}{escaped}{}",
        if starts_word { r"\b" } else { "" },
        if ends_word { r"\b" } else { "" },
    )
}

/// Byte ranges (markers included) of `**...**` pairs, matched left to right.
fn bold_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut search = 0;

    while let Some(open) = text[search..].find("**") {
        let open = search + open;
        let Some(close) = text[open + 2..].find("**") else {
            break;
        };
        let close = open + 2 + close + 2;
        spans.push((open, close));
        search = close;
    }

    spans
}

fn overlaps(spans: &[(usize, usize)], (start, end): (usize, usize)) -> bool {
    spans.iter().any(|&(s, e)| start < e && s < end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kw(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn wraps_case_insensitive_matches() {
        let out = embolden("Shipped python services on kubernetes", &kw(&["Python", "Kubernetes"]));
        assert_eq!(out, "Shipped **python** services on **kubernetes**");
    }

    #[test]
    fn never_double_wraps() {
        let text = "Tuned **PostgreSQL** queries and PostgreSQL indexes";
        let out = embolden(text, &kw(&["PostgreSQL"]));
        assert_eq!(out, "Tuned **PostgreSQL** queries and **PostgreSQL** indexes");
    }

    #[test]
    fn idempotent() {
        let once = embolden("Cut latency with Redis caching", &kw(&["Redis"]));
        let twice = embolden(&once, &kw(&["Redis"]));
        assert_eq!(once, twice);
    }

    #[test]
    fn partial_words_are_not_matched() {
        let out = embolden("Organized going-away party", &kw(&["Go"]));
        assert_eq!(out, "Organized going-away party");
    }

    #[test]
    fn non_matching_text_is_untouched() {
        let text = "Mentored 4 engineers on code review";
        assert_eq!(embolden(text, &kw(&["Kafka"])), text);
        assert_eq!(embolden(text, &[]), text);
    }

    #[test]
    fn longest_keyword_wins_overlaps() {
        let out = embolden(
            "Built distributed systems at scale",
            &kw(&["systems", "distributed systems"]),
        );
        assert_eq!(out, "Built **distributed systems** at scale");
    }

    #[test]
    fn non_word_edges_still_match() {
        let out = embolden("Ported C++ modules to Rust", &kw(&["C++"]));
        assert_eq!(out, "Ported **C++** modules to Rust");
    }

    #[test]
    fn keyword_inside_existing_span_is_skipped() {
        let text = "Led **Kubernetes migration** for the platform";
        let out = embolden(text, &kw(&["Kubernetes"]));
        assert_eq!(out, text);
    }
}
