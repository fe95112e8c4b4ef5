//! Text splitting utilities
//!
//! Telegram rejects messages above 4096 characters, so long texts are split into
//! chunks before sending. Splits prefer line breaks, then spaces, and only cut a
//! word when it alone exceeds the limit. A hard cut never lands inside an HTML
//! tag or entity, and numbered chunks are re-balanced so each one is valid HTML
//! on its own.

/// Maximum message length for Telegram (4096 chars, but we use less to be safe)
pub const MAX_MESSAGE_LENGTH: usize = 4000;

/// Split `text` into chunks of at most `max_chars` characters
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    if max_chars == 0 || text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in text.split('\n') {
        if fits(&current, line, max_chars) {
            push_with(&mut current, '\n', line);
            continue;
        }

        flush(&mut chunks, &mut current);
        if line.chars().count() <= max_chars {
            current.push_str(line);
            continue;
        }

        // Line too long on its own, fall back to words
        for word in line.split(' ') {
            if fits(&current, word, max_chars) {
                push_with(&mut current, ' ', word);
                continue;
            }

            flush(&mut chunks, &mut current);
            let mut rest: Vec<char> = word.chars().collect();
            while rest.len() > max_chars {
                let tail = rest.split_off(safe_cut(&rest, max_chars));
                chunks.push(rest.into_iter().collect());
                rest = tail;
            }
            current = rest.into_iter().collect();
        }
    }
    flush(&mut chunks, &mut current);

    chunks
}

/// Room for the "(99/99)\n" prefix plus tags closed and reopened at a boundary
const CHUNK_RESERVE: usize = 32;

/// Split and prefix each chunk with `(i/n)` when there is more than one.
///
/// Tags still open at the end of a chunk are closed there and reopened at the
/// start of the next one.
pub fn numbered_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let chunks = split_message(text, max_chars.saturating_sub(CHUNK_RESERVE));
    if chunks.len() == 1 {
        return chunks;
    }

    let total = chunks.len();
    balance_tags(chunks)
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| format!("({}/{})\n{}", i + 1, total, chunk))
        .collect()
}

fn balance_tags(chunks: Vec<String>) -> Vec<String> {
    let mut open: Vec<String> = Vec::new();
    chunks
        .into_iter()
        .map(|chunk| {
            let reopen: String = open.iter().map(|tag| format!("<{}>", tag)).collect();
            track_tags(&chunk, &mut open);
            let close: String = open.iter().rev().map(|tag| format!("</{}>", tag)).collect();
            format!("{}{}{}", reopen, chunk, close)
        })
        .collect()
}

/// Update the stack of open tag names with the tags found in `text`
fn track_tags(text: &str, open: &mut Vec<String>) {
    let mut rest = text;
    while let Some(start) = rest.find('<') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('>') else {
            break;
        };
        let tag = &after[..end];
        if let Some(name) = tag.strip_prefix('/') {
            if let Some(pos) = open.iter().rposition(|t| t == name.trim()) {
                open.truncate(pos);
            }
        } else if let Some(name) = tag.split_whitespace().next() {
            open.push(name.to_string());
        }
        rest = &after[end + 1..];
    }
}

/// Largest cut at or below `max_chars` that is not inside a tag or an entity
fn safe_cut(chars: &[char], max_chars: usize) -> usize {
    let window = &chars[..max_chars];
    let Some(start) = window.iter().rposition(|&c| c == '<' || c == '&') else {
        return max_chars;
    };
    let closer = if window[start] == '<' { '>' } else { ';' };
    if start > 0 && !window[start..].contains(&closer) {
        start
    } else {
        max_chars
    }
}

fn fits(current: &str, piece: &str, max_chars: usize) -> bool {
    let separator = usize::from(!current.is_empty());
    current.chars().count() + separator + piece.chars().count() <= max_chars
}

fn push_with(current: &mut String, separator: char, piece: &str) {
    if !current.is_empty() {
        current.push(separator);
    }
    current.push_str(piece);
}

fn flush(chunks: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
    current.clear();
}
