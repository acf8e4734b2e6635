//! Minimal character-cell text wrapping for pane content and the input box.

/// Wraps `text` to `width` columns, preferring word boundaries and hard
/// breaking words longer than a line. Embedded newlines always break.
pub fn wrap_text(text: &str, width: u16) -> Vec<String> {
    let width = width.max(1) as usize;
    let mut lines = Vec::new();
    for raw_line in text.split('\n') {
        if raw_line.is_empty() {
            lines.push(String::new());
            continue;
        }
        let mut current = String::new();
        let mut current_len = 0usize;
        for word in raw_line.split(' ') {
            let word_len = word.chars().count();
            let sep = usize::from(current_len > 0);
            if current_len + sep + word_len <= width {
                if sep == 1 {
                    current.push(' ');
                }
                current.push_str(word);
                current_len += sep + word_len;
                continue;
            }
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if word_len <= width {
                current.push_str(word);
                current_len = word_len;
            } else {
                // Hard-break an overlong word across lines.
                let mut chunk = String::new();
                let mut chunk_len = 0usize;
                for ch in word.chars() {
                    if chunk_len == width {
                        lines.push(std::mem::take(&mut chunk));
                        chunk_len = 0;
                    }
                    chunk.push(ch);
                    chunk_len += 1;
                }
                current = chunk;
                current_len = chunk_len;
            }
        }
        lines.push(current);
    }
    lines
}

/// Maps a character-index cursor inside `text` to its (line, column) after
/// wrapping at `width`, for positioning the terminal cursor in the input box.
/// Walks the text with the same word-boundary rules as `wrap_text` so the
/// terminal cursor lands on the cell the character is actually drawn in.
pub fn cursor_line_col(text: &str, width: u16, cursor: usize) -> (u16, u16) {
    let width = width.max(1) as usize;
    let mut line = 0usize;
    let mut col = 0usize;
    let mut idx = 0usize;
    for (raw_index, raw_line) in text.split('\n').enumerate() {
        if raw_index > 0 {
            if idx == cursor {
                return (line as u16, col as u16);
            }
            idx += 1;
            line += 1;
            col = 0;
        }
        for (word_index, word) in raw_line.split(' ').enumerate() {
            let word_len = word.chars().count();
            let sep = usize::from(word_index > 0);
            if col + sep + word_len <= width {
                if sep == 1 {
                    if idx == cursor {
                        return (line as u16, col as u16);
                    }
                    idx += 1;
                    col += 1;
                }
                for _ in word.chars() {
                    if idx == cursor {
                        return (line as u16, col as u16);
                    }
                    idx += 1;
                    col += 1;
                }
                continue;
            }
            if sep == 1 {
                // The separating space disappears at the wrap point.
                if idx == cursor {
                    return (line as u16, col as u16);
                }
                idx += 1;
            }
            if col > 0 {
                line += 1;
                col = 0;
            }
            for _ in word.chars() {
                if col == width {
                    line += 1;
                    col = 0;
                }
                if idx == cursor {
                    return (line as u16, col as u16);
                }
                idx += 1;
                col += 1;
            }
        }
    }
    if col == width {
        line += 1;
        col = 0;
    }
    (line as u16, col as u16)
}
