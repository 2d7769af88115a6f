//! Regex-driven lexical extraction over GDScript source.
//!
//! Every extractor works one line at a time. This is a deliberate view of
//! the language, not a grammar: the extractors knowingly ignore
//!
//! - multi-line strings (`"""…"""`): their inner lines are scanned as code,
//! - expressions and calls split across lines with `\` or open brackets,
//! - string contents that mimic keywords, except where a match start is
//!   checked with [`is_inside_string_literal`].
//!
//! Comments (`#`) suppress matches on the same line unless an extractor
//! parses comments explicitly. Indentation treats one tab as four spaces.

pub mod comments;
pub mod declarations;
pub mod flow;
pub mod functions;
pub mod imports;
pub mod literals;
pub mod nodes;
pub mod references;

pub use comments::{extract_markers, CommentMarker, Priority};
pub use declarations::{
    extract_declarations, DeclKind, Declaration, Decorator, ExtendsDecl,
};
pub use flow::{extract_awaits, extract_matches, AwaitSite, MatchBlock, MatchCase};
pub use functions::{enclosing_function, extract_functions, FunctionDef};
pub use imports::{extract_imports, ImportKind, ImportRef, ImportScope};
pub use literals::{
    extract_dict_accesses, extract_numbers, extract_strings, DictAccess, DictAccessForm,
    NumberCategory, NumericLiteral, StringLiteral,
};
pub use nodes::{extract_node_refs, NodeRef, NodeRefKind};
pub use references::{extract_references, RefKind, Reference};

use crate::project::SourceFile;

/// Width of a tab when comparing indentation.
pub const TAB_WIDTH: usize = 4;

/// All lexical facts for one script.
#[derive(Debug, Clone, Default)]
pub struct FileFacts {
    pub rel_path: String,
    pub functions: Vec<FunctionDef>,
    pub declarations: Vec<Declaration>,
    pub class_name: Option<(String, usize)>,
    pub extends: Option<ExtendsDecl>,
    pub imports: Vec<ImportRef>,
    pub node_refs: Vec<NodeRef>,
    pub awaits: Vec<AwaitSite>,
    pub matches: Vec<MatchBlock>,
    pub dict_accesses: Vec<DictAccess>,
    pub strings: Vec<StringLiteral>,
    pub numbers: Vec<NumericLiteral>,
    pub markers: Vec<CommentMarker>,
    pub references: Vec<Reference>,
}

impl FileFacts {
    /// Run every extractor over a script.
    pub fn extract(file: &SourceFile) -> Self {
        let lines = &file.lines;
        let functions = extract_functions(lines);
        let (declarations, class_name, extends) =
            extract_declarations(&file.rel_path, lines, &functions);

        Self {
            rel_path: file.rel_path.clone(),
            imports: extract_imports(lines, &functions, extends.as_ref()),
            node_refs: extract_node_refs(lines, &functions),
            awaits: extract_awaits(lines, &functions),
            matches: extract_matches(lines, &functions),
            dict_accesses: extract_dict_accesses(lines),
            strings: extract_strings(lines),
            numbers: extract_numbers(lines, &functions),
            markers: extract_markers(lines),
            references: extract_references(&file.rel_path, lines, &functions),
            functions,
            declarations,
            class_name,
            extends,
        }
    }

    /// Declarations of one kind.
    pub fn declarations_of(&self, kind: DeclKind) -> impl Iterator<Item = &Declaration> {
        self.declarations.iter().filter(move |d| d.kind == kind)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn has_static_functions(&self) -> bool {
        self.functions.iter().any(|f| f.is_static)
    }
}

/// Indentation width with tabs counted as [`TAB_WIDTH`] spaces.
pub fn indent_width(line: &str) -> usize {
    let mut width = 0;
    for ch in line.chars() {
        match ch {
            ' ' => width += 1,
            '\t' => width += TAB_WIDTH,
            _ => break,
        }
    }
    width
}

/// Byte offset of the comment marker `#` that is not inside a string.
pub fn comment_start(line: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, ch) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match quote {
            Some(q) => {
                if ch == '\\' {
                    escaped = true;
                } else if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '"' | '\'' => quote = Some(ch),
                '#' => return Some(i),
                _ => {}
            },
        }
    }
    None
}

/// The code portion of a line, with any trailing comment removed.
pub fn code_part(line: &str) -> &str {
    match comment_start(line) {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// The comment text after `#`, if the line has a comment.
pub fn comment_part(line: &str) -> Option<&str> {
    comment_start(line).map(|idx| &line[idx + 1..])
}

/// True for lines with no code (blank or comment only).
pub fn is_blank_or_comment(line: &str) -> bool {
    code_part(line).trim().is_empty()
}

/// Check if a byte position in a line falls within a string literal.
/// Supports double- and single-quoted strings with escape handling.
pub fn is_inside_string_literal(line: &str, pos: usize) -> bool {
    let mut in_string = false;
    let mut string_char = None;
    let mut escaped = false;

    for (i, ch) in line.char_indices() {
        if i >= pos {
            return in_string;
        }

        if escaped {
            escaped = false;
            continue;
        }

        if ch == '\\' && in_string {
            escaped = true;
            continue;
        }

        if ch == '"' || ch == '\'' {
            if !in_string {
                in_string = true;
                string_char = Some(ch);
            } else if Some(ch) == string_char {
                in_string = false;
                string_char = None;
            }
        }
    }

    in_string
}

/// Replace the contents of string literals with spaces, keeping quotes
/// and byte offsets intact.
pub fn mask_strings(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for ch in line.chars() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                    push_blank(&mut out, ch);
                } else if ch == '\\' {
                    escaped = true;
                    push_blank(&mut out, ch);
                } else if ch == q {
                    quote = None;
                    out.push(ch);
                } else {
                    push_blank(&mut out, ch);
                }
            }
            None => {
                if ch == '"' || ch == '\'' {
                    quote = Some(ch);
                }
                out.push(ch);
            }
        }
    }
    out
}

fn push_blank(out: &mut String, ch: char) {
    for _ in 0..ch.len_utf8() {
        out.push(' ');
    }
}

/// Check if a name is a GDScript identifier word at `pos` boundaries.
pub fn contains_word(haystack: &str, word: &str) -> bool {
    let bytes = haystack.as_bytes();
    let mut start = 0;
    while let Some(idx) = haystack[start..].find(word) {
        let begin = start + idx;
        let end = begin + word.len();
        let before_ok = begin == 0 || !is_ident_byte(bytes[begin - 1]);
        let after_ok = end >= bytes.len() || !is_ident_byte(bytes[end]);
        if before_ok && after_ok {
            return true;
        }
        start = begin + 1;
        if start >= haystack.len() {
            break;
        }
    }
    false
}

pub fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indent_width_tabs_as_four() {
        assert_eq!(indent_width("\tvar x"), 4);
        assert_eq!(indent_width("    var x"), 4);
        assert_eq!(indent_width("\t  x"), 6);
        assert_eq!(indent_width("x"), 0);
    }

    #[test]
    fn test_code_part_ignores_hash_in_strings() {
        assert_eq!(code_part("var c = \"#fff\" # colour"), "var c = \"#fff\" ");
        assert_eq!(code_part("# whole line"), "");
        assert_eq!(comment_part("x = 1 # note"), Some(" note"));
        assert_eq!(comment_part("x = '#'"), None);
    }

    #[test]
    fn test_is_inside_string_literal() {
        assert!(!is_inside_string_literal("hello world", 0));
        assert!(is_inside_string_literal(r#""hello world""#, 3));
        assert!(!is_inside_string_literal(r#""hello" world"#, 9));
        assert!(is_inside_string_literal(r#""hello \" world""#, 10));
    }

    #[test]
    fn test_mask_strings_keeps_offsets() {
        let line = r#"print("a 42", x)"#;
        let masked = mask_strings(line);
        assert_eq!(masked.len(), line.len());
        assert_eq!(masked, r#"print("    ", x)"#);
    }

    #[test]
    fn test_contains_word() {
        assert!(contains_word("Audio.play()", "Audio"));
        assert!(!contains_word("AudioBus.play()", "Audio"));
        assert!(contains_word("x = _gold + 1", "_gold"));
        assert!(!contains_word("my_gold", "gold"));
    }

    #[test]
    fn test_extract_facts_smoke() {
        let file = SourceFile::from_text(
            "game/tower.gd",
            "class_name Tower\nextends Node2D\n\nsignal fired\n\nfunc _ready():\n\tpass\n",
        );
        let facts = FileFacts::extract(&file);
        assert_eq!(facts.class_name, Some(("Tower".to_string(), 1)));
        assert_eq!(facts.extends.as_ref().map(|e| e.target.as_str()), Some("Node2D"));
        assert_eq!(facts.functions.len(), 1);
        assert_eq!(facts.declarations_of(DeclKind::Signal).count(), 1);
    }
}
