use tree_sitter::Language;

/// How a comment's text sits inside its node: the kind name recorded in
/// the `type` feature plus the delimiter widths stripped before the
/// entry span is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    Line,
    Block,
    Doc,
}

impl CommentKind {
    pub fn type_name(self) -> &'static str {
        match self {
            CommentKind::Line => "LineComment",
            CommentKind::Block => "BlockComment",
            CommentKind::Doc => "DocComment",
        }
    }
}

pub struct LanguageConfig {
    pub name: &'static str,
    pub language: Language,
    pub extensions: &'static [&'static str],
    /// Node kinds the grammar uses for comments.
    pub comment_kinds: &'static [&'static str],
}

impl LanguageConfig {
    pub fn get_all() -> Vec<LanguageConfig> {
        vec![
            java_config(),
            rust_config(),
            go_config(),
            python_config(),
            typescript_config(),
            javascript_config(),
        ]
    }

    pub fn get_by_extension(ext: &str) -> Option<LanguageConfig> {
        Self::get_all()
            .into_iter()
            .find(|c| c.extensions.contains(&ext))
    }

    pub fn get_by_name(name: &str) -> Option<LanguageConfig> {
        Self::get_all().into_iter().find(|c| c.name == name)
    }

    pub fn is_comment(&self, kind: &str) -> bool {
        self.comment_kinds.contains(&kind)
    }

    /// All extensions any registered language claims.
    pub fn supported_extensions() -> Vec<&'static str> {
        Self::get_all()
            .iter()
            .flat_map(|c| c.extensions.iter().copied())
            .collect()
    }
}

fn java_config() -> LanguageConfig {
    LanguageConfig {
        name: "java",
        language: tree_sitter_java::LANGUAGE.into(),
        extensions: &["java"],
        comment_kinds: &["line_comment", "block_comment"],
    }
}

fn rust_config() -> LanguageConfig {
    LanguageConfig {
        name: "rust",
        language: tree_sitter_rust::LANGUAGE.into(),
        extensions: &["rs"],
        comment_kinds: &["line_comment", "block_comment"],
    }
}

fn go_config() -> LanguageConfig {
    LanguageConfig {
        name: "go",
        language: tree_sitter_go::LANGUAGE.into(),
        extensions: &["go"],
        comment_kinds: &["comment"],
    }
}

fn python_config() -> LanguageConfig {
    LanguageConfig {
        name: "python",
        language: tree_sitter_python::LANGUAGE.into(),
        extensions: &["py"],
        comment_kinds: &["comment"],
    }
}

fn typescript_config() -> LanguageConfig {
    LanguageConfig {
        name: "typescript",
        language: tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        extensions: &["ts", "tsx"],
        comment_kinds: &["comment"],
    }
}

fn javascript_config() -> LanguageConfig {
    LanguageConfig {
        name: "javascript",
        language: tree_sitter_javascript::LANGUAGE.into(),
        extensions: &["js", "jsx", "mjs"],
        comment_kinds: &["comment"],
    }
}

/// Classify a comment from its literal text and compute the number of
/// delimiter bytes to strip from each side. The stripped span covers
/// the comment's text content; doc markers (`/** .. */`, `///`, `//!`)
/// count toward the head.
pub fn classify_comment(text: &str) -> (CommentKind, usize, usize) {
    if text.starts_with("///") || text.starts_with("//!") {
        (CommentKind::Doc, 3, 0)
    } else if text.starts_with("//") {
        (CommentKind::Line, 2, 0)
    } else if text.starts_with("/**") && text.len() >= 5 && text.ends_with("*/") {
        (CommentKind::Doc, 3, 2)
    } else if text.starts_with("/*") {
        let tail = if text.len() >= 4 && text.ends_with("*/") {
            2
        } else {
            // Unterminated block comment at end of file.
            0
        };
        (CommentKind::Block, 2, tail)
    } else if text.starts_with('#') {
        (CommentKind::Line, 1, 0)
    } else {
        (CommentKind::Line, 0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_by_extension() {
        assert_eq!(LanguageConfig::get_by_extension("java").unwrap().name, "java");
        assert_eq!(LanguageConfig::get_by_extension("rs").unwrap().name, "rust");
        assert!(LanguageConfig::get_by_extension("md").is_none());
    }

    #[test]
    fn test_comment_kind_detection() {
        let java = LanguageConfig::get_by_name("java").unwrap();
        assert!(java.is_comment("line_comment"));
        assert!(java.is_comment("block_comment"));
        assert!(!java.is_comment("method_declaration"));
    }

    #[test]
    fn test_classify_line_and_doc() {
        assert_eq!(classify_comment("// x"), (CommentKind::Line, 2, 0));
        assert_eq!(classify_comment("/// x"), (CommentKind::Doc, 3, 0));
        assert_eq!(classify_comment("//! x"), (CommentKind::Doc, 3, 0));
        assert_eq!(classify_comment("# x"), (CommentKind::Line, 1, 0));
    }

    #[test]
    fn test_classify_block() {
        assert_eq!(classify_comment("/* x */"), (CommentKind::Block, 2, 2));
        assert_eq!(classify_comment("/** x */"), (CommentKind::Doc, 3, 2));
        assert_eq!(classify_comment("/* open"), (CommentKind::Block, 2, 0));
    }

    #[test]
    fn test_classify_degenerate_block() {
        // "/**/" is an empty plain block, not a doc comment.
        assert_eq!(classify_comment("/**/"), (CommentKind::Block, 2, 2));
    }
}
