use std::fmt;

/// A closed set of languages the registry knows how to route. `Unknown` is
/// the plaintext fallback — it still gets indexed for full-text search, just
/// without symbol extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Language {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Tsx,
    Go,
    Java,
    C,
    Cpp,
    CSharp,
    Ruby,
    Php,
    Swift,
    Kotlin,
    Scala,
    Hcl,
    Bash,
    Yaml,
    Toml,
    Json,
    Markdown,
    Html,
    Css,
    Sql,
    Dockerfile,
    PlainText,
    Unknown,
}

impl Language {
    /// Primary detection: file extension. Secondary (shebang) and tertiary
    /// (filename patterns) detection live in the language registry, which
    /// has access to file bytes and the bare filename.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let lang = match ext.to_ascii_lowercase().as_str() {
            "rs" => Self::Rust,
            "py" | "pyi" => Self::Python,
            "js" | "jsx" | "mjs" | "cjs" => Self::JavaScript,
            "ts" | "mts" | "cts" => Self::TypeScript,
            "tsx" => Self::Tsx,
            "go" => Self::Go,
            "java" => Self::Java,
            "c" | "h" => Self::C,
            "cc" | "cpp" | "cxx" | "hpp" | "hh" => Self::Cpp,
            "cs" => Self::CSharp,
            "rb" => Self::Ruby,
            "php" => Self::Php,
            "swift" => Self::Swift,
            "kt" | "kts" => Self::Kotlin,
            "scala" => Self::Scala,
            "tf" | "tfvars" | "hcl" => Self::Hcl,
            "sh" | "bash" | "zsh" => Self::Bash,
            "yaml" | "yml" => Self::Yaml,
            "toml" => Self::Toml,
            "json" => Self::Json,
            "md" | "markdown" => Self::Markdown,
            "html" | "htm" => Self::Html,
            "css" | "scss" | "sass" => Self::Css,
            "sql" => Self::Sql,
            "txt" => Self::PlainText,
            _ => return None,
        };
        Some(lang)
    }

    pub fn from_shebang(first_line: &str) -> Option<Self> {
        if !first_line.starts_with("#!") {
            return None;
        }
        let lang = if first_line.contains("python") {
            Self::Python
        } else if first_line.contains("bash") || first_line.contains("/sh") {
            Self::Bash
        } else if first_line.contains("node") {
            Self::JavaScript
        } else if first_line.contains("ruby") {
            Self::Ruby
        } else {
            return None;
        };
        Some(lang)
    }

    pub fn from_filename(name: &str) -> Option<Self> {
        match name {
            "Dockerfile" | "Containerfile" => Some(Self::Dockerfile),
            "Makefile" | "Rakefile" => Some(Self::PlainText),
            _ => None,
        }
    }

    /// Stable string id stored in `files.language` and used in config/filters.
    pub fn id(&self) -> &'static str {
        match self {
            Self::Rust => "rust",
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Tsx => "tsx",
            Self::Go => "go",
            Self::Java => "java",
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::CSharp => "csharp",
            Self::Ruby => "ruby",
            Self::Php => "php",
            Self::Swift => "swift",
            Self::Kotlin => "kotlin",
            Self::Scala => "scala",
            Self::Hcl => "hcl",
            Self::Bash => "bash",
            Self::Yaml => "yaml",
            Self::Toml => "toml",
            Self::Json => "json",
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::Css => "css",
            Self::Sql => "sql",
            Self::Dockerfile => "dockerfile",
            Self::PlainText => "plaintext",
            Self::Unknown => "unknown",
        }
    }

    /// Languages with a dedicated tree-sitter grammar wired into the
    /// registry (`connector::treesitter`). Everything else routed here
    /// falls through to the document/plaintext plugin.
    pub fn has_grammar(&self) -> bool {
        matches!(
            self,
            Self::Rust
                | Self::Python
                | Self::JavaScript
                | Self::TypeScript
                | Self::Tsx
                | Self::Go
                | Self::Java
                | Self::C
                | Self::Cpp
                | Self::Hcl
                | Self::Php
                | Self::Ruby
                | Self::Bash
                | Self::Markdown
        )
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_detection() {
        assert_eq!(Language::from_extension("rs"), Some(Language::Rust));
        assert_eq!(Language::from_extension("PY"), Some(Language::Python));
        assert_eq!(Language::from_extension("xyz"), None);
    }

    #[test]
    fn shebang_detection() {
        assert_eq!(
            Language::from_shebang("#!/usr/bin/env python3"),
            Some(Language::Python)
        );
        assert_eq!(Language::from_shebang("no shebang here"), None);
    }

    #[test]
    fn dockerfile_by_filename() {
        assert_eq!(Language::from_filename("Dockerfile"), Some(Language::Dockerfile));
    }
}
