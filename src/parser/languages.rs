use std::path::Path;

use serde::Serialize;
use tree_sitter::Language;

/// Source dialect of an analysed file, chosen from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    TypeScript,
    Tsx,
    JavaScript,
}

/// Extensions the engine analyses, in module-resolution probe order.
pub const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs"];

impl Lang {
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// # Grammar selection rules
    /// - `.ts`/`.mts`/`.cts` -> TypeScript grammar (`LANGUAGE_TYPESCRIPT`)
    /// - `.tsx`              -> TSX grammar (`LANGUAGE_TSX`)
    ///   These MUST be different: the TypeScript grammar cannot parse JSX, and the TSX grammar
    ///   breaks angle-bracket type assertions (`<T>expr`).
    /// - `.js`/`.jsx`/`.mjs`/`.cjs` -> JavaScript grammar, which accepts JSX natively
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "ts" | "mts" | "cts" => Some(Lang::TypeScript),
            "tsx" => Some(Lang::Tsx),
            "js" | "jsx" | "mjs" | "cjs" => Some(Lang::JavaScript),
            _ => None,
        }
    }

    pub fn grammar(self) -> Language {
        match self {
            Lang::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Lang::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Lang::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Lang::TypeScript => "typescript",
            Lang::Tsx => "tsx",
            Lang::JavaScript => "javascript",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_mapping() {
        assert_eq!(Lang::from_path(Path::new("a/b.ts")), Some(Lang::TypeScript));
        assert_eq!(Lang::from_path(Path::new("c.mts")), Some(Lang::TypeScript));
        assert_eq!(Lang::from_path(Path::new("view.tsx")), Some(Lang::Tsx));
        assert_eq!(Lang::from_path(Path::new("x.jsx")), Some(Lang::JavaScript));
        assert_eq!(Lang::from_path(Path::new("lib.rs")), None);
        assert_eq!(Lang::from_path(Path::new("Makefile")), None);
    }
}
