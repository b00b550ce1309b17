use std::path::PathBuf;

use regex::RegexBuilder;
use serde::Serialize;

use crate::codebase::Codebase;
use crate::error::{RefactorError, Result};
use crate::graph::node::{SymbolId, SymbolKind};

/// A single matching symbol returned by `find_symbols`.
#[derive(Debug, Clone, Serialize)]
pub struct FindResult {
    pub id: SymbolId,
    pub symbol_name: String,
    pub kind: SymbolKind,
    pub file_path: PathBuf,
    pub line: usize,
    pub col: usize,
    pub is_exported: bool,
    pub is_default: bool,
}

impl Codebase {
    /// Symbols whose qualified name matches the regex `pattern`.
    ///
    /// - `case_insensitive`: enable case-insensitive regex matching
    /// - `kinds`: if non-empty, only include symbols of these kinds
    ///
    /// Placeholders are never returned. Results are sorted by file path then
    /// line number.
    pub fn find_symbols(
        &self,
        pattern: &str,
        case_insensitive: bool,
        kinds: &[SymbolKind],
    ) -> Result<Vec<FindResult>> {
        let re = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| RefactorError::InvalidPattern {
                pattern: pattern.to_owned(),
                reason: e.to_string(),
            })?;

        let mut results: Vec<FindResult> = self
            .graph
            .symbols()
            .filter(|(_, s)| !matches!(s.kind(), SymbolKind::Module | SymbolKind::External))
            .filter(|(_, s)| kinds.is_empty() || kinds.contains(&s.kind()))
            .filter(|(_, s)| re.is_match(&s.qualified_name))
            .filter_map(|(id, s)| {
                let file = &self.files[s.file?.0];
                let pos = file.line_col(s.name_span.start);
                Some(FindResult {
                    id,
                    symbol_name: s.qualified_name.clone(),
                    kind: s.kind(),
                    file_path: file.path.clone(),
                    line: pos.line,
                    col: pos.col,
                    is_exported: s.exported,
                    is_default: s.default_export,
                })
            })
            .collect();

        results.sort_by(|a, b| {
            a.file_path
                .cmp(&b.file_path)
                .then(a.line.cmp(&b.line))
                .then(a.col.cmp(&b.col))
        });
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use crate::codebase::Codebase;
    use crate::error::RefactorError;
    use crate::graph::node::SymbolKind;

    fn project() -> Codebase {
        Codebase::from_sources(
            "/p",
            [
                ("a.ts", "export class UserService { load() {} }\nexport default function userFactory() {}\n"),
                ("b.ts", "import { UserService } from './a';\nconst user = new UserService();\n"),
            ],
        )
    }

    // Test 1: regex plus kind filter
    #[test]
    fn test_find_by_pattern_and_kind() {
        let cb = project();
        let all: Vec<_> = cb
            .find_symbols("^User", false, &[])
            .unwrap()
            .into_iter()
            .map(|r| (r.symbol_name, r.kind))
            .collect();
        assert_eq!(
            all,
            vec![
                ("UserService".to_string(), SymbolKind::Class),
                ("UserService.load".to_string(), SymbolKind::Method),
                ("UserService".to_string(), SymbolKind::Import),
            ]
        );

        let classes = cb.find_symbols("service", true, &[SymbolKind::Class]).unwrap();
        assert_eq!(classes.len(), 1);
        assert!(classes[0].is_exported);
        assert_eq!((classes[0].line, classes[0].col), (1, 13));
    }

    // Test 2: default exports are flagged
    #[test]
    fn test_find_default_export() {
        let cb = project();
        let found = cb.find_symbols("Factory$", false, &[]).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].is_default);
    }

    // Test 3: an invalid regex is an error, not a panic
    #[test]
    fn test_invalid_pattern() {
        let cb = project();
        assert!(matches!(
            cb.find_symbols("(", false, &[]),
            Err(RefactorError::InvalidPattern { .. })
        ));
    }
}
