use std::path::{Component, Path, PathBuf};

/// Extensions probed for an extensionless relative specifier, in order.
const PROBE_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "js", "jsx", "mjs"];

/// Directory index files probed when the specifier names a directory.
const INDEX_FILES: &[&str] = &["index.ts", "index.tsx", "index.mts", "index.js", "index.jsx", "index.mjs"];

/// Returns `true` for `./x`, `../x`, `.` and `..`.
pub fn is_relative(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

/// Lexically normalise a project-relative path: drop `.` components and fold
/// `..` into its parent. Returns `None` if the path escapes the project root.
pub fn normalize(path: &Path) -> Option<PathBuf> {
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::Normal(part) => parts.push(part),
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(parts.iter().collect())
}

/// Attempt to resolve a module specifier against `base_dir` to a file for
/// which `exists` returns true.
///
/// We try common TypeScript/JavaScript extension patterns:
/// - the exact path (specifier already carries an extension)
/// - `.js`/`.jsx`/`.mjs` written for a TypeScript source (`./a.js` -> `a.ts`)
/// - the path with each probe extension appended
/// - directory with an index file
pub fn resolve_specifier(
    base_dir: &Path,
    specifier: &str,
    exists: impl Fn(&Path) -> bool,
) -> Option<PathBuf> {
    let base = normalize(&base_dir.join(specifier))?;

    if exists(&base) {
        return Some(base);
    }

    // TypeScript ESM convention: import './a.js' resolves to a.ts.
    if let Some(ext) = base.extension().and_then(|e| e.to_str()) {
        let aliases: &[&str] = match ext {
            "js" => &["ts", "tsx"],
            "jsx" => &["tsx"],
            "mjs" => &["mts"],
            _ => &[],
        };
        for alias in aliases {
            let candidate = base.with_extension(alias);
            if exists(&candidate) {
                return Some(candidate);
            }
        }
    }

    for ext in PROBE_EXTENSIONS {
        let candidate = PathBuf::from(format!("{}.{}", base.display(), ext));
        if exists(&candidate) {
            return Some(candidate);
        }
    }

    for index in INDEX_FILES {
        let candidate = base.join(index);
        if exists(&candidate) {
            return Some(candidate);
        }
    }

    None
}

/// Extract the canonical package name from a module specifier.
///
/// - `react` → `react`
/// - `@org/utils` → `@org/utils`  (scoped package, both parts kept)
/// - `lodash/merge` → `lodash`    (subpath import)
/// - `@org/utils/helpers` → `@org/utils`  (scoped package subpath)
pub fn extract_package_name(specifier: &str) -> &str {
    if specifier.starts_with('@') {
        // Scoped package: `@scope/name[/subpath]` keeps the first two segments.
        let parts: Vec<&str> = specifier.splitn(3, '/').collect();
        if parts.len() >= 2 {
            let scope_end = parts[0].len() + 1 + parts[1].len();
            &specifier[..scope_end]
        } else {
            specifier
        }
    } else {
        match specifier.find('/') {
            Some(idx) => &specifier[..idx],
            None => specifier,
        }
    }
}

/// The specifier an import in `from_file` should use to reach `to_file`,
/// both project-relative: `./util/c`, `../shared/x`. Source extensions are
/// dropped.
pub fn relative_specifier(from_file: &Path, to_file: &Path) -> String {
    let from_dir: Vec<Component> = from_file
        .parent()
        .map(|p| p.components().collect())
        .unwrap_or_default();
    let to: Vec<Component> = to_file.components().collect();

    let common = from_dir
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();
    // Never consume the file name itself as a shared directory.
    let common = common.min(to.len().saturating_sub(1));

    let mut parts: Vec<String> = Vec::new();
    let ups = from_dir.len() - common;
    if ups == 0 {
        parts.push(".".to_owned());
    } else {
        parts.extend(std::iter::repeat_n("..".to_owned(), ups));
    }
    for component in &to[common..] {
        parts.push(component.as_os_str().to_string_lossy().into_owned());
    }

    let mut spec = parts.join("/");
    if let Some(ext) = to_file.extension().and_then(|e| e.to_str())
        && matches!(ext, "ts" | "tsx" | "mts" | "cts" | "js" | "jsx")
    {
        spec.truncate(spec.len() - ext.len() - 1);
    }
    spec
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn files(paths: &[&str]) -> HashSet<PathBuf> {
        paths.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize(Path::new("src/./lib/../a.ts")),
            Some(PathBuf::from("src/a.ts"))
        );
        assert_eq!(normalize(Path::new("../outside.ts")), None);
    }

    #[test]
    fn test_resolve_extensions_and_index() {
        let set = files(&["src/a.ts", "src/util/index.ts", "src/view.tsx", "lib/x.js"]);
        let exists = |p: &Path| set.contains(p);
        let dir = Path::new("src");
        assert_eq!(resolve_specifier(dir, "./a", exists), Some(PathBuf::from("src/a.ts")));
        assert_eq!(resolve_specifier(dir, "./a.ts", exists), Some(PathBuf::from("src/a.ts")));
        assert_eq!(resolve_specifier(dir, "./a.js", exists), Some(PathBuf::from("src/a.ts")));
        assert_eq!(
            resolve_specifier(dir, "./util", exists),
            Some(PathBuf::from("src/util/index.ts"))
        );
        assert_eq!(resolve_specifier(dir, "./view", exists), Some(PathBuf::from("src/view.tsx")));
        assert_eq!(resolve_specifier(dir, "../lib/x", exists), Some(PathBuf::from("lib/x.js")));
        assert_eq!(resolve_specifier(dir, "./missing", exists), None);
    }

    #[test]
    fn test_is_relative() {
        assert!(is_relative("./local"));
        assert!(is_relative("../parent"));
        assert!(is_relative("."));
        assert!(!is_relative("react"));
        assert!(!is_relative(".hidden"));
    }

    #[test]
    fn test_extract_package_name() {
        assert_eq!(extract_package_name("react"), "react");
        assert_eq!(extract_package_name("@org/utils"), "@org/utils");
        assert_eq!(extract_package_name("@org/utils/helpers"), "@org/utils");
        assert_eq!(extract_package_name("lodash/merge"), "lodash");
    }

    #[test]
    fn test_relative_specifier() {
        assert_eq!(relative_specifier(Path::new("a.ts"), Path::new("file_c.ts")), "./file_c");
        assert_eq!(
            relative_specifier(Path::new("src/a.ts"), Path::new("src/util/c.ts")),
            "./util/c"
        );
        assert_eq!(
            relative_specifier(Path::new("src/util/c.ts"), Path::new("src/a.ts")),
            "../a"
        );
        assert_eq!(
            relative_specifier(Path::new("src/x/y.ts"), Path::new("lib/z.tsx")),
            "../../lib/z"
        );
        assert_eq!(relative_specifier(Path::new("a/b.ts"), Path::new("a.ts")), "../a");
    }
}
