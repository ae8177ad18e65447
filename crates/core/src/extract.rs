//! Tier 1 — textual symbol and import extraction.
//!
//! Deliberately not AST-accurate: patterns are tuned to mainstream
//! ECMAScript/TypeScript source, in the same spirit as the host repo's
//! `scan_imports` multi-language regex scanner. Precise analysis is a
//! downstream concern; this only has to stay fast and stay under deadline.

use crate::types::{DiscoveredFile, ImportEdge, Symbol, SymbolKind};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::Path;

pub const EXTRACTABLE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mts", "mjs"];

const RESOLUTION_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mts", "mjs"];

/// Result of scanning a single file's text.
pub struct FileExtraction {
    pub symbols: Vec<Symbol>,
    pub imports: Vec<ImportEdge>,
}

/// Order files for extraction: `package.json` entry points and well-known
/// index files first, then the rest ascending by size so small files finish
/// before a tight deadline.
pub fn prioritize<'a>(files: &'a [DiscoveredFile], entry_points: &HashSet<String>) -> Vec<&'a DiscoveredFile> {
    let mut eligible: Vec<&DiscoveredFile> = files
        .iter()
        .filter(|f| {
            let ext = f.extension.to_lowercase();
            EXTRACTABLE_EXTENSIONS.contains(&ext.as_str())
        })
        .collect();

    eligible.sort_by(|a, b| {
        let a_entry = is_entry_point(a, entry_points);
        let b_entry = is_entry_point(b, entry_points);
        b_entry.cmp(&a_entry).then(a.size_bytes.cmp(&b.size_bytes))
    });

    eligible
}

fn is_entry_point(file: &DiscoveredFile, entry_points: &HashSet<String>) -> bool {
    if entry_points.contains(&file.relative_path) {
        return true;
    }
    let stem = Path::new(&file.name).file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
    file.directory.is_empty() && (stem == "index" || stem == "main")
}

/// Read `package.json` at the workspace root and resolve the relative paths
/// its `main`, `module`, and `exports` (recursively walked string leaves)
/// fields point at against the discovered-file set — the same
/// strip-extension-then-probe resolution `resolve_import` uses for a source
/// file's own import specifiers, since a `main: "./src/index.js"` entry must
/// bubble to the front even when the actual source is `src/index.ts`.
pub fn read_entry_points(root: &Path, known_relative_paths: &HashSet<String>) -> HashSet<String> {
    let mut raw = HashSet::new();
    let Ok(contents) = std::fs::read_to_string(root.join("package.json")) else {
        return HashSet::new();
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(&contents) else {
        return HashSet::new();
    };

    for key in ["main", "module"] {
        if let Some(s) = value.get(key).and_then(|v| v.as_str()) {
            raw.insert(s.to_string());
        }
    }
    if let Some(exports) = value.get("exports") {
        collect_string_leaves(exports, &mut raw);
    }

    let workspace_root = Path::new("");
    raw.iter().filter_map(|spec| resolve_import(workspace_root, spec, known_relative_paths)).collect()
}

fn collect_string_leaves(value: &serde_json::Value, out: &mut HashSet<String>) {
    match value {
        serde_json::Value::String(s) => {
            out.insert(s.to_string());
        }
        serde_json::Value::Object(map) => {
            for v in map.values() {
                collect_string_leaves(v, out);
            }
        }
        serde_json::Value::Array(items) => {
            for v in items {
                collect_string_leaves(v, out);
            }
        }
        _ => {}
    }
}

/// Scan a single file's already-read text for symbols and import edges.
/// `path_by_relative` is used to resolve relative import targets against the
/// discovered-file set; `source_relative_path` is this file's own relative path,
/// `source_absolute_path` is used verbatim on the symbols it produces.
pub fn extract_from_text(
    source_relative_path: &str,
    source_absolute_path: &Path,
    text: &str,
    path_by_relative: &HashSet<String>,
) -> FileExtraction {
    let symbols = extract_symbols(source_absolute_path, text);
    let imports = extract_imports(source_relative_path, text, path_by_relative);
    FileExtraction { symbols, imports }
}

fn line_of(text: &str, byte_offset: usize) -> usize {
    text.as_bytes()[..byte_offset].iter().filter(|&&b| b == b'\n').count() + 1
}

fn extract_symbols(source_absolute_path: &Path, text: &str) -> Vec<Symbol> {
    let export_list_re = Regex::new(r"export\s*\{([^}]*)\}").unwrap();
    let mut exported_names: HashSet<String> = HashSet::new();
    for caps in export_list_re.captures_iter(text) {
        for entry in caps[1].split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let original = entry.split(" as ").next().unwrap_or(entry).trim();
            if !original.is_empty() {
                exported_names.insert(original.to_string());
            }
        }
    }

    let patterns: &[(SymbolKind, &str)] = &[
        (SymbolKind::Function, r"(?m)^\s*(export\s+)?(async\s+)?function\s+(?P<name>[A-Za-z_$][\w$]*)"),
        (SymbolKind::Class, r"(?m)^\s*(export\s+)?class\s+(?P<name>[A-Za-z_$][\w$]*)"),
        (SymbolKind::Type, r"(?m)^\s*(export\s+)?type\s+(?P<name>[A-Za-z_$][\w$]*)"),
        (SymbolKind::Interface, r"(?m)^\s*(export\s+)?interface\s+(?P<name>[A-Za-z_$][\w$]*)"),
        (SymbolKind::Enum, r"(?m)^\s*(export\s+)?enum\s+(?P<name>[A-Za-z_$][\w$]*)"),
        (SymbolKind::Variable, r"(?m)^\s*(export\s+)?(const|let|var)\s+(?P<name>[A-Za-z_$][\w$]*)"),
    ];

    let mut symbols = Vec::new();
    for (kind, pattern) in patterns {
        let re = Regex::new(pattern).unwrap();
        for caps in re.captures_iter(text) {
            let Some(name_match) = caps.name("name") else { continue };
            let name = name_match.as_str().to_string();
            let declared_exported = caps.get(1).is_some();
            let is_exported = declared_exported || exported_names.contains(&name);
            let line = line_of(text, caps.get(0).unwrap().start());
            symbols.push(Symbol {
                name,
                kind: *kind,
                file_path: source_absolute_path.to_path_buf(),
                line,
                is_exported,
            });
        }
    }

    symbols.sort_by_key(|s| s.line);
    symbols
}

fn extract_imports(
    source_relative_path: &str,
    text: &str,
    known_relative_paths: &HashSet<String>,
) -> Vec<ImportEdge> {
    let static_re = Regex::new(
        r#"import\s+(?:(?P<named>\{[^}]*\})|(?P<namespace>\*\s+as\s+[A-Za-z_$][\w$]*)|(?P<default>[A-Za-z_$][\w$]*))?\s*(?:,\s*(?:\{[^}]*\}|\*\s+as\s+[A-Za-z_$][\w$]*))?\s*from\s*["'](?P<path>[^"']+)["']"#,
    )
    .unwrap();
    let dynamic_re = Regex::new(r#"import\s*\(\s*["'](?P<path>[^"']+)["']\s*\)"#).unwrap();

    let source_dir = Path::new(source_relative_path).parent().unwrap_or_else(|| Path::new(""));

    let mut edges = Vec::new();

    for caps in static_re.captures_iter(text) {
        let spec = caps.name("path").unwrap().as_str();
        if !spec.starts_with('.') {
            continue;
        }
        let Some(resolved) = resolve_import(source_dir, spec, known_relative_paths) else { continue };
        let names = import_names(&caps);
        edges.push(ImportEdge {
            source_file: source_relative_path.to_string(),
            target_file: resolved,
            imported_names: names,
        });
    }

    for caps in dynamic_re.captures_iter(text) {
        let spec = caps.name("path").unwrap().as_str();
        if !spec.starts_with('.') {
            continue;
        }
        let Some(resolved) = resolve_import(source_dir, spec, known_relative_paths) else { continue };
        edges.push(ImportEdge {
            source_file: source_relative_path.to_string(),
            target_file: resolved,
            imported_names: vec!["*".to_string()],
        });
    }

    edges
}

fn import_names(caps: &regex::Captures<'_>) -> Vec<String> {
    if let Some(named) = caps.name("named") {
        named
            .as_str()
            .trim_matches(|c| c == '{' || c == '}')
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.split(" as ").last().unwrap_or(s).trim().to_string())
            .collect()
    } else if let Some(namespace) = caps.name("namespace") {
        vec![namespace.as_str().trim().to_string()]
    } else if let Some(default) = caps.name("default") {
        vec![default.as_str().trim().to_string()]
    } else {
        Vec::new()
    }
}

/// Resolve a relative import specifier against the discovered-file set.
/// Tries both the stripped (`.js` removed) and original specifier, each
/// against a fixed probe order of extensionless / known extensions / index
/// files.
fn resolve_import(source_dir: &Path, spec: &str, known_relative_paths: &HashSet<String>) -> Option<String> {
    let stripped = spec.strip_suffix(".js").unwrap_or(spec);

    for candidate_spec in [stripped, spec] {
        let base = normalize_relative(source_dir, candidate_spec);

        if known_relative_paths.contains(&base) {
            return Some(base);
        }
        for ext in RESOLUTION_EXTENSIONS {
            let with_ext = format!("{base}.{ext}");
            if known_relative_paths.contains(&with_ext) {
                return Some(with_ext);
            }
        }
        for index in ["index.ts", "index.js"] {
            let indexed = if base.is_empty() { index.to_string() } else { format!("{base}/{index}") };
            if known_relative_paths.contains(&indexed) {
                return Some(indexed);
            }
        }
    }

    None
}

fn normalize_relative(source_dir: &Path, spec: &str) -> String {
    let joined = source_dir.join(spec);
    let mut parts: Vec<&str> = Vec::new();
    for segment in joined.to_string_lossy().replace('\\', "/").split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Invert a forward import graph (`source -> targets`) into `target -> sources`.
pub fn invert_imports(imports: &HashMap<String, Vec<String>>) -> HashMap<String, Vec<String>> {
    let mut inverted: HashMap<String, Vec<String>> = HashMap::new();
    for (source, targets) in imports {
        for target in targets {
            inverted.entry(target.clone()).or_default().push(source.clone());
        }
    }
    inverted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(paths: &[&str]) -> HashSet<String> {
        paths.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn extracts_exported_function() {
        let text = "export function doThing() {\n  return 1;\n}\n";
        let symbols = extract_symbols(Path::new("src/index.ts"), text);
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "doThing");
        assert_eq!(symbols[0].kind, SymbolKind::Function);
        assert!(symbols[0].is_exported);
        assert_eq!(symbols[0].line, 1);
    }

    #[test]
    fn export_list_marks_prior_declaration_exported() {
        let text = "function helper() {}\nconst x = 1;\nexport { helper, x as y };\n";
        let symbols = extract_symbols(Path::new("src/index.ts"), text);
        let helper = symbols.iter().find(|s| s.name == "helper").unwrap();
        let x = symbols.iter().find(|s| s.name == "x").unwrap();
        assert!(helper.is_exported);
        assert!(x.is_exported);
    }

    #[test]
    fn unexported_symbol_is_not_marked_exported() {
        let text = "function helper() {}\n";
        let symbols = extract_symbols(Path::new("src/index.ts"), text);
        assert!(!symbols[0].is_exported);
    }

    #[test]
    fn resolves_named_import_to_known_file() {
        let known_paths = known(&["src/index.ts", "src/util.ts"]);
        let text = "import { helper } from \"./util\";\n";
        let edges = extract_imports("src/index.ts", text, &known_paths);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].target_file, "src/util.ts");
        assert_eq!(edges[0].imported_names, vec!["helper"]);
    }

    #[test]
    fn resolves_stripped_js_extension_to_ts() {
        let known_paths = known(&["src/index.ts", "src/util.ts"]);
        let text = "import { helper } from \"./util.js\";\n";
        let edges = extract_imports("src/index.ts", text, &known_paths);
        assert_eq!(edges[0].target_file, "src/util.ts");
    }

    #[test]
    fn resolves_index_file() {
        let known_paths = known(&["src/index.ts", "src/lib/index.ts"]);
        let text = "import { helper } from \"./lib\";\n";
        let edges = extract_imports("src/index.ts", text, &known_paths);
        assert_eq!(edges[0].target_file, "src/lib/index.ts");
    }

    #[test]
    fn bare_module_specifiers_are_ignored() {
        let known_paths = known(&["src/index.ts"]);
        let text = "import { z } from \"zod\";\n";
        let edges = extract_imports("src/index.ts", text, &known_paths);
        assert!(edges.is_empty());
    }

    #[test]
    fn dynamic_import_yields_wildcard_names() {
        let known_paths = known(&["src/index.ts", "src/lazy.ts"]);
        let text = "const m = await import(\"./lazy\");\n";
        let edges = extract_imports("src/index.ts", text, &known_paths);
        assert_eq!(edges[0].imported_names, vec!["*"]);
    }

    #[test]
    fn unresolved_import_is_dropped() {
        let known_paths = known(&["src/index.ts"]);
        let text = "import { helper } from \"./does-not-exist\";\n";
        let edges = extract_imports("src/index.ts", text, &known_paths);
        assert!(edges.is_empty());
    }

    #[test]
    fn read_entry_points_resolves_js_main_to_ts_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), r#"{"main": "./src/index.js"}"#).unwrap();
        let known_paths = known(&["src/index.ts"]);

        let entry_points = read_entry_points(dir.path(), &known_paths);
        assert!(entry_points.contains("src/index.ts"));
    }

    #[test]
    fn prioritizes_entry_points_and_small_files() {
        let files = vec![
            DiscoveredFile {
                absolute_path: "/root/src/big.ts".into(),
                relative_path: "src/big.ts".into(),
                name: "big.ts".into(),
                extension: "ts".into(),
                directory: "src".into(),
                size_bytes: 5000,
                category: crate::types::Category::Code,
                modified: chrono::Utc::now(),
            },
            DiscoveredFile {
                absolute_path: "/root/index.ts".into(),
                relative_path: "index.ts".into(),
                name: "index.ts".into(),
                extension: "ts".into(),
                directory: "".into(),
                size_bytes: 9000,
                category: crate::types::Category::Code,
                modified: chrono::Utc::now(),
            },
            DiscoveredFile {
                absolute_path: "/root/src/small.ts".into(),
                relative_path: "src/small.ts".into(),
                name: "small.ts".into(),
                extension: "ts".into(),
                directory: "src".into(),
                size_bytes: 10,
                category: crate::types::Category::Code,
                modified: chrono::Utc::now(),
            },
        ];
        let entry_points = HashSet::new();
        let ordered = prioritize(&files, &entry_points);
        assert_eq!(ordered[0].relative_path, "index.ts");
        assert_eq!(ordered[1].relative_path, "src/small.ts");
        assert_eq!(ordered[2].relative_path, "src/big.ts");
    }
}
