//! Pure classification of a workspace-relative path into a [`Category`].
//!
//! No I/O: classification only ever looks at the path string itself —
//! extension, basename, and path segments — the same textual-pattern style
//! the host repo uses in its own `describe`/`get_category_path` helpers.

use crate::types::Category;

const TEST_SEGMENTS: &[&str] = &["__tests__", "__test__", "test", "tests", "spec", "specs"];

const SCRIPT_SEGMENTS: &[&str] = &["scripts", "infra", "ci", ".github", "meta", "styles"];

const CODE_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "js", "jsx", "mjs", "cjs", "mts", "rs", "go", "py", "rb", "java", "kt", "c", "h",
    "cpp", "cc", "hpp", "cs", "swift", "scala", "php",
];

const DOC_EXTENSIONS: &[&str] = &["md", "mdx", "rst", "adoc", "txt"];

const SCHEMA_EXTENSIONS: &[&str] = &["proto", "graphql", "gql", "sql"];

const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "ini", "cfg", "conf", "env"];

const CONFIG_BASENAMES: &[&str] = &["package.json", "cargo.toml", "dockerfile", ".gitignore"];

const DATA_EXTENSIONS: &[&str] = &["csv", "tsv", "parquet", "ndjson"];

/// Classify a workspace-relative, forward-slash-normalized path.
pub fn categorize(relative_path: &str) -> Category {
    let file_name = relative_path.rsplit('/').next().unwrap_or(relative_path);
    let file_name_lower = file_name.to_lowercase();
    let ext = file_name.rsplit_once('.').map(|(_, e)| e.to_lowercase()).unwrap_or_default();

    let segments: Vec<&str> = relative_path.split('/').collect();

    let is_test_segment = segments.iter().any(|s| TEST_SEGMENTS.contains(&s.to_lowercase().as_str()));
    let is_test_name = is_test_file_name(&file_name_lower);
    if is_test_segment || is_test_name {
        return Category::Test;
    }

    if file_name_lower == "readme.md" || file_name_lower.ends_with(".readme.md") {
        return Category::Docs;
    }
    if DOC_EXTENSIONS.contains(&ext.as_str()) {
        return Category::Docs;
    }

    if file_name_lower == "package.json"
        || CONFIG_BASENAMES.contains(&file_name_lower.as_str())
        || file_name_lower == ".json"
        || ext == "json"
    {
        return Category::Config;
    }
    if CONFIG_EXTENSIONS.contains(&ext.as_str()) {
        return Category::Config;
    }

    if SCHEMA_EXTENSIONS.contains(&ext.as_str()) {
        return Category::Schema;
    }

    if DATA_EXTENSIONS.contains(&ext.as_str()) {
        return Category::Data;
    }

    if CODE_EXTENSIONS.contains(&ext.as_str()) {
        return Category::Code;
    }

    if segments.iter().any(|s| SCRIPT_SEGMENTS.contains(&s.to_lowercase().as_str())) {
        return Category::Other;
    }

    Category::Other
}

fn is_test_file_name(file_name_lower: &str) -> bool {
    let stem = file_name_lower.rsplit_once('.').map(|(s, _)| s).unwrap_or(file_name_lower);
    stem.ends_with(".test") || stem.ends_with(".spec") || stem.starts_with("test_") || stem.ends_with("_test")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_test_files() {
        assert_eq!(categorize("src/__tests__/index.test.ts"), Category::Test);
        assert_eq!(categorize("src/index.test.ts"), Category::Test);
        assert_eq!(categorize("src/foo.spec.js"), Category::Test);
        assert_eq!(categorize("tests/test_foo.py"), Category::Test);
    }

    #[test]
    fn classifies_docs() {
        assert_eq!(categorize("README.md"), Category::Docs);
        assert_eq!(categorize("docs/guide.md"), Category::Docs);
    }

    #[test]
    fn classifies_config() {
        assert_eq!(categorize("package.json"), Category::Config);
        assert_eq!(categorize("config/app.yaml"), Category::Config);
    }

    #[test]
    fn classifies_code() {
        assert_eq!(categorize("src/index.ts"), Category::Code);
        assert_eq!(categorize("src/utils/format.ts"), Category::Code);
    }

    #[test]
    fn classifies_scripts_and_infra_as_other() {
        assert_eq!(categorize("scripts/deploy.sh"), Category::Other);
        assert_eq!(categorize(".github/workflows/ci.yml"), Category::Config);
    }

    #[test]
    fn is_deterministic_and_pure() {
        assert_eq!(categorize("src/index.ts"), categorize("src/index.ts"));
    }
}
