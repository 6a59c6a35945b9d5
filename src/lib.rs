//! Sass variable extraction
//!
//! Reads the variables declared at the root of a Sass stylesheet and returns
//! their evaluated values as a typed, serializable tree, so build tooling can
//! consume design tokens (colors, sizes, strings, lists, maps, booleans)
//! without parsing Sass itself.
//!
//! # Basic Usage
//!
//! ```rust,no_run
//! use sass_vars::{extract_file, ExtractOptions, Result};
//!
//! fn main() -> Result<()> {
//!     let variables = extract_file("theme.scss", ExtractOptions::default())?;
//!     for (name, value) in &variables {
//!         println!("{} = {:?}", name, value);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Extraction Pipeline
//!
//! 1. **Pre-processing**: parse the source into a syntax tree
//! 2. **Scanning**: collect the names of root-scope variable declarations
//! 3. **Trailer**: append a statement passing every variable to a hook function
//! 4. **Compilation**: compile the augmented source; the compiler calls the hook
//! 5. **Reification**: turn the values the hook received into [`ReifiedValue`]s

pub mod cli;
pub mod compiler;
pub mod config;
pub mod error;
pub mod importer;
pub mod preprocessor;
pub mod reify;
pub mod scanner;
pub mod trailer;

use indexmap::IndexSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

pub use compiler::value::Value;
pub use compiler::{CompileOutput, Compiler};
pub use config::{CompilerConfig, CustomFunction, OutputStyle, PreprocessorConfig};
pub use error::{ExtractError, Result};
pub use importer::{Importer, ImporterResult, RelativeImporter};
pub use preprocessor::Syntax;
pub use reify::{reify, ColorValue, ReifiedValue, VariableMap};
pub use trailer::HookName;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Caller settings for one extraction
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    pub preprocessor: PreprocessorConfig,
    pub compiler: CompilerConfig,
    /// Overrides [`HookName::DEFAULT`]
    pub hook_name: Option<String>,
}

impl ExtractOptions {
    pub fn with_load_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.compiler.load_paths.push(path.into());
        self
    }

    pub fn with_hook_name(mut self, name: impl Into<String>) -> Self {
        self.hook_name = Some(name.into());
        self
    }
}

/// Extract the root variables of the stylesheet at `path`.
pub fn extract_file(path: impl AsRef<Path>, options: ExtractOptions) -> Result<VariableMap> {
    let (source, origin) = read_source(path.as_ref())?;
    extract_source(&source, Some(&origin), options)
}

/// Extract the root variables of the stylesheet at `path` without blocking
/// the runtime; parsing and compilation run on tokio's blocking pool.
pub async fn extract_file_async(path: impl AsRef<Path>, options: ExtractOptions) -> Result<VariableMap> {
    let (source, origin) = read_source(path.as_ref())?;
    extract_source_async(source, Some(origin), options).await
}

/// Extract the root variables of stylesheet source text.
pub fn extract_string(source: &str, options: ExtractOptions) -> Result<VariableMap> {
    extract_source(source, None, options)
}

pub async fn extract_string_async(source: impl Into<String>, options: ExtractOptions) -> Result<VariableMap> {
    extract_source_async(source.into(), None, options).await
}

/// Names of the root variables declared in `source`, without compiling it
pub fn discover_variables(source: &str, config: &PreprocessorConfig) -> Result<IndexSet<String>> {
    let root = preprocessor::parse(source, config)?;
    Ok(scanner::scan(&root))
}

/// Settings shared by the sync and async pipelines
struct Pipeline {
    hook: HookName,
    syntax: Syntax,
    preprocessor: PreprocessorConfig,
    compiler: CompilerConfig,
}

impl Pipeline {
    fn new(origin: Option<&Path>, options: ExtractOptions) -> Result<Self> {
        let hook = HookName::from_option(options.hook_name.as_deref())?;

        // A file's own extension decides its syntax; source text is SCSS
        // unless the caller says otherwise.
        let syntax = match origin {
            Some(path) => Syntax::from_path(path),
            None => options.compiler.syntax.unwrap_or_default(),
        };
        let directory = origin.and_then(Path::parent).map(Path::to_path_buf);
        let base = match &directory {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        };

        let preprocessor = config::merge_preprocessor(
            PreprocessorConfig {
                syntax: Some(syntax),
                from: origin.map(Path::to_path_buf),
            },
            options.preprocessor,
        );
        let required = CompilerConfig {
            importers: vec![Arc::new(RelativeImporter::new(base))],
            load_paths: directory.into_iter().collect(),
            syntax: Some(syntax),
            url: origin.map(Path::to_path_buf),
            ..Default::default()
        };
        let compiler = config::merge_compiler(required, options.compiler);

        Ok(Self {
            hook,
            syntax,
            preprocessor,
            compiler,
        })
    }

    fn augment(&self, source: &str, root: &preprocessor::Root) -> String {
        let names = scanner::scan(root);
        trailer::synthesize(source, &names, &self.hook, self.syntax)
    }

    /// Register the hook ahead of every caller function; `deliver` receives
    /// the reified variables.
    fn with_hook<F>(self, deliver: F) -> (HookName, CompilerConfig)
    where
        F: Fn(VariableMap) + Send + Sync + 'static,
    {
        let hook = self.hook;
        let name = hook.to_string();
        let required = CompilerConfig::default().with_function(&hook.signature(), move |args| {
            let packed = args
                .first()
                .and_then(Value::try_map)
                .ok_or_else(|| ExtractError::function(name.as_str(), "expected a map of variables"))?;
            deliver(reify::reify_variables(&packed));
            Ok(Value::unquoted("''"))
        });
        (hook, config::merge_compiler(required, self.compiler))
    }
}

fn read_source(path: &Path) -> Result<(String, PathBuf)> {
    let origin = fs::canonicalize(path).map_err(|e| ExtractError::FileNotFound {
        path: format!("{}: {}", path.display(), e),
    })?;
    let source = fs::read_to_string(&origin).map_err(|e| ExtractError::FileNotFound {
        path: format!("{}: {}", origin.display(), e),
    })?;
    log::debug!("Read {} ({} bytes)", origin.display(), source.len());
    Ok((source, origin))
}

fn extract_source(source: &str, origin: Option<&Path>, options: ExtractOptions) -> Result<VariableMap> {
    let pipeline = Pipeline::new(origin, options)?;

    // STAGE 1: PRE-PROCESSING AND SCANNING
    let root = preprocessor::parse(source, &pipeline.preprocessor)?;
    let augmented = pipeline.augment(source, &root);

    // STAGE 2: COMPILATION
    let cell: Arc<OnceLock<VariableMap>> = Arc::new(OnceLock::new());
    let slot = cell.clone();
    let (hook, compiler_config) = pipeline.with_hook(move |variables| {
        let _ = slot.set(variables);
    });
    Compiler::new().compile_string(&augmented, &compiler_config)?;

    // STAGE 3: COLLECTION
    let variables = cell
        .get()
        .cloned()
        .ok_or_else(|| ExtractError::HookNotInvoked { hook: hook.to_string() })?;
    log::debug!("Extracted {} variable(s)", variables.len());
    Ok(variables)
}

async fn extract_source_async(source: String, origin: Option<PathBuf>, options: ExtractOptions) -> Result<VariableMap> {
    let pipeline = Pipeline::new(origin.as_deref(), options)?;

    // STAGE 1: PRE-PROCESSING AND SCANNING
    let root = preprocessor::parse_async(source.clone(), pipeline.preprocessor.clone()).await?;
    let augmented = pipeline.augment(&source, &root);

    // STAGE 2: COMPILATION
    let (sender, mut receiver) = tokio::sync::oneshot::channel();
    let sender = Mutex::new(Some(sender));
    let (hook, compiler_config) = pipeline.with_hook(move |variables| {
        if let Some(sender) = sender.lock().ok().and_then(|mut slot| slot.take()) {
            let _ = sender.send(variables);
        }
    });
    Compiler::new()
        .compile_string_async(augmented, compiler_config)
        .await?;

    // STAGE 3: COLLECTION
    let variables = receiver
        .try_recv()
        .map_err(|_| ExtractError::HookNotInvoked { hook: hook.to_string() })?;
    log::debug!("Extracted {} variable(s)", variables.len());
    Ok(variables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const THEME: &str = r#"@import 'tokens';

$foo: 1;
$bar: 10px;
$baz: none;
$qux: 'string';
$quux: 10px 20px 30px none 'string';
$corge: (10px, 20px, 30px, none, "string");
$grault: (garply: (waldo: $bar), 'fred': $qux);
$garply: black;
$waldo: #FFF;
$fred: rgba(white, 0.5);
$plugh: $imported;
$xyzzy: true;
$thud: false;
$bla: $foo == 1;
$blubb: not $xyzzy;

.nested {
  $inner: 5;
  width: $bar;
}
"#;

    fn number(value: f64, unit: &str) -> ReifiedValue {
        ReifiedValue::Number {
            value,
            unit: unit.to_string(),
        }
    }

    fn string(value: &str) -> ReifiedValue {
        ReifiedValue::String {
            value: value.to_string(),
        }
    }

    fn color(r: u8, g: u8, b: u8, a: f64, hex: &str) -> ReifiedValue {
        ReifiedValue::Color {
            value: ColorValue {
                r,
                g,
                b,
                a,
                hex: hex.to_string(),
            },
        }
    }

    fn theme_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("theme.scss"), THEME).unwrap();
        fs::write(dir.path().join("_tokens.scss"), "$imported: 1;\n").unwrap();
        dir
    }

    fn check_theme(variables: &VariableMap) {
        let keys: Vec<&str> = variables.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "$foo", "$bar", "$baz", "$qux", "$quux", "$corge", "$grault", "$garply", "$waldo", "$fred", "$plugh",
                "$xyzzy", "$thud", "$bla", "$blubb"
            ]
        );

        assert_eq!(variables["$foo"], number(1.0, ""));
        assert_eq!(variables["$bar"], number(10.0, "px"));
        assert_eq!(variables["$baz"], string("none"));
        assert_eq!(variables["$qux"], string("string"));

        let list = ReifiedValue::List {
            value: vec![
                number(10.0, "px"),
                number(20.0, "px"),
                number(30.0, "px"),
                string("none"),
                string("string"),
            ],
        };
        assert_eq!(variables["$quux"], list);
        assert_eq!(variables["$corge"], list);

        let mut waldo = indexmap::IndexMap::new();
        waldo.insert("waldo".to_string(), number(10.0, "px"));
        let mut grault = indexmap::IndexMap::new();
        grault.insert("garply".to_string(), ReifiedValue::Map { value: waldo });
        grault.insert("fred".to_string(), string("string"));
        assert_eq!(variables["$grault"], ReifiedValue::Map { value: grault });

        assert_eq!(variables["$garply"], color(0, 0, 0, 1.0, "#000000"));
        assert_eq!(variables["$waldo"], color(255, 255, 255, 1.0, "#ffffff"));
        assert_eq!(variables["$fred"], color(255, 255, 255, 0.5, "#ffffff"));
        assert_eq!(variables["$plugh"], number(1.0, ""));
        assert_eq!(variables["$xyzzy"], ReifiedValue::Boolean { value: true });
        assert_eq!(variables["$thud"], ReifiedValue::Boolean { value: false });
        assert_eq!(variables["$bla"], ReifiedValue::Boolean { value: true });
        assert_eq!(variables["$blubb"], ReifiedValue::Boolean { value: false });
    }

    #[test]
    fn test_extract_string_with_load_path() {
        let dir = theme_dir();
        let options = ExtractOptions::default().with_load_path(dir.path());
        check_theme(&extract_string(THEME, options).unwrap());
    }

    #[test]
    fn test_extract_file() {
        let dir = theme_dir();
        check_theme(&extract_file(dir.path().join("theme.scss"), ExtractOptions::default()).unwrap());
    }

    #[tokio::test]
    async fn test_extract_string_async() {
        let dir = theme_dir();
        let options = ExtractOptions::default().with_load_path(dir.path());
        check_theme(&extract_string_async(THEME, options).await.unwrap());
    }

    #[tokio::test]
    async fn test_extract_file_async() {
        let dir = theme_dir();
        let variables = extract_file_async(dir.path().join("theme.scss"), ExtractOptions::default())
            .await
            .unwrap();
        check_theme(&variables);
    }

    #[test]
    fn test_nested_variables_are_not_captured() {
        let variables = extract_string("$a: 1; $b: 1px; .x { $c: 2; }", ExtractOptions::default()).unwrap();
        assert_eq!(variables.len(), 2);
        assert_eq!(variables["$a"], number(1.0, ""));
        assert_eq!(variables["$b"], number(1.0, "px"));
        assert!(!variables.contains_key("$c"));
    }

    #[test]
    fn test_last_write_wins() {
        let source = "$a: 1;\n$b: $a * 2;\n$a: 3;\n";
        let variables = extract_string(source, ExtractOptions::default()).unwrap();
        assert_eq!(variables.len(), 2);
        assert_eq!(variables["$a"], number(3.0, ""));
        assert_eq!(variables["$b"], number(2.0, ""));
    }

    #[test]
    fn test_conditional_assignment_reports_final_value() {
        let source = "$dark: true;\n$bg: white;\n@if $dark { $bg: black; }\n";
        let variables = extract_string(source, ExtractOptions::default()).unwrap();
        assert_eq!(variables["$bg"], color(0, 0, 0, 1.0, "#000000"));
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let first = extract_string("$x: 2em; $y: (a: 1, b: 'two');", ExtractOptions::default()).unwrap();
        let second = extract_string("$x: 2em; $y: (a: 1, b: 'two');", ExtractOptions::default()).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_async_extraction_is_idempotent() {
        let source = "$x: 2em; $y: (a: 1, b: 'two');";
        let first = extract_string_async(source, ExtractOptions::default()).await.unwrap();
        let second = extract_string_async(source, ExtractOptions::default()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first, extract_string(source, ExtractOptions::default()).unwrap());
    }

    #[test]
    fn test_hsl_derived_colors() {
        let variables = extract_string(
            "$a: hsl(210, 50%, 50%); $b: lighten(#336699, 10%);",
            ExtractOptions::default(),
        )
        .unwrap();
        assert_eq!(variables["$a"], color(64, 128, 191, 1.0, "#4080bf"));
        assert_eq!(variables["$b"], variables["$a"]);
    }

    #[test]
    fn test_source_without_variables() {
        let variables = extract_string(".a { color: red; }", ExtractOptions::default()).unwrap();
        assert!(variables.is_empty());
    }

    #[test]
    fn test_null_variables_are_omitted() {
        let variables = extract_string("$a: null; $b: 1;", ExtractOptions::default()).unwrap();
        let keys: Vec<&String> = variables.keys().collect();
        assert_eq!(keys, vec!["$b"]);
    }

    #[test]
    fn test_function_value_is_unknown() {
        let variables = extract_string("$f: get-function('darken');", ExtractOptions::default()).unwrap();
        assert_eq!(
            variables["$f"],
            ReifiedValue::Unknown {
                value: serde_json::json!("darken")
            }
        );
    }

    #[test]
    fn test_trailing_line_comment() {
        let variables = extract_string("$a: 1; // the end", ExtractOptions::default()).unwrap();
        assert_eq!(variables["$a"], number(1.0, ""));
    }

    #[test]
    fn test_indented_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("theme.sass");
        fs::write(&path, "$gap: 4px\n$pad: $gap * 2\n.card\n  padding: $pad\n").unwrap();

        let variables = extract_file(&path, ExtractOptions::default()).unwrap();
        assert_eq!(variables["$pad"], number(8.0, "px"));
    }

    #[test]
    fn test_custom_hook_name() {
        let options = ExtractOptions::default().with_hook_name("collect");
        let variables = extract_string("$a: 1;", options).unwrap();
        assert_eq!(variables["$a"], number(1.0, ""));

        let invalid = ExtractOptions::default().with_hook_name("not valid");
        assert!(matches!(
            extract_string("$a: 1;", invalid),
            Err(ExtractError::InvalidHookName { .. })
        ));
    }

    #[test]
    fn test_user_functions_are_kept() {
        let mut options = ExtractOptions::default();
        options.compiler = CompilerConfig::default().with_function("double($n)", |args| {
            let n = args[0].assert_number("n")?;
            Ok(Value::number_with_unit(n.value * 2.0, &n.unit_string()))
        });
        let variables = extract_string("$a: double(3px);", options).unwrap();
        assert_eq!(variables["$a"], number(6.0, "px"));
    }

    #[test]
    fn test_shadowed_hook_is_reported() {
        let source = "@function __nirvana__($v) { @return 1; }\n$a: 1;";
        match extract_string(source, ExtractOptions::default()) {
            Err(ExtractError::HookNotInvoked { hook }) => assert_eq!(hook, "__nirvana__"),
            other => panic!("expected HookNotInvoked, got {:?}", other),
        }
    }

    #[test]
    fn test_compile_errors_propagate() {
        let err = extract_string("$a: $missing;", ExtractOptions::default()).unwrap_err();
        assert!(matches!(err, ExtractError::Compile { .. }));
        assert!(err.to_string().contains("Undefined variable"));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = extract_file(dir.path().join("absent.scss"), ExtractOptions::default()).unwrap_err();
        assert!(matches!(err, ExtractError::FileNotFound { .. }));
    }

    #[test]
    fn test_relative_import_from_subdirectory() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("parts")).unwrap();
        fs::write(dir.path().join("parts/_colors.scss"), "@import 'base';\n$accent: $base;\n").unwrap();
        fs::write(dir.path().join("parts/_base.scss"), "$base: #336699;\n").unwrap();
        fs::write(dir.path().join("main.scss"), "@import 'parts/colors';\n$brand: $accent;\n").unwrap();

        let variables = extract_file(dir.path().join("main.scss"), ExtractOptions::default()).unwrap();
        assert_eq!(variables["$brand"], color(0x33, 0x66, 0x99, 1.0, "#336699"));
    }

    #[tokio::test]
    async fn test_concurrent_async_extractions_are_isolated() {
        let (a, b) = tokio::join!(
            extract_string_async("$v: 1;", ExtractOptions::default()),
            extract_string_async("$v: 2px; $w: true;", ExtractOptions::default())
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a.len(), 1);
        assert_eq!(a["$v"], number(1.0, ""));
        assert_eq!(b.len(), 2);
        assert_eq!(b["$v"], number(2.0, "px"));
    }

    #[test]
    fn test_discover_variables() {
        let names = discover_variables("$a: 1; .x { $b: 2; } $c: 3; $a: 4;", &PreprocessorConfig::default()).unwrap();
        let names: Vec<String> = names.into_iter().collect();
        assert_eq!(names, vec!["$a", "$c"]);
    }
}
