// FILE: src/cli/handlers.rs
use crate::{
    cli::OutputFormat, discover_variables, extract_file, extract_file_async, Compiler, ExtractError, ExtractOptions,
    PreprocessorConfig, Result, Syntax, VariableMap,
};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Instant;

fn input_arg(matches: &clap::ArgMatches) -> Result<&String> {
    matches
        .get_one::<String>("input")
        .ok_or_else(|| ExtractError::InvalidFormat {
            message: "missing input path".to_string(),
        })
}

// --- EXTRACT ---
pub fn handle_extract_command(cli: &super::Cli, matches: &clap::ArgMatches) -> Result<()> {
    let input_path = Path::new(input_arg(matches)?);
    let options = cli.build_extract_options(matches);
    let format = matches
        .get_one::<OutputFormat>("format")
        .copied()
        .unwrap_or(OutputFormat::Pretty);
    let output = matches.get_one::<String>("output").map(PathBuf::from);
    let use_async = matches.get_flag("async");

    if matches.get_flag("watch") {
        watch_and_extract(input_path, &options, format, output.as_deref(), use_async)
    } else {
        extract_and_write(input_path, &options, format, output.as_deref(), use_async)
    }
}

fn extract_and_write(
    input_path: &Path,
    options: &ExtractOptions,
    format: OutputFormat,
    output: Option<&Path>,
    use_async: bool,
) -> Result<()> {
    let start = Instant::now();
    let inputs = collect_inputs(input_path)?;
    let results = if use_async {
        extract_all_async(&inputs, options)?
    } else {
        inputs
            .iter()
            .map(|path| Ok((path.display().to_string(), extract_file(path, options.clone())?)))
            .collect::<Result<Vec<_>>>()?
    };
    log::info!(
        "Extracted {} stylesheet(s) in {}ms",
        results.len(),
        start.elapsed().as_millis()
    );

    let rendered = render(&results, format, input_path.is_dir())?;
    match output {
        Some(path) => {
            fs::write(path, rendered)?;
            println!("✅ Wrote {}", path.display());
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

fn extract_all_async(inputs: &[PathBuf], options: &ExtractOptions) -> Result<Vec<(String, VariableMap)>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .build()
        .map_err(ExtractError::Io)?;
    runtime.block_on(async {
        let mut results = Vec::with_capacity(inputs.len());
        for path in inputs {
            let variables = extract_file_async(path, options.clone()).await?;
            results.push((path.display().to_string(), variables));
        }
        Ok::<_, ExtractError>(results)
    })
}

fn watch_and_extract(
    input_path: &Path,
    options: &ExtractOptions,
    format: OutputFormat,
    output: Option<&Path>,
    use_async: bool,
) -> Result<()> {
    println!("👀 Watching {} for changes...", input_path.display());

    let (tx, rx) = channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                if let Err(e) = tx.send(event) {
                    eprintln!("Watch error: {}", e);
                }
            }
        },
        notify::Config::default(),
    )
    .map_err(|e| {
        ExtractError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("Failed to create file watcher: {}", e),
        ))
    })?;

    // Imports usually live next to the entry stylesheet
    let watched = if input_path.is_dir() {
        input_path
    } else {
        input_path.parent().unwrap_or(input_path)
    };
    watcher.watch(watched, RecursiveMode::Recursive).map_err(|e| {
        ExtractError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("Failed to watch {}: {}", watched.display(), e),
        ))
    })?;

    if let Err(e) = extract_and_write(input_path, options, format, output, use_async) {
        eprintln!("❌ Initial extraction failed: {}", e);
    }

    loop {
        match rx.recv() {
            Ok(event) => {
                let relevant = event.paths.iter().any(|path| is_stylesheet(path));
                if !relevant || event.kind.is_access() {
                    continue;
                }
                println!("🔄 Stylesheet changed, extracting...");
                if let Err(e) = extract_and_write(input_path, options, format, output, use_async) {
                    eprintln!("❌ Extraction failed: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Watch error: {}", e);
                break;
            }
        }
    }

    Ok(())
}

fn is_stylesheet(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("scss") | Some("sass") | Some("css")
    )
}

/// The file itself, or every non-partial stylesheet below a directory
fn collect_inputs(input_path: &Path) -> Result<Vec<PathBuf>> {
    if !input_path.is_dir() {
        return Ok(vec![input_path.to_path_buf()]);
    }

    let mut inputs = Vec::new();
    for entry in walkdir::WalkDir::new(input_path).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            ExtractError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Directory traversal error: {}", e),
            ))
        })?;
        let path = entry.path();
        let partial = entry.file_name().to_string_lossy().starts_with('_');
        let scss = matches!(path.extension().and_then(|ext| ext.to_str()), Some("scss") | Some("sass"));
        if entry.file_type().is_file() && scss && !partial {
            inputs.push(path.to_path_buf());
        }
    }
    log::debug!("Found {} stylesheet(s) in {}", inputs.len(), input_path.display());
    Ok(inputs)
}

fn render(results: &[(String, VariableMap)], format: OutputFormat, keyed: bool) -> Result<String> {
    let to_json_error = |e: serde_json::Error| ExtractError::InvalidFormat {
        message: format!("Failed to serialize variables: {}", e),
    };

    let empty = VariableMap::new();
    let by_file: IndexMap<&str, &VariableMap> = results
        .iter()
        .map(|(path, variables)| (path.as_str(), variables))
        .collect();
    let single = results.first().map_or(&empty, |(_, variables)| variables);

    match (format, keyed) {
        (OutputFormat::Json, true) => serde_json::to_string(&by_file).map_err(to_json_error),
        (OutputFormat::Json, false) => serde_json::to_string(single).map_err(to_json_error),
        (OutputFormat::Pretty, true) => serde_json::to_string_pretty(&by_file).map_err(to_json_error),
        (OutputFormat::Pretty, false) => serde_json::to_string_pretty(single).map_err(to_json_error),
        (OutputFormat::Flat, _) => {
            let mut lines = Vec::new();
            for (path, variables) in results {
                if keyed {
                    lines.push(format!("// {}", path));
                }
                for (name, value) in variables {
                    lines.push(format!("{}: {};", name, value.to_css_string()));
                }
            }
            Ok(lines.join("\n"))
        }
    }
}

// --- NAMES ---
pub fn handle_names_command(matches: &clap::ArgMatches) -> Result<()> {
    let input_path = Path::new(input_arg(matches)?);
    let source = fs::read_to_string(input_path).map_err(|e| ExtractError::FileNotFound {
        path: format!("{}: {}", input_path.display(), e),
    })?;
    let config = PreprocessorConfig {
        syntax: Some(Syntax::from_path(input_path)),
        from: Some(input_path.to_path_buf()),
    };
    for name in discover_variables(&source, &config)? {
        println!("{}", name);
    }
    Ok(())
}

// --- COMPILE ---
pub fn handle_compile_command(cli: &super::Cli, matches: &clap::ArgMatches) -> Result<()> {
    let input_path = Path::new(input_arg(matches)?);
    let source = fs::read_to_string(input_path).map_err(|e| ExtractError::FileNotFound {
        path: format!("{}: {}", input_path.display(), e),
    })?;

    let mut config = cli.build_compiler_config(matches);
    let origin = fs::canonicalize(input_path)?;
    if let Some(dir) = origin.parent() {
        config.load_paths.insert(0, dir.to_path_buf());
    }
    config.syntax = Some(Syntax::from_path(&origin));
    config.url = Some(origin);

    let output = Compiler::new().compile_string(&source, &config)?;
    log::info!("Loaded {} stylesheet(s)", output.loaded_urls.len());
    print!("{}", output.css);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reify::ReifiedValue;
    use tempfile::TempDir;

    fn sample() -> Vec<(String, VariableMap)> {
        let mut variables = VariableMap::new();
        variables.insert(
            "$gap".to_string(),
            ReifiedValue::Number {
                value: 4.0,
                unit: "px".to_string(),
            },
        );
        variables.insert(
            "$font".to_string(),
            ReifiedValue::String {
                value: "Inter".to_string(),
            },
        );
        vec![("theme.scss".to_string(), variables)]
    }

    #[test]
    fn test_render_json() {
        let rendered = render(&sample(), OutputFormat::Json, false).unwrap();
        assert_eq!(
            rendered,
            r#"{"$gap":{"type":"SassNumber","value":4,"unit":"px"},"$font":{"type":"SassString","value":"Inter"}}"#
        );
    }

    #[test]
    fn test_render_keyed_by_file() {
        let rendered = render(&sample(), OutputFormat::Pretty, true).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed["theme.scss"]["$gap"]["unit"], "px");
    }

    #[test]
    fn test_render_flat() {
        assert_eq!(
            render(&sample(), OutputFormat::Flat, false).unwrap(),
            "$gap: 4px;\n$font: Inter;"
        );
        assert!(render(&sample(), OutputFormat::Flat, true)
            .unwrap()
            .starts_with("// theme.scss\n"));
    }

    #[test]
    fn test_collect_inputs_skips_partials() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("a.scss"), "").unwrap();
        fs::write(dir.path().join("_partial.scss"), "").unwrap();
        fs::write(dir.path().join("nested/b.sass"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let inputs = collect_inputs(dir.path()).unwrap();
        let names: Vec<String> = inputs
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.scss", "b.sass"]);

        let single = dir.path().join("a.scss");
        assert_eq!(collect_inputs(&single).unwrap(), vec![single]);
    }
}
