//! vimkit CLI - inspect BFast model files and test entity import.

use std::env;
use std::path::{Path, PathBuf};

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use vimkit::config::Settings;
use vimkit::document::Document;
use vimkit::entity::EntityKind;
use vimkit::import::{ImportEvent, ImportOptions, MemoryStore};
use vimkit::table::ColumnType;
use vimkit::tree::{Node, Tree};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (built ",
    env!("VIMKIT_BUILD_DATE"),
    " ",
    env!("VIMKIT_BUILD_TIME"),
    ")"
);

/// Install the global subscriber. `RUST_LOG` wins over the verbosity flags.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init();
}

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut level = "info";
    let mut config: Option<PathBuf> = None;
    let mut filtered_args: Vec<&str> = Vec::new();
    let mut iter = args[1..].iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-v" | "--verbose" => level = "debug",
            "-vv" | "--trace" => level = "trace",
            "-q" | "--quiet" => level = "error",
            "-c" | "--config" => config = iter.next().map(PathBuf::from),
            _ => filtered_args.push(arg),
        }
    }
    init_tracing(level);

    if filtered_args.is_empty() {
        print_help();
        return;
    }

    let settings = match &config {
        Some(path) => Settings::load(path).unwrap_or_else(|e| fail(&format!("Failed to load settings {}: {}", path.display(), e))),
        None => Settings::load_default(),
    };

    match filtered_args[0] {
        "info" | "i" => cmd_info(require_file(&filtered_args, "info"), &settings),
        "tables" | "t" => cmd_tables(require_file(&filtered_args, "tables"), filtered_args.get(2).copied(), &settings),
        "tree" => cmd_tree(require_file(&filtered_args, "tree"), &settings),
        "import" | "imp" => {
            let json = filtered_args.iter().any(|&s| s == "--json" || s == "-j");
            let mut options = settings.import_options();
            if let Some(pos) = filtered_args.iter().position(|&s| s == "--chunk") {
                match filtered_args.get(pos + 1).and_then(|s| s.parse::<usize>().ok()) {
                    Some(n) if n > 0 => options.chunk_size = n,
                    _ => fail("--chunk needs a positive number"),
                }
            }
            cmd_import(require_file(&filtered_args, "import"), &settings, options, json);
        }
        "version" | "--version" | "-V" => println!("vimkit {VERSION}"),
        "help" | "h" | "-h" | "--help" => print_help(),

        // Default: if file exists, show info; otherwise error
        other => {
            if Path::new(other).exists() {
                cmd_info(other, &settings);
            } else {
                eprintln!("Unknown command: {other}");
                eprintln!();
                print_help();
                std::process::exit(1);
            }
        }
    }
}

fn print_help() {
    println!("vimkit {VERSION} - BFast model toolkit");
    println!();
    println!("USAGE:");
    println!("    vimkit [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    i, info    <file>                 Show container, geometry and table summary");
    println!("    t, tables  <file> [table]         List tables, or the columns of one table");
    println!("    tree       <file>                 Import and print the category/family hierarchy");
    println!("    import     <file> [--chunk N] [--json]");
    println!("                                      Import all entities into memory and report");
    println!("    version                           Show version");
    println!("    h, help                           Show this help");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <file>  Settings file (default: <config dir>/vimkit/settings.json)");
    println!("    -v, --verbose        Show debug output");
    println!("    -vv, --trace         Show trace output (very verbose)");
    println!("    -q, --quiet          Errors only");
    println!();
    println!("RUST_LOG overrides the verbosity flags.");
}

fn fail(msg: &str) -> ! {
    eprintln!("Error: {msg}");
    std::process::exit(1);
}

fn require_file<'a>(args: &[&'a str], command: &str) -> &'a str {
    match args.get(1) {
        Some(path) => path,
        None => {
            eprintln!("Error: missing file argument");
            eprintln!("Usage: vimkit {command} <file.vim>");
            std::process::exit(1);
        }
    }
}

fn open(path: &str, settings: &Settings) -> Document {
    tracing::info!("Opening {path}");
    Document::open(path, settings).unwrap_or_else(|e| fail(&format!("Failed to open {path}: {e}")))
}

fn cmd_info(path: &str, settings: &Settings) {
    let doc = open(path, settings);
    let Some(container) = doc.container() else {
        fail("document has no container");
    };

    println!("File:    {path}");
    println!("Version: {}", container.version());
    println!("Size:    {} bytes ({})", container.byte_len(), if container.source().is_mapped() { "mapped" } else { "in memory" });
    println!("Buffers: {}", container.len());
    for name in container.names() {
        tracing::debug!("  {name}");
    }
    println!();

    if let Some(geometry) = doc.geometry() {
        println!("Geometry attributes: {}", geometry.attributes().len());
        for attr in geometry.attributes() {
            println!("  {:<36} {:>12} bytes", attr.descriptor().to_string(), attr.byte_len());
        }
        match geometry.instanced_bounds() {
            Ok(b) if !b.is_empty() => println!("Bounds: {b:?}"),
            Ok(_) => {}
            Err(e) => eprintln!("Bounds unavailable: {e}"),
        }
        println!();
    }

    if let Some(tables) = doc.tables() {
        println!("Tables:");
        for name in tables.table_names() {
            match tables.read_table(name) {
                Ok(t) => println!("  {:<24} {:>10} rows  {:>3} columns", name, t.row_count(), t.columns().len()),
                Err(e) => println!("  {name:<24} error: {e}"),
            }
        }
    }
}

fn cmd_tables(path: &str, table: Option<&str>, settings: &Settings) {
    let doc = open(path, settings);
    let Some(tables) = doc.tables() else {
        fail("document has no tables");
    };

    let Some(name) = table else {
        for name in tables.table_names() {
            println!("{name}");
        }
        return;
    };

    let table = tables.read_table(name).unwrap_or_else(|e| fail(&e.to_string()));
    println!("{} ({} rows)", table.name(), table.row_count());
    for column in table.columns() {
        let kind = match column.column_type() {
            ColumnType::Index { target } => format!("-> {target}"),
            other => other.to_string(),
        };
        println!("  {:<32} {}", column.name(), kind);
    }
}

fn import_all(doc: &Document, options: ImportOptions) -> MemoryStore {
    let handle = doc
        .spawn_import(options, MemoryStore::new())
        .unwrap_or_else(|e| fail(&e.to_string()));

    let mut last_percent = None;
    for event in handle.events().iter() {
        match event {
            ImportEvent::Stage(stage) => tracing::debug!(?stage, "stage"),
            ImportEvent::Table { kind, rows } => tracing::info!("Importing {kind} ({rows} rows)"),
            ImportEvent::Progress(p) => {
                let percent = (p.fraction_completed() * 100.0) as u32;
                if last_percent != Some(percent) && percent % 10 == 0 {
                    tracing::info!("{percent}% ({}/{})", p.completed_units, p.total_units);
                    last_percent = Some(percent);
                }
            }
        }
    }

    let outcome = handle.join().unwrap_or_else(|e| fail(&e.to_string()));
    match outcome.result {
        Ok(summary) => {
            tracing::info!(chunks = summary.chunks, "import complete");
            outcome.sink
        }
        Err(e) => fail(&format!("Import failed: {e}")),
    }
}

fn cmd_import(path: &str, settings: &Settings, options: ImportOptions, json: bool) {
    let doc = open(path, settings);
    let store = import_all(&doc, options);

    if json {
        let records: Vec<_> = store.iter().collect();
        match serde_json::to_string_pretty(&records) {
            Ok(s) => println!("{s}"),
            Err(e) => fail(&e.to_string()),
        }
        return;
    }

    println!("Imported {} entities:", store.total());
    for kind in EntityKind::IMPORT_ORDER {
        let count = store.count(kind);
        if count > 0 {
            println!("  {:<12} {:>10}", kind.to_string(), count);
        }
    }
}

fn cmd_tree(path: &str, settings: &Settings) {
    let doc = open(path, settings);
    let store = import_all(&doc, settings.import_options());
    let tree = Tree::by_category(&store);

    println!("{path}: {} elements", tree.root().ids().len());
    for child in tree.root().children() {
        print_tree(child, 0);
    }
}

fn print_tree(node: &Node, depth: usize) {
    let indent = "  ".repeat(depth);
    println!("{indent}{} ({})", node.name(), node.ids().len());
    for child in node.children() {
        print_tree(child, depth + 1);
    }
}
