use std::env;
use std::fs;
use std::process;
use std::sync::Arc;

use songbook::{CacheStore, FileStore, FolderStore, MemoryCache, Songbook, SongbookConfig};

const CONFIG_FILE: &str = "songbook.yaml";

fn usage() -> ! {
    eprintln!("Usage: songbook <sheet.txt> [shift]");
    eprintln!("       songbook --html <sheet.txt> [shift]");
    eprintln!("       songbook categories <folder>");
    process::exit(1);
}

fn parse_shift(arg: Option<&String>) -> i32 {
    match arg {
        None => 0,
        Some(raw) => match raw.parse::<i32>() {
            Ok(shift) => shift,
            Err(_) => {
                eprintln!("Invalid shift '{}': expected an integer like 2 or -3", raw);
                process::exit(1);
            }
        },
    }
}

fn load_config() -> SongbookConfig {
    match SongbookConfig::load(CONFIG_FILE) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error reading '{}': {}", CONFIG_FILE, e);
            process::exit(1);
        }
    }
}

fn transpose_file(path: &str, shift: i32, html: bool) {
    let text = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path, e);
            process::exit(1);
        }
    };

    let output = if html {
        songbook::transpose_html(&text, shift)
    } else {
        songbook::transpose_text(&text, shift)
    };
    print!("{}", output);
    tracing::debug!(path, shift, "sheet transposed");
}

/// Pull the snapshot stored in `folder` and list its categories.
async fn list_categories(config: SongbookConfig, folder: &str) {
    let remote: Arc<dyn FileStore> = Arc::new(FolderStore::new(folder));
    let cache = CacheStore::new(Box::new(MemoryCache::new()));
    let (mut songbook, _writer) = Songbook::new(config, remote, cache);

    if !songbook.start_session().await {
        eprintln!(
            "No readable '{}' in '{}', showing defaults",
            songbook.config().snapshot_name,
            folder
        );
    }

    for category in songbook.category_list() {
        let visibility = if category.is_public { "public" } else { "private" };
        println!(
            "{:<24} {:<20} {:>3} songs  {}",
            category.name,
            category.id,
            category.members.len(),
            visibility
        );
    }
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        usage();
    }

    let config = load_config();
    songbook::logging::init_logging(&config.log_filter);

    match args[1].as_str() {
        "categories" => {
            let Some(folder) = args.get(2) else { usage() };
            list_categories(config, folder).await;
        }
        "--html" => {
            let Some(path) = args.get(2) else { usage() };
            transpose_file(path, parse_shift(args.get(3)), true);
        }
        path => transpose_file(path, parse_shift(args.get(2)), false),
    }
}
