use crossterm::style::Stylize;
use grid_sync::api::{AnalyticsSink, RestProvider};
use grid_sync::config::Config;
use grid_sync::data::data_exporter::CsvFileSink;
use grid_sync::data::model::CellValue;
use grid_sync::services::TreeOptions;
use grid_sync::state::{NavPhase, NavigationController, Transition};
use grid_sync::utils::app_paths::AppPaths;
use grid_sync::utils::logging::{get_log_buffer, init_tracing};
use reedline::{
    default_emacs_keybindings, ColumnarMenu, DefaultCompleter, DefaultPrompt,
    DefaultPromptSegment, Emacs, FileBackedHistory, KeyCode, KeyModifiers, MenuBuilder, Reedline,
    ReedlineEvent, ReedlineMenu, Signal,
};
use std::sync::Arc;

mod table_display;

use table_display::{display_documents, display_outline, display_row, display_snapshot};

const COMMANDS: &[&str] = &[
    "docs", "doc", "tree", "table", "show", "refresh", "edit", "row", "export", "save", "whoami",
    "log", "status", "help", "quit",
];

fn print_help() {
    println!("{}", "grid-sync - browse and edit document tables".blue().bold());
    println!();
    println!("{}", "Usage:".yellow());
    println!("  grid-sync [--generate-config] [--help]");
    println!();
    println!("{}", "Commands:".yellow());
    println!("  {}                  - List documents", "docs".green());
    println!("  {}             - Open a document and its first table", "doc <id>".green());
    println!("  {}                  - Show pages and tables of the document", "tree".green());
    println!("  {}           - Open a table of the current document", "table <id>".green());
    println!("  {}                  - Show the current table again", "show".green());
    println!("  {}               - Reload the current table from the store", "refresh".green());
    println!(
        "  {} - Change a cell (saved in the background)",
        "edit <row> <column> <value>".green()
    );
    println!(
        "  {}              - Compare a row in the store with the local copy",
        "row <id>".green()
    );
    println!("  {}                - Push the table to the analytics store", "export".green());
    println!("  {}      - Write the table to a CSV file", "save <file.csv>".green());
    println!("  {}                - Check the API token", "whoami".green());
    println!("  {}                - Pending saves and save failures", "status".green());
    println!("  {}               - Show recent log lines", "log [n]".green());
    println!("  {}                  - Exit", "quit".green());
    println!();
}

/// Split `edit <row> <column> <value>`. The value is everything after the
/// column token, kept verbatim; a missing value clears the cell.
fn edit_args(line: &str) -> Option<(&str, &str, &str)> {
    let rest = line.trim_start().strip_prefix("edit")?;
    let rest = rest.trim_start();
    let (row, rest) = rest.split_once(char::is_whitespace)?;
    let rest = rest.trim_start();
    let (column, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    if column.is_empty() {
        return None;
    }
    Some((row, column, value))
}

fn report(transition: &Transition, controller: &NavigationController) {
    match transition {
        Transition::Superseded => {
            println!("{}", "A newer selection replaced this one.".dark_grey())
        }
        Transition::Applied(NavPhase::Failed(message)) => {
            eprintln!("{}", format!("Error: {}", message).red())
        }
        Transition::Applied(_) => match controller.snapshot() {
            Some(snapshot) => display_snapshot(&snapshot, controller.persist_tracker()),
            None => println!("{}", "This document has no tables.".yellow()),
        },
    }
    if let Some(err) = controller.structure_error() {
        eprintln!("{}", format!("Navigation unavailable: {}", err).yellow());
    }
}

fn print_notices(controller: &NavigationController) {
    for notice in controller.persist_tracker().take_notices() {
        eprintln!(
            "{}",
            format!("[{}] {}", notice.at.format("%H:%M:%S"), notice.message).red()
        );
    }
}

async fn run_command(
    line: &str,
    controller: &NavigationController,
    config: &Config,
    tree_options: &TreeOptions,
) {
    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or_default();

    match command {
        "help" => print_help(),
        "docs" => match controller.provider().list_documents().await {
            Ok(documents) => {
                let selection = controller.selection();
                display_documents(&documents, selection.document_id.as_deref());
            }
            Err(e) => eprintln!("{}", format!("Error: {}", e).red()),
        },
        "doc" => match parts.next() {
            Some(id) => {
                let transition = controller.select_document(id).await;
                report(&transition, controller);
            }
            None => eprintln!("{}", "Usage: doc <id>".red()),
        },
        "tree" => match controller.tree() {
            Some(tree) => {
                let selection = controller.selection();
                display_outline(&tree.outline(tree_options), selection.table_id.as_deref());
            }
            None => eprintln!("{}", "No structure loaded for this document.".yellow()),
        },
        "table" => match parts.next() {
            Some(id) => {
                let transition = controller.select_table(id).await;
                report(&transition, controller);
            }
            None => eprintln!("{}", "Usage: table <id>".red()),
        },
        "show" => match controller.snapshot() {
            Some(snapshot) => display_snapshot(&snapshot, controller.persist_tracker()),
            None => println!("{}", "No table loaded.".yellow()),
        },
        "refresh" => {
            let transition = controller.refresh().await;
            report(&transition, controller);
        }
        "edit" => {
            let Some((row, column, value)) = edit_args(line) else {
                eprintln!("{}", "Usage: edit <row> <column> <value>".red());
                return;
            };
            match controller.edit_cell(row, column, CellValue::from_input(value)) {
                // saved in the background, failures show up as notices
                Ok(_handle) => println!("{}", format!("{}/{} updated", row, column).green()),
                Err(e) => eprintln!("{}", format!("Error: {}", e).red()),
            }
        }
        "export" => {
            let sink = AnalyticsSink::new(config.export.clone());
            match controller.export(&sink).await {
                Ok(count) => println!("{}", format!("Exported {} rows.", count).green()),
                Err(e) => eprintln!("{}", format!("Export error: {}", e).red()),
            }
        }
        "save" => match parts.next() {
            Some(path) => {
                let sink = CsvFileSink::new(path);
                match controller.export(&sink).await {
                    Ok(count) => println!(
                        "{}",
                        format!("Wrote {} rows to {}", count, sink.path().display()).green()
                    ),
                    Err(e) => eprintln!("{}", format!("Export error: {}", e).red()),
                }
            }
            None => eprintln!("{}", "Usage: save <file.csv>".red()),
        },
        "whoami" => match controller.provider().whoami().await {
            Ok(account) => println!(
                "{}",
                format!(
                    "Authenticated as {} {}",
                    account.name,
                    account.login_id.unwrap_or_default()
                )
                .green()
            ),
            Err(e) => eprintln!("{}", format!("Error: {}", e).red()),
        },
        "status" => {
            let counts = controller.persist_tracker().counts();
            println!(
                "{} saving, {} saved, {} failed",
                counts.in_flight,
                counts.saved(),
                counts.failed
            );
        }
        "row" => match (parts.next(), controller.snapshot()) {
            (Some(id), Some(snapshot)) => match controller
                .provider()
                .get_row(snapshot.document_id(), snapshot.table_id(), id)
                .await
            {
                Ok(stored) => display_row(&stored, &snapshot),
                Err(e) => eprintln!("{}", format!("Error: {}", e).red()),
            },
            (None, _) => eprintln!("{}", "Usage: row <id>".red()),
            (_, None) => println!("{}", "No table loaded.".yellow()),
        },
        "log" => {
            let count = parts.next().and_then(|n| n.parse().ok()).unwrap_or(20);
            if let Some(buffer) = get_log_buffer() {
                for entry in buffer.get_recent(count) {
                    println!("{}", entry.format_for_display());
                }
            }
        }
        other => eprintln!(
            "{}",
            format!("Unknown command '{}'. Type help for a list.", other).red()
        ),
    }
}

#[tokio::main(flavor = "multi_thread", worker_threads = 1)]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    // Check for config file generation
    if args.contains(&"--generate-config".to_string()) {
        let path = Config::get_config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, Config::create_default_with_comments())?;
        println!("Configuration file created at: {:?}", path);
        return Ok(());
    }

    let config = Config::load()?;
    if let Some(log_path) = init_tracing(&config.logging) {
        eprintln!("Logs: {}", log_path.display());
    }

    let provider = RestProvider::new(
        &config.api.base_url,
        &config.api.browser_url,
        config.api.token.clone(),
    );
    let controller = NavigationController::new(
        Arc::new(provider),
        config.navigation.defaults(),
        config.navigation.pins(),
    );
    let tree_options = TreeOptions::from(&config.tree);

    print_help();
    let transition = controller.mount().await;
    report(&transition, &controller);

    let history = Box::new(FileBackedHistory::with_file(200, AppPaths::history_file()?)?);
    let completer = Box::new(DefaultCompleter::new_with_wordlen(
        COMMANDS.iter().map(|c| c.to_string()).collect(),
        1,
    ));
    let completion_menu = Box::new(ColumnarMenu::default().with_name("command_completion"));

    let mut keybindings = default_emacs_keybindings();
    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Tab,
        ReedlineEvent::Menu("command_completion".to_string()),
    );

    let mut line_editor = Reedline::create()
        .with_completer(completer)
        .with_menu(ReedlineMenu::EngineCompleter(completion_menu))
        .with_history(history)
        .with_edit_mode(Box::new(Emacs::new(keybindings)));

    let prompt = DefaultPrompt::new(
        DefaultPromptSegment::Basic("grid".to_string()),
        DefaultPromptSegment::Empty,
    );

    loop {
        print_notices(&controller);
        match line_editor.read_line(&prompt)? {
            Signal::Success(buffer) => {
                let trimmed = buffer.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if trimmed == "quit" || trimmed == "exit" {
                    break;
                }
                run_command(trimmed, &controller, &config, &tree_options).await;
            }
            Signal::CtrlD | Signal::CtrlC => break,
        }
    }

    let pending = controller.persist_tracker().counts().in_flight;
    if pending > 0 {
        println!("{}", format!("{} saves still pending.", pending).yellow());
    }
    println!("\nGoodbye!");
    Ok(())
}
