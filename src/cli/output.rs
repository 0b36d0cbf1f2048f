//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.  `--quiet` silences
//! everything except warnings and errors.

use std::sync::atomic::{AtomicBool, Ordering};

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::saltfile::SealedSaltRecord;

static QUIET: AtomicBool = AtomicBool::new(false);

/// Suppress success, info and tip messages.
pub fn set_quiet(quiet: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
}

/// Whether `--quiet` is in effect.
pub fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    if !is_quiet() {
        println!("{} {}", style("\u{2713}").green().bold(), msg);
    }
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    if !is_quiet() {
        println!("{} {}", style("\u{2139}").blue().bold(), msg);
    }
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    if !is_quiet() {
        println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
    }
}

/// Print a table of sealed records (Site ID, Name, Key).
///
/// Only public information is shown: the key column is the fingerprint
/// of the public key each salt was sealed for.
pub fn print_sites_table(records: &[&SealedSaltRecord]) {
    if records.is_empty() {
        info("No sites in this salt file.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Site ID", "Name", "Key"]);

    for r in records {
        table.add_row(vec![
            r.site_id().to_string(),
            r.site_name().to_string(),
            r.blob().recipient().to_string(),
        ]);
    }

    println!("{table}");
}
