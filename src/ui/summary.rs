use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;

use crate::session::Session;

/// Print the post-startup banner: service table plus operator usage notes.
pub fn print_session_summary(session: &Session) {
    let use_color = std::io::stdout().is_terminal();

    println!();
    if use_color {
        println!("  {} {}", "devlaunch".bold(), "server running".green());
    } else {
        println!("  devlaunch server running");
    }
    println!();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Service").set_alignment(CellAlignment::Left),
        Cell::new("URL").set_alignment(CellAlignment::Left),
        Cell::new("Status").set_alignment(CellAlignment::Center),
    ]);
    table.add_row(vec![
        Cell::new("photo file manager"),
        Cell::new(&session.url),
        Cell::new("ready").set_alignment(CellAlignment::Center),
    ]);

    println!("{table}");
    println!();
    println!("  Getting started:");
    println!("    1. Sign in with your Google account");
    println!("    2. Pick a Drive folder to pull photos from");
    println!("    3. Pick the spreadsheet to write photo links into");
    println!("    4. Run the processing step");
    println!();
    if use_color {
        println!("  Press {} to stop", "Ctrl+C".bold());
    } else {
        println!("  Press Ctrl+C to stop");
    }
    println!();
}

/// Prompt shown for fatal failures under the interactive-terminal
/// convention: diagnostics stay on screen until the operator acknowledges.
pub fn pause_before_exit() {
    if !std::io::stdin().is_terminal() {
        return;
    }
    println!("Press Enter to exit...");
    let mut buf = String::new();
    let _ = std::io::stdin().read_line(&mut buf);
}
