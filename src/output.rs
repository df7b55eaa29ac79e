use owo_colors::OwoColorize;
use std::io::Write;

/// Small wrapper around stdout/stderr printing to provide consistent, colored
/// user-facing messages. Colors are enabled only when output is a TTY.
fn is_tty() -> bool {
    atty::is(atty::Stream::Stdout)
}

pub fn print_info(msg: &str) {
    if is_tty() {
        println!("{} {}", "info:".cyan().bold(), msg);
    } else {
        println!("info: {}", msg);
    }
}

pub fn print_warn(msg: &str) {
    if is_tty() {
        eprintln!("{} {}", "warn:".yellow().bold(), msg);
    } else {
        eprintln!("warn: {}", msg);
    }
}

pub fn print_error(msg: &str) {
    if is_tty() {
        eprintln!("{} {}", "error:".red().bold(), msg);
    } else {
        eprintln!("error: {}", msg);
    }
}

pub fn print_success(msg: &str) {
    if is_tty() {
        println!("{} {}", "ok:".green().bold(), msg);
    } else {
        println!("ok: {}", msg);
    }
}

/// Render a migration percentage. On a TTY the line is redrawn in place;
/// otherwise one line per value so piped output stays scrapable.
pub fn print_progress(percent: u8) {
    if is_tty() {
        print!("\r{} {:>3}%", "migrating:".cyan().bold(), percent);
        if percent == 100 {
            println!();
        }
        let _ = std::io::stdout().flush();
    } else {
        println!("migrating: {}%", percent);
    }
}
