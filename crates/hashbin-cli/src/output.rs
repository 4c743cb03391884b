use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use tracing_subscriber::EnvFilter;

static JSON_MODE: AtomicBool = AtomicBool::new(false);

pub fn init(json: bool) {
    JSON_MODE.store(json, Ordering::Relaxed);
}

pub fn is_json() -> bool {
    JSON_MODE.load(Ordering::Relaxed)
}

/// Logs go to stderr so stdout stays machine-readable.
pub fn init_tracing(json_logs: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

pub fn print<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    println!("{s}");
    Ok(())
}

/// Print plain lines in human mode, or the structured value in JSON mode.
pub fn print_either<T: Serialize>(value: &T, lines: &[String]) -> anyhow::Result<()> {
    if is_json() {
        return print(value);
    }
    let mut out = io::stdout().lock();
    for l in lines {
        writeln!(out, "{l}")?;
    }
    Ok(())
}

/// One colored status line on stdout (human mode only).
pub fn status(ok: bool, msg: &str) -> anyhow::Result<()> {
    if is_json() {
        return Ok(());
    }
    let mut out = StandardStream::stdout(ColorChoice::Auto);
    out.set_color(ColorSpec::new().set_fg(Some(if ok { Color::Green } else { Color::Red })))?;
    write!(out, "{}", if ok { "ok" } else { "failed" })?;
    out.reset()?;
    writeln!(out, " {msg}")?;
    Ok(())
}
