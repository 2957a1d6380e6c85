/*!
 * Stack traces for the `trace` property.
 *
 * Each frame renders as the function name followed by a tab-indented
 * `file:line`, one frame after another:
 *
 * ```text
 * app::handlers::checkout
 * 	src/handlers.rs:42
 * app::main
 * 	src/main.rs:9
 * ```
 */

use std::fmt::Write as _;

/// Frames from these crates sit between the call site and the capture.
const INTERNAL_PREFIXES: &[&str] = &[
    "backtrace::",
    "seqlog_tracing::",
    "tracing::",
    "tracing_core::",
    "tracing_subscriber::",
    "<tracing::",
    "<tracing_core::",
    "<tracing_subscriber::",
    "<seqlog_tracing::",
];

/// Standard library frames the capture machinery passes through (thread
/// locals, closures); they only count as internal below an internal frame.
const RUNTIME_PREFIXES: &[&str] = &["std::", "core::", "alloc::", "<std::", "<core::", "<alloc::"];

struct Frame {
    function: Option<String>,
    file: Option<String>,
    line: Option<u32>,
}

/**
 * Captures the current stack and renders it.
 * Returns `None` if no useful frames were resolved.
 */
pub fn capture() -> Option<String> {
    let bt = backtrace::Backtrace::new();
    let frames = skip_internal(convert(&bt));
    if frames.is_empty() { None } else { Some(render(&frames)) }
}

/*
 * Frames with neither a function name nor a file are dropped. Function
 * names use the alternate form, which leaves out the symbol hash.
 */
fn convert(bt: &backtrace::Backtrace) -> Vec<Frame> {
    let mut frames = Vec::new();

    for frame in bt.frames() {
        for symbol in frame.symbols() {
            let function = symbol.name().map(|n| format!("{n:#}"));
            let file = symbol.filename().map(|p| p.display().to_string());

            if function.is_none() && file.is_none() {
                continue;
            }

            frames.push(Frame {
                function,
                file,
                line: symbol.lineno(),
            });
        }
    }

    frames
}

/**
 * Drops everything up to the last internal frame of the leading run.
 * Runtime frames inside that run (e.g. `LocalKey::try_with` between two
 * `tracing_core` frames) go with it.
 */
fn skip_internal(frames: Vec<Frame>) -> Vec<Frame> {
    let mut first_user = 0;

    for (i, frame) in frames.iter().enumerate() {
        if is_internal(frame) {
            first_user = i + 1;
        } else if !has_prefix(frame, RUNTIME_PREFIXES) {
            break;
        }
    }

    frames.into_iter().skip(first_user).collect()
}

fn is_internal(frame: &Frame) -> bool {
    has_prefix(frame, INTERNAL_PREFIXES)
}

fn has_prefix(frame: &Frame, prefixes: &[&str]) -> bool {
    frame
        .function
        .as_deref()
        .is_some_and(|function| prefixes.iter().any(|prefix| function.starts_with(prefix)))
}

fn render(frames: &[Frame]) -> String {
    let mut out = String::new();

    for (i, frame) in frames.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(frame.function.as_deref().unwrap_or("<unknown>"));
        out.push_str("\n\t");
        out.push_str(frame.file.as_deref().unwrap_or("<unknown>"));
        if let Some(line) = frame.line {
            let _ = write!(out, ":{line}");
        }
    }

    out
}
