//! CLI output formatting for all commands.
//!
//! # Output Format
//!
//! ## Render
//!
//! ```text
//! Rendered out/monday.png (1080x1080)
//! ```
//!
//! With `--dry-run`, the plan is shown instead:
//!
//! ```text
//! Canvas: 1080x1080
//! Font: 106px
//! Text: 2 lines, 583x216
//!     Monday
//!     again
//! Photo: scale 2.700, 1080x1215 at (0, -68)
//! Panel: stripe, 1080x302 at y=766
//! Anchor: (216, 788)
//! ```
//!
//! ## Batch
//!
//! ```text
//! 001/003 out/monday.png (1080x1080)
//! 002/003 out/top.jpg FAILED
//!     Error: no valid split: word 'Supercalifragilistic' ...
//! 003/003 out/cat.png (800x600)
//!
//! Rendered 2 of 3 jobs
//! Failed:
//!     002 out/top.jpg
//! ```
//!
//! ## Palette
//!
//! ```text
//! Text:       #ffffffff
//! Background: #000000ff
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::imaging::CaptionPlan;
use crate::process::{BatchEvent, BatchReport};
use crate::types::{PaletteEntry, PanelMode};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

// ============================================================================
// Render
// ============================================================================

pub fn format_rendered(output: &Path, width: u32, height: u32) -> String {
    format!("Rendered {} ({}x{})", output.display(), width, height)
}

/// Format a caption plan: the geometry a render would use.
pub fn format_plan(plan: &CaptionPlan, panel_mode: PanelMode) -> Vec<String> {
    let layout = &plan.layout;
    let line_count = plan.wrapped.lines().count();
    let mut lines = vec![
        format!("Canvas: {}x{}", plan.canvas.width, plan.canvas.height),
        format!("Font: {}px", plan.px_size),
        format!(
            "Text: {} {}, {}x{}",
            line_count,
            if line_count == 1 { "line" } else { "lines" },
            plan.text_size.width,
            plan.text_size.height
        ),
    ];
    for line in plan.wrapped.lines() {
        lines.push(format!("{}{}", indent(1), line));
    }
    lines.push(format!(
        "Photo: scale {:.3}, {}x{} at ({}, {})",
        layout.photo.scale, layout.photo.width, layout.photo.height, layout.photo.x, layout.photo.y
    ));
    lines.push(match panel_mode {
        PanelMode::None => "Panel: none".to_string(),
        mode => format!(
            "Panel: {}, {}x{} at y={}",
            mode,
            layout.panel.width,
            layout.panel.pixel_height(),
            layout.panel.top
        ),
    });
    lines.push(format!(
        "Anchor: ({}, {})",
        layout.text_anchor.0, layout.text_anchor.1
    ));
    lines
}

pub fn print_plan(plan: &CaptionPlan, panel_mode: PanelMode) {
    for line in format_plan(plan, panel_mode) {
        println!("{}", line);
    }
}

// ============================================================================
// Batch
// ============================================================================

/// Format a single batch progress event as display lines.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Rendered {
            index,
            total,
            output,
            width,
            height,
        } => vec![format!(
            "{}/{} {} ({}x{})",
            format_index(*index),
            format_index(*total),
            output.display(),
            width,
            height
        )],
        BatchEvent::Failed {
            index,
            total,
            output,
            error,
        } => vec![
            format!(
                "{}/{} {} FAILED",
                format_index(*index),
                format_index(*total),
                output.display()
            ),
            format!("{}Error: {}", indent(1), error),
        ],
    }
}

/// Format the end-of-batch summary.
pub fn format_batch_summary(report: &BatchReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Rendered {} of {} jobs",
        report.rendered.len(),
        report.total()
    )];
    if !report.failed.is_empty() {
        lines.push("Failed:".to_string());
        for job in &report.failed {
            lines.push(format!(
                "{}{} {}",
                indent(1),
                format_index(job.index),
                job.output.display()
            ));
        }
    }
    lines
}

pub fn print_batch_summary(report: &BatchReport) {
    println!();
    for line in format_batch_summary(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Palette
// ============================================================================

pub fn format_palette(entry: &PaletteEntry) -> Vec<String> {
    vec![
        format!("Text:       {}", entry.text),
        format!("Background: {}", entry.background),
    ]
}

pub fn print_palette(entry: &PaletteEntry) {
    for line in format_palette(entry) {
        println!("{}", line);
    }
}
