use anyhow::{Context, Result};
use chrono::{Local, TimeZone};
use clap::Subcommand;
use sentix_core::analytics::clamp_text;
use sentix_protocol::HistoryEntry;

use crate::render::{print_json, table};
use crate::Ctx;

#[derive(Subcommand, Clone)]
pub enum HistoryCmd {
    /// List recorded analyses, newest first
    List {
        /// Maximum number of entries to show
        #[arg(long, default_value_t = 25)]
        limit: usize,
    },
    /// List recently analyzed texts
    Texts,
    /// Print the most recent analyzed text
    Last,
    /// Drop all recorded analyses
    Clear,
    /// Forget the draft text (analysis history is kept)
    Reset,
}

fn when(ts: i64) -> String {
    Local
        .timestamp_millis_opt(ts)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "—".into())
}

fn subject(entry: &HistoryEntry) -> String {
    let raw = entry
        .text
        .as_deref()
        .or(entry.file_name.as_deref())
        .unwrap_or_default();
    clamp_text(&raw.replace('\n', " "), 60)
}

pub fn run(ctx: &Ctx, cmd: &HistoryCmd) -> Result<()> {
    let history = ctx.history();
    match cmd {
        HistoryCmd::List { limit } => {
            let entries: Vec<HistoryEntry> = history.analyses().into_iter().take(*limit).collect();
            if ctx.json {
                print_json(&entries);
                return Ok(());
            }
            if entries.is_empty() {
                println!("No analyses yet.");
                return Ok(());
            }
            let rows: Vec<Vec<String>> = entries
                .iter()
                .map(|e| {
                    vec![
                        when(e.ts),
                        e.mode.to_string(),
                        e.model.clone(),
                        subject(e),
                    ]
                })
                .collect();
            println!("{}", table(&["when", "mode", "model", "input"], &rows));
        }
        HistoryCmd::Texts => {
            let texts = history.texts();
            if ctx.json {
                print_json(&texts);
            } else {
                for (i, t) in texts.iter().enumerate() {
                    println!("{:>2}. {}", i + 1, clamp_text(&t.replace('\n', " "), 80));
                }
            }
        }
        HistoryCmd::Last => match history.last_text() {
            Some(t) => println!("{t}"),
            None => eprintln!("No text in history."),
        },
        HistoryCmd::Clear => {
            history.clear_analyses().context("clear history")?;
            eprintln!("History cleared.");
        }
        HistoryCmd::Reset => {
            ctx.prefs().clear_last_text().context("reset draft text")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentix_protocol::HistoryMode;
    use serde_json::Value;

    #[test]
    fn subject_prefers_text_and_flattens_lines() {
        let mut e = HistoryEntry {
            id: "h_1".into(),
            ts: 0,
            mode: HistoryMode::Single,
            text: Some("line one\nline two".into()),
            file_name: Some("ignored.csv".into()),
            model: "m".into(),
            result: Value::Null,
        };
        assert_eq!(subject(&e), "line one line two");
        e.text = None;
        assert_eq!(subject(&e), "ignored.csv");
    }
}
