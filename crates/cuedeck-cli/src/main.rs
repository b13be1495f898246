//! cuedeck CLI
//!
//! Headless front end for the caption timeline engine: inspect a caption
//! file, apply scripted edits with undo/redo, and replay edit journals.

mod logging;
mod steps;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use cuedeck_core::captions::CueStream;
use cuedeck_core::project::MutationJournal;
use cuedeck_core::settings::SETTINGS_FILE;
use cuedeck_core::{BroadcastSink, CaptionFile, EditorSettings, TimelineEvent};

use crate::steps::EditStep;

/// cuedeck command line
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file (defaults to the platform config dir)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Also write daily-rolling logs into this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the conformed caption table
    Show {
        file: PathBuf,
        /// Print annotated captions as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the speaker transcript
    Transcript {
        file: PathBuf,
        /// Wrap width (defaults to the settings value)
        #[arg(short, long)]
        width: Option<usize>,
    },

    /// List the distinct voices
    Voices { file: PathBuf },

    /// Apply edit steps and print the resulting VTT
    Edit {
        file: PathBuf,
        /// Steps such as `start:1=00:00:02.500`, `text:0=Hello`, `undo`
        #[arg(required = true)]
        steps: Vec<EditStep>,
        /// Record the session in a JSONL journal
        #[arg(long)]
        journal: Option<PathBuf>,
        /// Write the VTT here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Rebuild a timeline from a journal and print it as VTT
    Replay {
        journal: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn settings_path(cli: &Cli) -> Option<PathBuf> {
    cli.settings
        .clone()
        .or_else(|| dirs::config_dir().map(|dir| dir.join("cuedeck").join(SETTINGS_FILE)))
}

/// Logs every timeline event until the sink is dropped
fn spawn_event_logger(sink: &BroadcastSink) -> JoinHandle<()> {
    let mut rx = sink.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(TimelineEvent::CaptionsChanged(payload)) => tracing::debug!(
                    event = cuedeck_core::events::event_names::CAPTIONS_CHANGED,
                    cause = %payload.cause,
                    captions = payload.captions.len(),
                    voices = payload.voices.len(),
                    "Timeline event"
                ),
                Ok(TimelineEvent::HistoryChanged(payload)) => tracing::debug!(
                    event = cuedeck_core::events::event_names::HISTORY_CHANGED,
                    undo_count = payload.undo_count,
                    redo_count = payload.redo_count,
                    "Timeline event"
                ),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event logger fell behind")
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

async fn read_captions(file: &mut CaptionFile, path: &Path) -> Result<()> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut stream = CueStream::new();
    file.apply_mutation(stream.begin()?)?;
    file.apply_mutation(
        stream
            .feed(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?,
    )?;
    if let Some(last) = stream.finish()? {
        file.apply_mutation(last)?;
    }

    tracing::info!(path = %path.display(), captions = file.captions().len(), "Loaded captions");
    Ok(())
}

async fn write_output(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => tokio::fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            print!("{}", content);
            Ok(())
        }
    }
}

fn print_table(file: &CaptionFile) {
    println!(
        "{:>4}  {:<12}  {:<12}  {:>9}  {:>9}  {:<10}  text",
        "#", "start", "end", "back(ms)", "fore(ms)", "voice"
    );
    for caption in file.annotated() {
        println!(
            "{:>4}  {:<12}  {:<12}  {:>9.0}  {:>9.0}  {:<10}  {}",
            caption.index,
            caption.start_raw(),
            caption.end_raw(),
            caption.back_size,
            caption.fore_size,
            caption.voice(),
            caption.text().replace('\n', " / ")
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.log_dir.as_deref());

    let settings = settings_path(&cli)
        .map(|path| EditorSettings::load_or_default(&path))
        .unwrap_or_default();

    let sink = BroadcastSink::new(settings.events.channel_capacity);
    let logger = spawn_event_logger(&sink);
    let mut file = CaptionFile::from_settings(&settings, Arc::new(sink));

    match &cli.command {
        Commands::Show { file: path, json } => {
            read_captions(&mut file, path).await?;
            if *json {
                println!("{}", serde_json::to_string_pretty(file.annotated())?);
            } else {
                print_table(&file);
            }
        }
        Commands::Transcript { file: path, width } => {
            read_captions(&mut file, path).await?;
            let text = match width {
                Some(width) => file.snapshot().generate_text(*width),
                None => file.generate_text(),
            };
            println!("{}", text);
        }
        Commands::Voices { file: path } => {
            read_captions(&mut file, path).await?;
            for voice in file.collect_voices() {
                println!("{}", voice);
            }
        }
        Commands::Edit {
            file: path,
            steps,
            journal,
            output,
        } => {
            if let Some(journal_path) = journal {
                if journal_path.exists() {
                    bail!("Journal {} already exists", journal_path.display());
                }
                file = file.with_journal(MutationJournal::new(journal_path));
            }
            read_captions(&mut file, path).await?;
            for (i, step) in steps.iter().enumerate() {
                step.apply(&mut file)
                    .with_context(|| format!("Step {} ({:?}) failed", i + 1, step))?;
            }
            write_output(output.as_deref(), &file.to_vtt()).await?;
        }
        Commands::Replay { journal, output } => {
            let read = MutationJournal::new(journal)
                .read_all()
                .with_context(|| format!("Failed to read journal {}", journal.display()))?;
            for (line, error) in &read.errors {
                tracing::warn!(line, error = %error, "Skipped journal line");
            }
            file = file
                .restore(read.entries)
                .context("Failed to replay journal")?;
            write_output(output.as_deref(), &file.to_vtt()).await?;
        }
    }

    // Dropping the file closes the event channel and ends the logger
    drop(file);
    logger.await.context("Event logger task failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cuedeck_core::NullSink;
    use tempfile::TempDir;

    const VTT: &str = "WEBVTT\n\n\
        00:00:00.000 --> 00:00:01.000\n<v Ann> yay\n\n\
        00:00:00.500 --> 00:00:02.000\n<v Bob> bark\n";

    #[test]
    fn cli_parses_edit_steps() {
        let cli = Cli::try_parse_from([
            "cuedeck", "edit", "in.vtt", "text:0=hi", "undo", "-o", "out.vtt",
        ])
        .unwrap();
        match cli.command {
            Commands::Edit { steps, output, journal, .. } => {
                assert_eq!(steps.len(), 2);
                assert_eq!(steps[1], EditStep::Undo);
                assert_eq!(output, Some(PathBuf::from("out.vtt")));
                assert!(journal.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }

        assert!(Cli::try_parse_from(["cuedeck", "edit", "in.vtt", "bogus:1"]).is_err());
        assert!(Cli::try_parse_from(["cuedeck", "edit", "in.vtt"]).is_err());
    }

    #[tokio::test]
    async fn reads_conforms_and_writes() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("in.vtt");
        let output = temp_dir.path().join("out.vtt");
        tokio::fs::write(&input, VTT).await.unwrap();

        let mut file = CaptionFile::new(Arc::new(NullSink), Default::default());
        read_captions(&mut file, &input).await.unwrap();
        assert_eq!(file.captions().len(), 2);

        write_output(Some(&output), &file.to_vtt()).await.unwrap();
        let written = tokio::fs::read_to_string(&output).await.unwrap();
        assert!(written.contains("00:00:01.001 --> 00:00:02.000\n<v Bob> bark"));
    }

    #[tokio::test]
    async fn missing_input_is_reported() {
        let mut file = CaptionFile::default();
        let err = read_captions(&mut file, Path::new("/nonexistent/cuedeck.vtt"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
