//! # Form Schema CLI Tool
//!
//! Compiles one FHIR Questionnaire file into its form schema and writes the JSON to stdout
//! or a file. Useful for checking a questionnaire before it is dropped into a server's
//! data directory.
//!
//! ## Command Line Options
//!
//! ```text
//! <QUESTIONNAIRE>                    Path to the Questionnaire JSON file
//! -t, --terminology <DIR>            Directory of ValueSet / CodeSystem JSON files
//! -c, --clipboard <FILE>             Clipboard key configuration
//! -k, --key <KEY>                    Form key (defaults to the questionnaire id or file stem)
//!     --common                       Compile as the common questionnaire
//! -o, --output <OUTPUT>              Output file path (defaults to stdout)
//!     --compact                      Write compact instead of pretty-printed JSON
//!     --group-panels                 Render labelled groups as panels
//!     --hospitalization-reason       Emit the hospitalization reason field
//!     --hospitalization-copy-checkboxes
//!                                    Emit the copy-facility checkbox
//! -l, --log-level <LEVEL>            Log level for diagnostics on stderr [default: warn]
//! ```
//!
//! ## Usage Examples
//!
//! ```bash
//! atrius-form-cli data/questionnaires/cvdd.json -t data/terminology -c data/clipboard.json
//!
//! atrius-form-cli data/questionnaires/common.json --common -t data/terminology -o common.json
//! ```
//!
//! Items that cannot be compiled are reported on stderr and left out of the schema; the
//! exit status is only non-zero when the input files themselves cannot be read.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use atrius_form_schema::loader::{form_key, load_clipboard, load_terminology, read_questionnaire};
use atrius_form_schema::{ClipboardKeys, FeatureFlags, FormCompiler, QuestionnaireRole};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "atrius-form-cli")]
#[command(about = "Compile a FHIR Questionnaire into a form schema")]
struct Args {
    /// Path to the Questionnaire JSON file
    questionnaire: PathBuf,

    /// Directory of ValueSet / CodeSystem JSON files (or Bundles of them)
    #[arg(long, short = 't')]
    terminology: Option<PathBuf>,

    /// Clipboard key configuration ({"common": {...}, "condition": {...}})
    #[arg(long, short = 'c')]
    clipboard: Option<PathBuf>,

    /// Form key; the disease code of a condition questionnaire
    #[arg(long, short = 'k')]
    key: Option<String>,

    /// Compile with the common clipboard table and no disease code
    #[arg(long)]
    common: bool,

    /// Output file path (defaults to stdout)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Write compact JSON
    #[arg(long)]
    compact: bool,

    /// Render labelled groups inside a panel
    #[arg(long)]
    group_panels: bool,

    /// Emit the free-text reason of a hospitalization
    #[arg(long)]
    hospitalization_reason: bool,

    /// Emit the "same as notifying facility" checkbox of a hospitalization
    #[arg(long)]
    hospitalization_copy_checkboxes: bool,

    /// Log level for diagnostics written to stderr
    #[arg(long, short = 'l', default_value = "warn")]
    log_level: String,
}

impl Args {
    fn features(&self) -> FeatureFlags {
        FeatureFlags {
            group_labels_as_panels: self.group_panels,
            hospitalization_reason: self.hospitalization_reason,
            hospitalization_copy_checkboxes: self.hospitalization_copy_checkboxes,
        }
    }

    fn role(&self) -> QuestionnaireRole {
        if self.common {
            QuestionnaireRole::Common
        } else {
            QuestionnaireRole::Condition
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("atrius_form_schema={}", args.log_level).into()),
        )
        .init();

    let questionnaire = read_questionnaire(&args.questionnaire)
        .await
        .with_context(|| format!("reading {}", args.questionnaire.display()))?;

    let value_sets = match &args.terminology {
        Some(dir) => load_terminology(dir)
            .await
            .with_context(|| format!("loading terminology from {}", dir.display()))?,
        None => Default::default(),
    };
    let clipboard = match &args.clipboard {
        Some(path) => load_clipboard(path)
            .await
            .with_context(|| format!("loading clipboard keys from {}", path.display()))?,
        None => ClipboardKeys::default(),
    };

    let key = args
        .key
        .clone()
        .unwrap_or_else(|| form_key(&args.questionnaire, &questionnaire));

    let compiler = FormCompiler::new(&value_sets, &clipboard, args.features());
    let form = compiler.compile(&key, &questionnaire, args.role());

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating {}", path.display()))?;
            write_form(BufWriter::new(file), &form, args.compact)?;
        }
        None => write_form(io::stdout().lock(), &form, args.compact)?,
    }

    Ok(())
}

fn write_form<W: Write>(
    mut writer: W,
    form: &atrius_form_schema::CompiledForm,
    compact: bool,
) -> anyhow::Result<()> {
    if compact {
        serde_json::to_writer(&mut writer, form)?;
    } else {
        serde_json::to_writer_pretty(&mut writer, form)?;
    }
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["atrius-form-cli", "q.json"]);
        assert_eq!(args.questionnaire, PathBuf::from("q.json"));
        assert_eq!(args.role(), QuestionnaireRole::Condition);
        assert_eq!(args.features(), FeatureFlags::default());
        assert_eq!(args.log_level, "warn");
    }

    #[test]
    fn test_args_flags() {
        let args = Args::parse_from([
            "atrius-form-cli",
            "common.json",
            "--common",
            "--group-panels",
            "--hospitalization-reason",
            "-k",
            "shared",
        ]);
        assert_eq!(args.role(), QuestionnaireRole::Common);
        assert!(args.features().group_labels_as_panels);
        assert!(args.features().hospitalization_reason);
        assert!(!args.features().hospitalization_copy_checkboxes);
        assert_eq!(args.key.as_deref(), Some("shared"));
    }

    #[test]
    fn test_write_form_compact() {
        let questionnaire = atrius_form_schema::Questionnaire::from_str(
            r#"{"resourceType": "Questionnaire", "item": [{"linkId": "n", "type": "integer"}]}"#,
        )
        .unwrap();
        let value_sets = atrius_form_schema::ValueSetRegistry::new();
        let clipboard = ClipboardKeys::default();
        let compiler = FormCompiler::new(&value_sets, &clipboard, FeatureFlags::default());
        let form = compiler.compile("n", &questionnaire, QuestionnaireRole::Condition);

        let mut out = Vec::new();
        write_form(&mut out, &form, true).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with('\n'));
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["fieldGroup"][0]["fieldGroup"][0]["key"], "valueInteger");
    }
}
