use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use zeroize::Zeroizing;

use ghostbit::{
    CipherVersion, CodecError, Control, PasswordProvider, PasswordResponse, ProgressSink,
    QualityMode,
};

#[derive(Parser)]
#[command(
    name = "ghostbit",
    version,
    about = "Hide files in the low-order bits of WAV audio samples.",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Audio carrier operations
    Audio {
        #[command(subcommand)]
        command: AudioCommands,
    },
}

#[derive(Subcommand)]
enum AudioCommands {
    /// Hide secret files inside a WAV carrier
    Encode {
        /// Carrier WAV file
        #[arg(short = 'i', long)]
        input: PathBuf,

        /// Secret file to hide (repeatable)
        #[arg(short = 's', long = "secret", required = true)]
        secrets: Vec<PathBuf>,

        /// Output WAV path
        #[arg(short = 'o', long)]
        output: PathBuf,

        /// Embedding quality: higher disturbs the audio less
        #[arg(short = 'q', long, value_enum, default_value_t = Quality::Normal)]
        quality: Quality,

        /// Prompt for a password and encrypt the container
        #[arg(short = 'p', long)]
        password: bool,
    },

    /// Extract hidden files from an encoded WAV
    Decode {
        /// Encoded WAV file
        #[arg(short = 'i', long)]
        input: PathBuf,

        /// Directory for the extracted files
        #[arg(short = 'o', long)]
        output: PathBuf,

        /// Prompt for the password up front instead of on demand
        #[arg(short = 'p', long)]
        password: bool,
    },

    /// Report what is hidden in a WAV without extracting it
    Analyze {
        /// WAV file to inspect
        #[arg(short = 'i', long)]
        input: PathBuf,

        /// Prompt for a password to list encrypted contents
        #[arg(short = 'p', long)]
        password: bool,
    },

    /// Show how many payload bytes a carrier can hold
    Capacity {
        /// Carrier WAV file
        #[arg(short = 'i', long)]
        input: PathBuf,

        /// Embedding quality to compute for
        #[arg(short = 'q', long, value_enum, default_value_t = Quality::Normal)]
        quality: Quality,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Quality {
    Low,
    Normal,
    High,
}

impl From<Quality> for QualityMode {
    fn from(q: Quality) -> Self {
        match q {
            Quality::Low => QualityMode::Low,
            Quality::Normal => QualityMode::Normal,
            Quality::High => QualityMode::High,
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let Commands::Audio { command } = cli.command;
    let result = match command {
        AudioCommands::Encode {
            input,
            secrets,
            output,
            quality,
            password,
        } => cmd_encode(&input, &secrets, &output, quality.into(), password),
        AudioCommands::Decode {
            input,
            output,
            password,
        } => cmd_decode(&input, &output, password),
        AudioCommands::Analyze { input, password } => cmd_analyze(&input, password),
        AudioCommands::Capacity { input, quality } => cmd_capacity(&input, quality.into()),
    };

    if let Err(err) = result {
        eprintln!("error: {err:#}");
        std::process::exit(exit_code(&err));
    }
}

/// 0 success, 2 capacity/format, 3 auth, 4 I/O, 5 cancelled.
fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<CodecError>() {
        Some(CodecError::Capacity { .. } | CodecError::Format(_) | CodecError::NoData) => 2,
        Some(CodecError::Auth | CodecError::KeyRequired(_)) => 3,
        Some(CodecError::Io(_)) => 4,
        Some(CodecError::Cancelled) => 5,
        None => 4,
    }
}

fn prompt_password(confirm: bool) -> Result<Zeroizing<String>> {
    let pw = Zeroizing::new(rpassword::prompt_password("Password: ")?);
    if confirm {
        let again = Zeroizing::new(rpassword::prompt_password("Confirm password: ")?);
        if *pw != *again {
            anyhow::bail!("passwords do not match");
        }
    }
    Ok(pw)
}

/// Prompts on demand when the decoder meets an encrypted stream without a
/// password. An empty entry cancels.
struct PromptProvider;

impl PasswordProvider for PromptProvider {
    fn request(&mut self, version: CipherVersion) -> PasswordResponse {
        eprintln!("Stream is encrypted ({version}).");
        match rpassword::prompt_password("Password (empty to abort): ") {
            Ok(pw) if pw.is_empty() => PasswordResponse::Cancelled,
            Ok(pw) => PasswordResponse::Password(Zeroizing::new(pw)),
            Err(_) => PasswordResponse::Unavailable,
        }
    }
}

/// Renders per-file pipeline events as an indicatif bar.
#[derive(Default)]
struct BarSink {
    bar: Option<ProgressBar>,
}

impl BarSink {
    fn advance(&mut self, name: &str, index: usize, total: usize) {
        let bar = self.bar.get_or_insert_with(|| {
            let bar = ProgressBar::new(total as u64);
            bar.set_style(
                ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}")
                    .expect("valid progress template"),
            );
            bar
        });
        bar.set_message(name.to_string());
        bar.set_position(index as u64 + 1);
    }

    fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

impl ProgressSink for BarSink {
    fn on_encoded(&mut self, name: &str, index: usize, total: usize) -> Control {
        self.advance(name, index, total);
        Control::Continue
    }

    fn on_decoded(&mut self, name: &str, index: usize, total: usize) -> Control {
        self.advance(name, index, total);
        Control::Continue
    }
}

fn cmd_encode(
    input: &PathBuf,
    secrets: &[PathBuf],
    output: &PathBuf,
    mode: QualityMode,
    password: bool,
) -> Result<()> {
    let pw = if password {
        Some(prompt_password(true)?)
    } else {
        None
    };

    let mut sink = BarSink::default();
    ghostbit::encode(
        input,
        secrets,
        output,
        mode,
        pw.as_ref().map(|p| p.as_str()),
        &mut sink,
    )
    .with_context(|| format!("encode into carrier {}", input.display()))?;
    sink.finish();

    println!(
        "OK: hid {} file(s) at {} quality{}",
        secrets.len(),
        mode,
        if password { " (encrypted)" } else { "" }
    );
    println!("Wrote: {}", output.display());
    Ok(())
}

fn cmd_decode(input: &PathBuf, output: &PathBuf, password: bool) -> Result<()> {
    let pw = if password {
        Some(prompt_password(false)?)
    } else {
        None
    };

    let mut sink = BarSink::default();
    let written = ghostbit::decode(
        input,
        output,
        pw.as_ref().map(|p| p.as_str()),
        &mut PromptProvider,
        &mut sink,
    )
    .with_context(|| format!("decode {}", input.display()))?;
    sink.finish();

    println!("OK: extracted {} file(s)", written.len());
    for path in &written {
        println!("  {}", path.display());
    }
    Ok(())
}

fn cmd_analyze(input: &PathBuf, password: bool) -> Result<()> {
    let pw = if password {
        Some(prompt_password(false)?)
    } else {
        None
    };

    let report = ghostbit::analyze_file(input, pw.as_ref().map(|p| p.as_str()))
        .with_context(|| format!("analyze {}", input.display()))?;

    if !report.hidden_data {
        println!("No hidden data found in {}", input.display());
        return Ok(());
    }

    println!("Hidden data found in {}", input.display());
    if let Some(quality) = report.quality {
        println!("  Quality: {quality}");
    }
    if let Some(cipher) = report.cipher {
        println!("  Cipher:  {cipher}");
    }
    if let Some(len) = report.payload_len {
        println!("  Payload: {len} bytes");
    }
    if report.corrupt {
        println!("  WARNING: stream failed validation (corrupt data or wrong password)");
    }
    if report.files.is_empty() {
        if matches!(
            report.cipher,
            Some(CipherVersion::AesGcm | CipherVersion::AesCbcLegacy)
        ) && !report.corrupt
        {
            println!("  Files:   locked (run with -p to list)");
        }
    } else {
        println!("  Files:");
        for f in &report.files {
            println!("    {} ({} bytes)", f.name, f.size);
        }
    }
    Ok(())
}

fn cmd_capacity(input: &PathBuf, mode: QualityMode) -> Result<()> {
    let bytes = ghostbit::capacity(input, mode)
        .with_context(|| format!("read carrier {}", input.display()))?;
    println!(
        "{} can hold about {} bytes at {} quality",
        input.display(),
        bytes,
        mode
    );
    Ok(())
}
