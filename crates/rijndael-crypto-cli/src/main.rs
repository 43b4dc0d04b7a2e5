use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use rijndael_crypto::{decrypt_with_options, DecryptOptions};

const PASSWORD_ENV: &str = "RIJNDAEL_PASSWORD";

#[derive(Debug, Parser)]
#[command(name = "rijndael-decrypt")]
#[command(about = "Decrypt Base64 blobs produced by the legacy .NET Rijndael-256 encryptor.")]
struct Cli {
    /// Optional input file holding the Base64 blob. If omitted, reads from stdin.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Password used by the producer.
    ///
    /// Falls back to `--password-file`, then to the `RIJNDAEL_PASSWORD` environment variable.
    #[arg(long, conflicts_with = "password_file")]
    password: Option<String>,

    /// Read the password from a file (first line).
    #[arg(long = "password-file", conflicts_with = "password")]
    password_file: Option<PathBuf>,

    /// Keep U+000B / U+0014 in the output instead of removing them like the legacy decryptor.
    #[arg(long)]
    keep_control_chars: bool,
}

fn main() {
    let _logger = match flexi_logger::Logger::try_with_env_or_str("warn")
        .and_then(|logger| logger.log_to_stderr().start())
    {
        Ok(handle) => Some(handle),
        Err(err) => {
            eprintln!("warning: failed to initialise logging: {err}");
            None
        }
    };

    if let Err(err) = run(Cli::parse()) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let input = read_all_input(&cli.input)?;
    let password = resolve_password(&cli.password, &cli.password_file)?;

    let options = DecryptOptions {
        strip_legacy_control_chars: !cli.keep_control_chars,
        ..DecryptOptions::default()
    };
    let plaintext = decrypt_with_options(input.trim(), &password, &options)
        .context("failed to decrypt input")?;
    log::debug!("decrypted {} characters", plaintext.chars().count());

    write_stdout(plaintext.as_bytes())
}

fn read_all_input(input: &Option<PathBuf>) -> Result<String> {
    if let Some(path) = input {
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
    } else {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        Ok(buf)
    }
}

fn resolve_password(password: &Option<String>, password_file: &Option<PathBuf>) -> Result<String> {
    if let Some(value) = password {
        return Ok(value.clone());
    }
    if let Some(path) = password_file {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read password file {}", path.display()))?;
        let pw = contents.lines().next().unwrap_or("");
        if pw.is_empty() {
            bail!(
                "password file {} is empty (expected password on first line)",
                path.display()
            );
        }
        return Ok(pw.to_string());
    }
    match std::env::var(PASSWORD_ENV) {
        Ok(pw) if !pw.is_empty() => Ok(pw),
        _ => bail!("password required (use --password, --password-file or {PASSWORD_ENV})"),
    }
}

/// Write to stdout, treating a closed pipe (e.g. `| head`) as success.
fn write_stdout(bytes: &[u8]) -> Result<()> {
    let mut stdout = io::stdout().lock();
    let res = stdout.write_all(bytes).and_then(|()| stdout.flush());
    match res {
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other.context("failed to write stdout"),
    }
}
