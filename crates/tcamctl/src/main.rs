//! tcamctl: compile and apply Fir TCAM rules.
//!
//! `compile` prints the register images each rule compiles to without
//! touching hardware. `apply` programs a simulated switch from the same rule
//! file and lists the resulting table.

mod rules;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use msd_tcam::codec::{FirCodec, IngressImage, TcamPage, TcamPageCodec};
use msd_tcam::config::DEFAULT_CONFIG_PATH;
use msd_hal::RegisterTransport;
use msd_tcam::simulator::SimulatedSwitch;
use msd_tcam::{compile, ScanCursor, TcamConfig, TcamTable};
use rules::RuleFile;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Fir TCAM rule tool
#[derive(Parser, Debug)]
#[command(name = "tcamctl")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log level (debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile every rule and print its entry page images
    Compile {
        /// TOML rule file
        rules: PathBuf,
    },
    /// Apply a rule file to a simulated switch and list the programmed entries
    Apply {
        /// TOML rule file
        rules: PathBuf,
    },
    /// Print the effective configuration
    ShowConfig,
}

fn init_logging(level: &str) -> Result<()> {
    let filter =
        EnvFilter::try_new(level).with_context(|| format!("invalid log level '{}'", level))?;
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_logging(&args.log_level) {
        eprintln!("tcamctl: {:#}", e);
        return ExitCode::FAILURE;
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let config = TcamConfig::load_or_default(&args.config)?;
    config.validate()?;

    match args.command {
        Command::Compile { rules } => compile_rules(&rules),
        Command::Apply { rules } => apply_rules(&config, &rules),
        Command::ShowConfig => {
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn compile_rules(path: &Path) -> Result<()> {
    let file = RuleFile::load(path)?;
    let codec = FirCodec;

    for (n, rule) in file.rules.iter().enumerate() {
        let compiled = compile(rule).with_context(|| format!("rule #{} is invalid", n + 1))?;
        println!(
            "rule #{} ({:?}, {})",
            n + 1,
            rule.pkt_type(),
            if compiled.cascaded() { "cascaded" } else { "single entry" }
        );

        let (index, entry) = &compiled.primary;
        print_image(*index, &codec.encode_entry(entry));
        if let Some((index, entry)) = &compiled.secondary {
            print_image(*index, &codec.encode_entry(entry));
        }
    }
    Ok(())
}

fn print_image(index: u16, image: &IngressImage) {
    println!("  entry {}", index);
    for page in [TcamPage::Key, TcamPage::Window, TcamPage::Action] {
        let words: Vec<String> = page
            .live_words()
            .iter()
            .map(|word| format!("{:04x}", image.page(page)[*word]))
            .collect();
        println!("    page {}: {}", page.number(), words.join(" "));
    }
}

fn apply_rules(config: &TcamConfig, path: &Path) -> Result<()> {
    let file = RuleFile::load(path)?;
    let table = TcamTable::new(SimulatedSwitch::new(), config);
    program(&table, &file)?;
    list_entries(&table)
}

/// Flushes the table, then applies port modes, rules and egress entries in
/// file order.
fn program<T: RegisterTransport>(table: &TcamTable<T>, file: &RuleFile) -> Result<()> {
    table.flush_all()?;

    for setting in &file.modes {
        table
            .set_mode(setting.port, setting.mode)
            .with_context(|| format!("failed to set mode of port {}", setting.port))?;
    }

    for (n, rule) in file.rules.iter().enumerate() {
        let cascaded = table
            .apply_rule(rule)
            .with_context(|| format!("failed to apply rule #{}", n + 1))?;
        info!(
            "Rule #{} programmed at entry {}{}",
            n + 1,
            rule.primary,
            if cascaded { " (cascaded)" } else { "" }
        );
    }

    for setting in &file.egress {
        table
            .egress_load_entry(setting.port, setting.index, &setting.data)
            .with_context(|| {
                format!(
                    "failed to load egress entry {} on port {}",
                    setting.index, setting.port
                )
            })?;
    }
    Ok(())
}

fn list_entries<T: RegisterTransport>(table: &TcamTable<T>) -> Result<()> {
    println!("ingress entries:");
    for (index, entry) in table.entries()? {
        let action = &entry.action;
        println!(
            "  {:>3}  dpv=0x{:03x} {:?}  continue={} next={}",
            index, action.dpv_data, action.dpv_mode, action.continue_code, action.next_id
        );
    }

    for (port, _) in table.device().port_map.ports() {
        let mut cursor = ScanCursor::Start;
        loop {
            match table.egress_get_next(port, cursor) {
                Ok((index, data)) => {
                    println!("  egress port {} entry {}: {:?}", port, index, data);
                    cursor = ScanCursor::After(index.into());
                }
                Err(e) if e.is_no_such() => break,
                Err(e) => return Err(e.into()),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use msd_tcam::TcamMode;
    use msd_types::LogicalPort;
    use pretty_assertions::assert_eq;

    const RULES: &str = r#"
[[mode]]
port = 1
mode = "enable_48"

[[rule]]
primary = 30
secondary = 31

[rule.pattern]
ether_type = 0x86dd
headers = { type = "ipv6_tcp", ipv6 = { next_header = 6 }, tcp = { dst_port = 443 } }

[rule.mask]
ether_type = 0xffff
headers = { type = "ipv6_tcp", ipv6 = { next_header = 0xff }, tcp = { dst_port = 0xffff } }

[[egress]]
port = 0
index = 3
data = { eg_vid_mode_override = true, eg_vid_data = 7 }
"#;

    #[test]
    fn test_program_applies_file_in_order() {
        let (table, _sim) = msd_test::new_table();
        let file = RuleFile::parse(RULES).unwrap();

        program(&table, &file).unwrap();

        let indices: Vec<u16> = table.entries().unwrap().into_iter().map(|(i, _)| i).collect();
        assert_eq!(indices, vec![30, 31]);
        assert_eq!(table.get_mode(LogicalPort(1)).unwrap(), TcamMode::Enable48);
        let (index, data) = table.egress_get_next(LogicalPort(0), ScanCursor::Start).unwrap();
        assert_eq!(index, 3);
        assert_eq!(data.eg_vid_data, 7);
    }

    #[test]
    fn test_program_stops_at_invalid_rule() {
        let (table, sim) = msd_test::new_table();
        let file = RuleFile::parse(
            r#"
[[rule]]
primary = 600
secondary = 601
pattern = { headers = { type = "ipv4_only" } }
mask = { headers = { type = "ipv4_only" } }
"#,
        )
        .unwrap();

        let err = program(&table, &file).unwrap_err();
        assert!(format!("{:#}", err).contains("rule #1"));
        assert!(table.entries().unwrap().is_empty());
        assert!(!sim.writes().is_empty());
    }
}
