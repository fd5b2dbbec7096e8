//! CLI entry point for the `regdump` register layout tool.

use std::env;
use std::ffi::OsString;
use std::str::FromStr;

use debug_regs::{
    DebugMode, Extensions, Hart, HartConfig, RegisterAccess, RegisterDescriptor, RegisterView,
    TableMode,
};
use serde::Serialize;
use tracing::Level;

const USAGE_TEXT: &str = "\
Usage: regdump <command> [options]

Commands:
  groups                 List the register groups the hart supports
  list                   List registers in table order

Options:
  --isa <letters>        ISA extensions (default: imafdcsu)
  --xlen <32|64>         General register width (default: 64)
  --flen <0|32|64>       Floating-point register width (default: 64)
  --vlen <bits>          Vector register width (default: 128)
  --debug-mode <mode>    none, interrupt, halt or vector (default: none)
  --restricted           Use the restricted register table
  --view <all|core|csr>  Visibility filter for list (default: all)
  --json                 Emit JSON instead of text
  --log-level <level>    error, warn, info, debug or trace (default: warn)
  -h, --help             Show this help message

Examples:
  regdump groups --isa imafdv --vlen 256
  regdump list --xlen 32 --isa imc --restricted
  regdump list --view csr --debug-mode halt --json
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Groups,
    List,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Options {
    command: Command,
    config: HartConfig,
    mode: TableMode,
    view: RegisterView,
    json: bool,
    log_level: Level,
}

#[derive(Debug)]
enum ParseResult {
    Run(Options),
    Help,
}

fn parse_value<T: FromStr>(flag: &str, value: Option<OsString>) -> Result<T, String> {
    let value = value.ok_or_else(|| format!("missing value for {flag}"))?;
    let text = value.to_string_lossy();
    text.parse()
        .map_err(|_| format!("invalid value for {flag}: {text}"))
}

fn parse_view(value: &str) -> Result<RegisterView, String> {
    match value {
        "all" => Ok(RegisterView::All),
        "core" => Ok(RegisterView::NonCsr),
        "csr" => Ok(RegisterView::CsrOnly),
        other => Err(format!("invalid value for --view: {other}")),
    }
}

#[allow(clippy::while_let_on_iterator)]
fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let first = args.next().ok_or_else(|| "missing command".to_string())?;

    if first == "--help" || first == "-h" {
        return Ok(ParseResult::Help);
    }

    let command = match &*first.to_string_lossy() {
        "groups" => Command::Groups,
        "list" => Command::List,
        other => return Err(format!("unknown command: {other}")),
    };

    let mut options = Options {
        command,
        config: HartConfig::default(),
        mode: TableMode::Full,
        view: RegisterView::All,
        json: false,
        log_level: Level::WARN,
    };

    while let Some(arg) = args.next() {
        match &*arg.to_string_lossy() {
            "-h" | "--help" => return Err(USAGE_TEXT.to_string()),
            "--restricted" => options.mode = TableMode::Restricted,
            "--json" => options.json = true,
            "--isa" => {
                let letters: String = parse_value("--isa", args.next())?;
                options.config.extensions =
                    Extensions::from_letters(&letters).map_err(|e| e.to_string())?;
            }
            "--xlen" => options.config.xlen = parse_value("--xlen", args.next())?,
            "--flen" => options.config.flen = parse_value("--flen", args.next())?,
            "--vlen" => options.config.vlen = parse_value("--vlen", args.next())?,
            "--debug-mode" => {
                let mode: String = parse_value("--debug-mode", args.next())?;
                options.config.debug_mode =
                    DebugMode::from_str(&mode).map_err(|e| e.to_string())?;
            }
            "--view" => {
                let view: String = parse_value("--view", args.next())?;
                options.view = parse_view(&view)?;
            }
            "--log-level" => options.log_level = parse_value("--log-level", args.next())?,
            other => return Err(format!("unknown option: {other}")),
        }
    }

    Ok(ParseResult::Run(options))
}

fn init_logging(level: Level) -> Result<(), String> {
    let subscriber = tracing_subscriber::fmt()
        .without_time()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).map_err(|e| e.to_string())
}

#[derive(Debug, Serialize)]
struct GroupEntry {
    name: &'static str,
    registers: usize,
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    description: &'static str,
    config: &'a HartConfig,
    mode: TableMode,
    view: RegisterView,
    diagnostics: Vec<String>,
    registers: Vec<&'a RegisterDescriptor>,
}

fn group_entries(hart: &Hart, mode: TableMode) -> Vec<GroupEntry> {
    std::iter::successors(hart.next_group(None), |group| hart.next_group(Some(*group)))
        .map(|group| GroupEntry {
            name: group.name(),
            registers: hart
                .registers(mode, RegisterView::All)
                .filter(|reg| reg.group == group)
                .count(),
        })
        .filter(|entry| entry.registers > 0)
        .collect()
}

fn format_register(reg: &RegisterDescriptor) -> String {
    let access = match reg.access {
        RegisterAccess::ReadOnly => "ro",
        RegisterAccess::ReadWrite => "rw",
    };
    format!(
        "{:#06x}  {:<14} {:>5}  {access}  {}",
        reg.index,
        reg.name,
        reg.bits,
        reg.group.name()
    )
}

fn run(options: &Options) -> Result<(), String> {
    let hart = Hart::new(options.config.clone()).map_err(|e| e.to_string())?;
    let table = hart
        .register_table(options.mode)
        .map_err(|e| e.to_string())?;
    for diagnostic in table.diagnostics() {
        tracing::debug!(%diagnostic, "table diagnostic");
    }

    match options.command {
        Command::Groups => {
            let groups = group_entries(&hart, options.mode);
            if options.json {
                let text = serde_json::to_string_pretty(&groups).map_err(|e| e.to_string())?;
                println!("{text}");
            } else {
                println!("{} ({})", hart.description(), options.config.extensions);
                for group in &groups {
                    println!("  {:<32} {:>4}", group.name, group.registers);
                }
            }
        }
        Command::List => {
            let registers: Vec<_> = hart.registers(options.mode, options.view).collect();
            if options.json {
                let report = Report {
                    description: hart.description(),
                    config: hart.config(),
                    mode: options.mode,
                    view: options.view,
                    diagnostics: table.diagnostics().iter().map(ToString::to_string).collect(),
                    registers,
                };
                let text = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
                println!("{text}");
            } else {
                for reg in registers {
                    println!("{}", format_register(reg));
                }
            }
        }
    }
    Ok(())
}

fn main() {
    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            println!("{USAGE_TEXT}");
            0
        }
        Ok(ParseResult::Run(options)) => {
            match init_logging(options.log_level).and_then(|()| run(&options)) {
                Ok(()) => 0,
                Err(error) => {
                    eprintln!("error: {error}");
                    1
                }
            }
        }
        Err(error) => {
            if error.starts_with("Usage:") {
                println!("{error}");
            } else {
                eprintln!("error: {error}");
                eprintln!("{USAGE_TEXT}");
            }
            1
        }
    };

    std::process::exit(exit_code);
}

#[cfg(test)]
mod tests {
    use super::*;
    use debug_regs::{RegisterGroup, DEFAULT_VLEN};
    use std::ffi::OsString;

    fn args(list: &[&str]) -> impl Iterator<Item = OsString> {
        list.iter()
            .map(OsString::from)
            .collect::<Vec<_>>()
            .into_iter()
    }

    fn options(list: &[&str]) -> Options {
        match parse_args(args(list)).expect("valid args should parse") {
            ParseResult::Run(options) => options,
            ParseResult::Help => panic!("expected a command"),
        }
    }

    #[test]
    fn parses_list_with_configuration() {
        let parsed = options(&[
            "list",
            "--isa",
            "imc",
            "--xlen",
            "32",
            "--flen",
            "0",
            "--restricted",
            "--view",
            "csr",
            "--json",
        ]);

        assert_eq!(parsed.command, Command::List);
        assert_eq!(
            parsed.config.extensions,
            Extensions::I | Extensions::M | Extensions::C
        );
        assert_eq!(parsed.config.xlen, 32);
        assert_eq!(parsed.config.flen, 0);
        assert_eq!(parsed.mode, TableMode::Restricted);
        assert_eq!(parsed.view, RegisterView::CsrOnly);
        assert!(parsed.json);
    }

    #[test]
    fn defaults_match_the_default_hart() {
        let parsed = options(&["groups"]);
        assert_eq!(parsed.command, Command::Groups);
        assert_eq!(parsed.config, HartConfig::default());
        assert_eq!(parsed.config.vlen, DEFAULT_VLEN);
        assert_eq!(parsed.mode, TableMode::Full);
        assert_eq!(parsed.log_level, Level::WARN);
    }

    #[test]
    fn parses_debug_mode_and_log_level() {
        let parsed = options(&["list", "--debug-mode", "halt", "--log-level", "debug"]);
        assert_eq!(parsed.config.debug_mode, DebugMode::Halt);
        assert_eq!(parsed.log_level, Level::DEBUG);
    }

    #[test]
    fn parses_help_flag() {
        let result = parse_args(args(&["--help"])).expect("help should parse without error");
        assert!(matches!(result, ParseResult::Help));
    }

    #[test]
    fn rejects_unknown_command_and_option() {
        let error = parse_args(args(&["dump"])).expect_err("unknown command should fail");
        assert!(error.contains("unknown command"));

        let error = parse_args(args(&["list", "--fast"])).expect_err("unknown option should fail");
        assert!(error.contains("unknown option"));
    }

    #[test]
    fn rejects_bad_values() {
        let error = parse_args(args(&["list", "--xlen"])).expect_err("missing value");
        assert!(error.contains("missing value for --xlen"));

        let error = parse_args(args(&["list", "--isa", "iq"])).expect_err("bad letter");
        assert!(error.contains("'q'"));

        let error = parse_args(args(&["list", "--view", "fp"])).expect_err("bad view");
        assert!(error.contains("--view"));
    }

    #[test]
    fn second_logging_setup_reports_the_installed_subscriber() {
        assert_eq!(init_logging(Level::WARN), Ok(()));
        let error = init_logging(Level::DEBUG).expect_err("subscriber already installed");
        assert!(!error.is_empty());
    }

    #[test]
    fn groups_report_register_counts() {
        let hart = Hart::new(HartConfig::default()).expect("valid config");
        let groups = group_entries(&hart, TableMode::Full);
        assert_eq!(groups[0].name, RegisterGroup::Core.name());
        assert_eq!(groups[0].registers, 33);
        assert_eq!(groups[1].registers, 32);
    }

    #[test]
    fn register_lines_are_aligned() {
        let hart = Hart::new(HartConfig::default()).expect("valid config");
        let sp = hart.register_by_name("sp").expect("sp present");
        assert_eq!(format_register(sp), "0x0002  sp                64  rw  Core");
    }
}
