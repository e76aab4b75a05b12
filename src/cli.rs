// Idiomatic Rust CLI for Oxihex.
//
// One binary with explicit subcommands over the library: `merge` carries the
// classic hexmerge surface (output range, per-file ranges, overlap policy),
// the rest cover hex<->bin conversion, dump-diffing, dumping and inspection.
// Every handled error prints one line to stderr and exits 1; help and
// version exit 0.

use std::io::{self, BufWriter, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};

use crate::ihex::reader::{HexReader, ReadOptions};
use crate::ihex::writer::{WriteOptions, write_hex};
use crate::image::{Image, Overlap, StartAddress};
use crate::io::{load_bin_file, load_hex_file, save_bin_file, save_hex_file};
use crate::merge::{diff_dumps, merge};

const BUF_SIZE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Hex address / range parsing
// ---------------------------------------------------------------------------

fn parse_hex_addr(s: &str) -> Result<u64, String> {
    let trimmed = s.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    u64::from_str_radix(digits, 16).map_err(|e| format!("invalid hex address '{s}': {e}"))
}

/// `START:END`, both halves hex and inclusive, either omissible.
fn parse_range(s: &str) -> Result<(Option<u64>, Option<u64>), String> {
    let Some((start, end)) = s.split_once(':') else {
        return Err(format!("invalid range '{s}': expected START:END"));
    };
    let start = if start.is_empty() {
        None
    } else {
        Some(parse_hex_addr(start)?)
    };
    let end = if end.is_empty() {
        None
    } else {
        Some(parse_hex_addr(end)?)
    };
    Ok((start, end))
}

/// `FILE[:START:END]` input notation. The suffix is recognized when the last
/// two colon-separated fields are empty-or-hex, so filenames with colons
/// elsewhere still work.
fn parse_file_spec(spec: &str) -> Result<(String, Option<u64>, Option<u64>), String> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() >= 3 {
        let is_bound = |t: &str| t.is_empty() || t.chars().all(|c| c.is_ascii_hexdigit());
        let (start, end) = (parts[parts.len() - 2], parts[parts.len() - 1]);
        if is_bound(start) && is_bound(end) {
            let name = parts[..parts.len() - 2].join(":");
            if name.is_empty() {
                return Err(format!("invalid input '{spec}': empty file name"));
            }
            let start = if start.is_empty() {
                None
            } else {
                Some(parse_hex_addr(start)?)
            };
            let end = if end.is_empty() {
                None
            } else {
                Some(parse_hex_addr(end)?)
            };
            return Ok((name, start, end));
        }
        return Err(format!("invalid range suffix in '{spec}'"));
    }
    Ok((spec.to_string(), None, None))
}

fn parse_pad_byte(s: &str) -> Result<u8, String> {
    let value = parse_hex_addr(s)?;
    u8::try_from(value).map_err(|_| format!("pad byte '{s}' does not fit in one byte"))
}

fn parse_offset(s: &str) -> Result<u64, String> {
    let trimmed = s.trim();
    if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).map_err(|e| format!("invalid offset '{s}': {e}"))
    } else {
        trimmed
            .parse()
            .map_err(|e| format!("invalid offset '{s}': {e}"))
    }
}

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Intel HEX image tool: merge, convert, diff and inspect hex files.
#[derive(Parser, Debug)]
#[command(
    name = "oxihex",
    version,
    about = "Intel HEX merge/convert/diff tool",
    disable_version_flag = true,
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Print version information.
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: Option<bool>,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// Verbose logging (use twice for trace detail).
    #[arg(long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Merge hex files into one image.
    Merge(MergeArgs),
    /// Convert a hex file to raw binary.
    Hex2bin(Hex2BinArgs),
    /// Convert a raw binary file to hex.
    Bin2hex(Bin2HexArgs),
    /// Show a unified diff of two hex files as dump rows.
    Diff(DiffArgs),
    /// Render the hex+ASCII dump of a hex file.
    Dump(DumpArgs),
    /// Print address extent, segments and start address.
    Info(InfoArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OverlapArg {
    /// Stop with an error on conflicting data.
    Error,
    /// Keep data from the first file holding an address.
    Ignore,
    /// Use data from the last file holding an address.
    Replace,
}

impl From<OverlapArg> for Overlap {
    fn from(arg: OverlapArg) -> Self {
        match arg {
            OverlapArg::Error => Overlap::Error,
            OverlapArg::Ignore => Overlap::Ignore,
            OverlapArg::Replace => Overlap::Replace,
        }
    }
}

#[derive(Args, Debug)]
struct MergeArgs {
    /// Output file (default: stdout).
    #[arg(short = 'o', long, value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,

    /// Address range to keep in the output (hex, inclusive, either half
    /// omissible).
    #[arg(short = 'r', long, value_name = "START:END")]
    range: Option<String>,

    /// Don't write the start address record to the output.
    #[arg(long = "no-start-addr")]
    no_start_addr: bool,

    /// What to do when data in the input files overlaps.
    #[arg(long, value_enum, default_value_t = OverlapArg::Error)]
    overlap: OverlapArg,

    /// Input hex files, each optionally `FILE:START:END` (`-` for stdin).
    #[arg(required = true, value_name = "FILE[:START:END]")]
    files: Vec<String>,
}

#[derive(Args, Debug)]
struct Hex2BinArgs {
    /// Pad byte for gaps in the exported range (hex).
    #[arg(short = 'p', long, value_parser = parse_pad_byte)]
    pad: Option<u8>,

    /// Address range to export (hex, inclusive, either half omissible).
    #[arg(short = 'r', long, value_name = "START:END")]
    range: Option<String>,

    /// Input hex file.
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Output binary file (default: stdout).
    #[arg(value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct Bin2HexArgs {
    /// Address at which the binary content starts (decimal or 0x-hex).
    #[arg(long, value_parser = parse_offset, default_value = "0")]
    offset: u64,

    /// Input binary file.
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Output hex file (default: stdout).
    #[arg(value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct DiffArgs {
    /// Output file (default: stdout).
    #[arg(short = 'o', long, value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,

    /// First hex file.
    #[arg(value_hint = ValueHint::FilePath)]
    a: PathBuf,

    /// Second hex file.
    #[arg(value_hint = ValueHint::FilePath)]
    b: PathBuf,
}

#[derive(Args, Debug)]
struct DumpArgs {
    /// Output file (default: stdout).
    #[arg(short = 'o', long, value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,

    /// Addresses per dump row.
    #[arg(long, default_value_t = 16)]
    width: usize,

    /// Substitute the padding byte for unset addresses instead of `--`.
    #[arg(long = "with-padding")]
    with_padding: bool,

    /// Input hex file.
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,
}

#[derive(Args, Debug)]
struct InfoArgs {
    /// Input hex files.
    #[arg(required = true, value_hint = ValueHint::FilePath)]
    files: Vec<PathBuf>,
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Load one merge input: a hex file, or stdin for `-`.
fn load_merge_input(name: &str) -> Result<Image, String> {
    if name == "-" {
        let stdin = io::stdin();
        let mut image = Image::new();
        HexReader::with_options(stdin.lock(), ReadOptions::default())
            .read_into(&mut image)
            .map_err(|e| format!("<stdin>: {e}"))?;
        Ok(image)
    } else {
        load_hex_file(Path::new(name)).map_err(|e| format!("{name}: {e}"))
    }
}

/// Restrict an image to an inclusive address window, keeping the start
/// address (`--no-start-addr` is the explicit control for dropping it).
fn clip_image(image: &Image, start: Option<u64>, end: Option<u64>) -> Result<Image, String> {
    if (start.is_none() && end.is_none()) || image.is_empty() {
        return Ok(image.clone());
    }
    let mut out = image
        .get_range(start, end.map(|e| e.saturating_add(1)), 1)
        .map_err(|e| e.to_string())?;
    out.set_start_addr(image.start_addr());
    Ok(out)
}

fn open_output(path: Option<&PathBuf>) -> Result<Box<dyn Write>, String> {
    match path {
        Some(path) => {
            let file = std::fs::File::create(path)
                .map_err(|e| format!("{}: {e}", path.display()))?;
            Ok(Box::new(BufWriter::with_capacity(BUF_SIZE, file)))
        }
        None => Ok(Box::new(BufWriter::with_capacity(
            BUF_SIZE,
            io::stdout().lock(),
        ))),
    }
}

fn digest_hex(digest: &[u8; 32]) -> String {
    let mut out = String::with_capacity(64);
    for b in digest {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

// ---------------------------------------------------------------------------
// Merge command
// ---------------------------------------------------------------------------

fn cmd_merge(cli: &Cli, args: &MergeArgs) -> i32 {
    let out_range = match args.range.as_deref().map(parse_range).transpose() {
        Ok(r) => r.unwrap_or((None, None)),
        Err(e) => {
            eprintln!("oxihex: {e}");
            return 1;
        }
    };

    let mut result = Image::new();
    for spec in &args.files {
        let (name, start, end) = match parse_file_spec(spec) {
            Ok(parsed) => parsed,
            Err(e) => {
                eprintln!("oxihex: {e}");
                return 1;
            }
        };
        let image = match load_merge_input(&name) {
            Ok(image) => image,
            Err(e) => {
                eprintln!("oxihex: {e}");
                return 1;
            }
        };
        let image = match clip_image(&image, start, end) {
            Ok(image) => image,
            Err(e) => {
                eprintln!("oxihex: {name}: {e}");
                return 1;
            }
        };
        if let Err(e) = merge(&mut result, &image, args.overlap.into()) {
            eprintln!("oxihex: {name}: {e}");
            return 1;
        }
    }

    let result = match clip_image(&result, out_range.0, out_range.1) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("oxihex: {e}");
            return 1;
        }
    };

    let write_opts = WriteOptions {
        write_start_addr: !args.no_start_addr,
        ..Default::default()
    };
    let records = match &args.output {
        Some(path) => match save_hex_file(path, &result, &write_opts) {
            Ok(stats) => stats.records,
            Err(e) => {
                eprintln!("oxihex: {}: {e}", path.display());
                return 1;
            }
        },
        None => {
            let mut out = BufWriter::with_capacity(BUF_SIZE, io::stdout().lock());
            match write_hex(&result, &mut out, &write_opts).and_then(|r| {
                out.flush()?;
                Ok(r)
            }) {
                Ok(records) => records,
                Err(e) => {
                    eprintln!("oxihex: {e}");
                    return 1;
                }
            }
        }
    };

    if !cli.quiet {
        if let Some(path) = &args.output {
            eprintln!(
                "oxihex: merged {} input(s), {} data bytes -> {}",
                args.files.len(),
                result.len(),
                path.display()
            );
        }
    }
    if cli.json_output {
        let json = serde_json::json!({
            "command": "merge",
            "inputs": args.files.len(),
            "data_bytes": result.len(),
            "records": records,
        });
        eprintln!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
    }

    0
}

// ---------------------------------------------------------------------------
// Conversion commands
// ---------------------------------------------------------------------------

fn cmd_hex2bin(cli: &Cli, args: &Hex2BinArgs) -> i32 {
    let (start, end) = match args.range.as_deref().map(parse_range).transpose() {
        Ok(r) => r.unwrap_or((None, None)),
        Err(e) => {
            eprintln!("oxihex: {e}");
            return 1;
        }
    };

    let mut image = match load_hex_file(&args.input) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("oxihex: {}: {e}", args.input.display());
            return 1;
        }
    };
    if let Some(pad) = args.pad {
        image.set_padding(pad);
    }

    let size = match &args.output {
        Some(path) => match save_bin_file(path, &image, start, end, None) {
            Ok(stats) => {
                if cli.json_output {
                    let json = serde_json::json!({
                        "command": "hex2bin",
                        "size": stats.size,
                        "sha256": stats.sha256.as_ref().map(digest_hex),
                    });
                    eprintln!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
                }
                stats.size
            }
            Err(e) => {
                eprintln!("oxihex: {}: {e}", path.display());
                return 1;
            }
        },
        None => {
            let bytes = match image.to_bin_array(start, end, None) {
                Ok(bytes) => bytes,
                Err(e) => {
                    eprintln!("oxihex: {e}");
                    return 1;
                }
            };
            let mut out = io::stdout().lock();
            if let Err(e) = out.write_all(&bytes).and_then(|()| out.flush()) {
                eprintln!("oxihex: {e}");
                return 1;
            }
            bytes.len() as u64
        }
    };

    if !cli.quiet {
        if let Some(path) = &args.output {
            eprintln!("oxihex: wrote {size} bytes -> {}", path.display());
        }
    }

    0
}

fn cmd_bin2hex(cli: &Cli, args: &Bin2HexArgs) -> i32 {
    let image = match load_bin_file(&args.input, args.offset) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("oxihex: {}: {e}", args.input.display());
            return 1;
        }
    };

    let write_opts = WriteOptions::default();
    let records = match &args.output {
        Some(path) => match save_hex_file(path, &image, &write_opts) {
            Ok(stats) => stats.records,
            Err(e) => {
                eprintln!("oxihex: {}: {e}", path.display());
                return 1;
            }
        },
        None => {
            let mut out = BufWriter::with_capacity(BUF_SIZE, io::stdout().lock());
            match write_hex(&image, &mut out, &write_opts).and_then(|r| {
                out.flush()?;
                Ok(r)
            }) {
                Ok(records) => records,
                Err(e) => {
                    eprintln!("oxihex: {e}");
                    return 1;
                }
            }
        }
    };

    if !cli.quiet {
        if let Some(path) = &args.output {
            eprintln!("oxihex: wrote {records} records -> {}", path.display());
        }
    }

    0
}

// ---------------------------------------------------------------------------
// Diff / dump / info commands
// ---------------------------------------------------------------------------

fn cmd_diff(args: &DiffArgs) -> i32 {
    let load = |path: &PathBuf| {
        load_hex_file(path).map_err(|e| format!("{}: {e}", path.display()))
    };
    let (a, b) = match (load(&args.a), load(&args.b)) {
        (Ok(a), Ok(b)) => (a, b),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("oxihex: {e}");
            return 1;
        }
    };

    let mut out = match open_output(args.output.as_ref()) {
        Ok(out) => out,
        Err(e) => {
            eprintln!("oxihex: {e}");
            return 1;
        }
    };
    let name_a = args.a.display().to_string();
    let name_b = args.b.display().to_string();
    if let Err(e) = diff_dumps(&a, &b, &mut out, &name_a, &name_b).map_err(|e| e.to_string()) {
        eprintln!("oxihex: {e}");
        return 1;
    }
    if let Err(e) = out.flush() {
        eprintln!("oxihex: {e}");
        return 1;
    }

    0
}

fn cmd_dump(args: &DumpArgs) -> i32 {
    let image = match load_hex_file(&args.input) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("oxihex: {}: {e}", args.input.display());
            return 1;
        }
    };
    let mut out = match open_output(args.output.as_ref()) {
        Ok(out) => out,
        Err(e) => {
            eprintln!("oxihex: {e}");
            return 1;
        }
    };
    if let Err(e) = image.dump(&mut out, args.width, args.with_padding) {
        eprintln!("oxihex: {e}");
        return 1;
    }
    if let Err(e) = out.flush() {
        eprintln!("oxihex: {e}");
        return 1;
    }

    0
}

fn cmd_info(cli: &Cli, args: &InfoArgs) -> i32 {
    for path in &args.files {
        let image = match load_hex_file(path) {
            Ok(image) => image,
            Err(e) => {
                eprintln!("oxihex: {}: {e}", path.display());
                return 1;
            }
        };
        println!("file: {}", path.display());
        println!("  data bytes: {}", image.len());
        match (image.min_addr(), image.max_addr()) {
            (Some(min), Some(max)) => println!("  address range: {min:#06X}..{max:#06X}"),
            _ => println!("  address range: (empty)"),
        }
        let segments = image.segments(1);
        println!("  segments: {}", segments.len());
        for (start, end) in &segments {
            println!("    {start:#06X}..{end:#06X}");
        }
        match image.start_addr() {
            Some(StartAddress::Segment { cs, ip }) => {
                println!("  start address: CS = {cs:#06X}, IP = {ip:#06X}");
            }
            Some(StartAddress::Linear { eip }) => {
                println!("  start address: EIP = {eip:#010X}");
            }
            None => {}
        }
        if cli.json_output {
            let json = serde_json::json!({
                "command": "info",
                "file": path.display().to_string(),
                "data_bytes": image.len(),
                "segments": segments,
            });
            eprintln!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
        }
    }

    0
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run() -> ! {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version are not failures; everything else is.
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            process::exit(code);
        }
    };

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .format_target(false)
        .init();

    // Piping binary output to a terminal is almost always an accident.
    if let Cmd::Hex2bin(args) = &cli.command {
        if args.output.is_none() && io::stdout().is_terminal() && !cli.quiet {
            eprintln!("oxihex: warning: writing raw binary to a terminal");
        }
    }

    let exit_code = match &cli.command {
        Cmd::Merge(args) => cmd_merge(&cli, args),
        Cmd::Hex2bin(args) => cmd_hex2bin(&cli, args),
        Cmd::Bin2hex(args) => cmd_bin2hex(&cli, args),
        Cmd::Diff(args) => cmd_diff(args),
        Cmd::Dump(args) => cmd_dump(args),
        Cmd::Info(args) => cmd_info(&cli, args),
    };

    process::exit(exit_code);
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("oxihex".to_string())
        .chain(args.iter().cloned())
        .collect();
    let _ = Cli::try_parse_from(argv);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let argv: Vec<String> = std::iter::once("oxihex".to_string())
            .chain(args.iter().map(|s| s.to_string()))
            .collect();
        Cli::try_parse_from(argv).expect("cli parse failed")
    }

    #[test]
    fn parse_hex_addr_forms() {
        assert_eq!(parse_hex_addr("0100").unwrap(), 0x100);
        assert_eq!(parse_hex_addr("0x0100").unwrap(), 0x100);
        assert_eq!(parse_hex_addr("DEAD").unwrap(), 0xDEAD);
        assert!(parse_hex_addr("xyz").is_err());
    }

    #[test]
    fn parse_range_halves_omissible() {
        assert_eq!(parse_range("0100:0FFF").unwrap(), (Some(0x100), Some(0xFFF)));
        assert_eq!(parse_range("0100:").unwrap(), (Some(0x100), None));
        assert_eq!(parse_range(":0FFF").unwrap(), (None, Some(0xFFF)));
        assert!(parse_range("0100").is_err());
        assert!(parse_range("zz:0FFF").is_err());
    }

    #[test]
    fn parse_file_spec_forms() {
        assert_eq!(
            parse_file_spec("fw.hex").unwrap(),
            ("fw.hex".to_string(), None, None)
        );
        assert_eq!(
            parse_file_spec("fw.hex:0100:0FFF").unwrap(),
            ("fw.hex".to_string(), Some(0x100), Some(0xFFF))
        );
        assert_eq!(
            parse_file_spec("fw.hex::0FFF").unwrap(),
            ("fw.hex".to_string(), None, Some(0xFFF))
        );
        assert_eq!(
            parse_file_spec("fw.hex:0100:").unwrap(),
            ("fw.hex".to_string(), Some(0x100), None)
        );
        assert!(parse_file_spec("fw.hex:01zz:").is_err());
    }

    #[test]
    fn merge_args_parse() {
        let cli = parse(&[
            "merge",
            "-o",
            "out.hex",
            "-r",
            "0100:0FFF",
            "--overlap",
            "replace",
            "--no-start-addr",
            "a.hex",
            "b.hex:0000:00FF",
        ]);
        match cli.command {
            Cmd::Merge(args) => {
                assert_eq!(args.output, Some(PathBuf::from("out.hex")));
                assert_eq!(args.range.as_deref(), Some("0100:0FFF"));
                assert_eq!(args.overlap, OverlapArg::Replace);
                assert!(args.no_start_addr);
                assert_eq!(args.files.len(), 2);
            }
            other => panic!("expected merge, got {other:?}"),
        }
    }

    #[test]
    fn merge_requires_inputs() {
        let argv = ["oxihex", "merge"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn overlap_arg_maps_to_policy() {
        assert_eq!(Overlap::from(OverlapArg::Error), Overlap::Error);
        assert_eq!(Overlap::from(OverlapArg::Ignore), Overlap::Ignore);
        assert_eq!(Overlap::from(OverlapArg::Replace), Overlap::Replace);
    }

    #[test]
    fn hex2bin_args_parse() {
        let cli = parse(&["hex2bin", "-p", "00", "-r", ":1FFF", "fw.hex", "fw.bin"]);
        match cli.command {
            Cmd::Hex2bin(args) => {
                assert_eq!(args.pad, Some(0x00));
                assert_eq!(args.range.as_deref(), Some(":1FFF"));
                assert_eq!(args.input, PathBuf::from("fw.hex"));
                assert_eq!(args.output, Some(PathBuf::from("fw.bin")));
            }
            other => panic!("expected hex2bin, got {other:?}"),
        }
    }

    #[test]
    fn bin2hex_offset_forms() {
        let cli = parse(&["bin2hex", "--offset", "0x8000", "fw.bin"]);
        match cli.command {
            Cmd::Bin2hex(args) => assert_eq!(args.offset, 0x8000),
            other => panic!("expected bin2hex, got {other:?}"),
        }
        let cli = parse(&["bin2hex", "--offset", "4096", "fw.bin"]);
        match cli.command {
            Cmd::Bin2hex(args) => assert_eq!(args.offset, 4096),
            other => panic!("expected bin2hex, got {other:?}"),
        }
    }

    #[test]
    fn clip_image_is_inclusive_and_keeps_start_addr() {
        let mut ih = Image::new();
        ih.put_bytes(0x100, &[1, 2, 3, 4]);
        ih.set_start_addr(Some(StartAddress::Linear { eip: 7 }));
        let clipped = clip_image(&ih, Some(0x101), Some(0x102)).unwrap();
        assert_eq!(clipped.addresses(), vec![0x101, 0x102]);
        assert_eq!(clipped.start_addr(), Some(StartAddress::Linear { eip: 7 }));
    }
}
