//! # memfsd
//!
//! Main entry point for the memory filesystem host daemon.

use log::LevelFilter;
use memfsd::{load_config_file, logger, DaemonConfig, MemfsDaemon};
use std::env;
use std::fs;
use std::path::Path;
use std::process;

struct Options {
    daemon: DaemonConfig,
    log_level: LevelFilter,
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("memfsd");

    let options = parse_args(&args).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        print_usage(program);
        process::exit(1);
    });

    if let Err(e) = logger::init(options.log_level) {
        eprintln!("Failed to install logger: {}", e);
    }

    let mut daemon = MemfsDaemon::new(options.daemon).unwrap_or_else(|e| {
        eprintln!("Failed to start memfsd: {}", e);
        process::exit(1);
    });

    match daemon.run() {
        Ok(lines) => {
            for line in lines {
                println!("{}", line);
            }
            log::info!(
                "{} commands, {} requests, {} live nodes",
                daemon.steps(),
                daemon.requests_handled(),
                daemon.live_nodes()
            );
        }
        Err(e) => {
            eprintln!("Runtime error: {}", e);
            process::exit(1);
        }
    }
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut options = Options {
        daemon: DaemonConfig::default(),
        log_level: LevelFilter::Info,
    };
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for --config".to_string());
                }
                options.daemon.fs =
                    load_config_file(Path::new(&args[i])).map_err(|e| e.to_string())?;
            }
            "--script" | "-s" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for --script".to_string());
                }
                let script_text = fs::read_to_string(&args[i])
                    .map_err(|e| format!("Failed to read script file: {}", e))?;
                options.daemon.script = Some(script_text);
            }
            "--log-level" | "-l" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for --log-level".to_string());
                }
                options.log_level = logger::parse_level(&args[i])
                    .ok_or_else(|| format!("Invalid log level: {}", args[i]))?;
            }
            "--max-steps" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for --max-steps".to_string());
                }
                options.daemon.max_steps = args[i]
                    .parse()
                    .map_err(|_| format!("Invalid max-steps value: {}", args[i]))?;
            }
            "--help" | "-h" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            other => {
                return Err(format!("Unknown option: {}", other));
            }
        }
        i += 1;
    }

    Ok(options)
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} [OPTIONS]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --config <FILE>      JSON service configuration");
    eprintln!("  -s, --script <FILE>      Command script to run");
    eprintln!("  -l, --log-level <LEVEL>  off, error, warn, info (default), debug, trace");
    eprintln!("  --max-steps <N>          Maximum commands to run (0 = unlimited)");
    eprintln!("  -h, --help               Show this help message");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} --script scripts/boot_tree.memfs", program);
    eprintln!("  {} --config memfs.json --log-level debug", program);
}
