//! Command line inspector for hexed buffers
//!
//! Usage:
//!   hexed info <file>
//!   hexed dump <file> <offset> <count>
//!   hexed find <file> <hex-pattern> [--backward] [--from N] [--wrap]
//!
//! Configuration is read from `.hexed/buffer.toml` under the working directory.

use hexed_buffer::{Buffer, CancellationToken, ChunkKind, Direction, FindOptions};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn open(path: &str) -> Result<Buffer, String> {
    let root = std::env::current_dir().map_err(|e| format!("No working directory: {}", e))?;
    tracing::debug!(path, root = %root.display(), "opening buffer");
    Buffer::open_in(&root, PathBuf::from(path)).map_err(|e| format!("Failed to open {}: {}", path, e))
}

fn parse_number(text: &str) -> Result<usize, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|_| format!("Invalid number: {}", text))
}

fn parse_hex(text: &str) -> Result<Vec<u8>, String> {
    let digits: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.is_empty() || digits.len() % 2 != 0 {
        return Err(format!("Pattern must be an even number of hex digits: {}", text));
    }
    digits
        .chunks(2)
        .map(|pair| {
            let byte: String = pair.iter().collect();
            u8::from_str_radix(&byte, 16).map_err(|_| format!("Invalid hex byte: {}", byte))
        })
        .collect()
}

fn info(path: &str) -> Result<(), String> {
    let buffer = open(path)?;
    println!("File:      {}", path);
    println!("Length:    {} bytes", buffer.len());
    println!("Read-only: {}", buffer.is_read_only());
    println!("Mapped:    {}", buffer.source().mapped().is_some());
    for (index, chunk) in buffer.chunks().enumerate() {
        match chunk.kind() {
            ChunkKind::Source => {
                let offset = chunk.as_source().map_or(0, |source| source.offset());
                println!("  #{index}: source @{offset:#x} len {}", chunk.len());
            }
            ChunkKind::Memory => println!("  #{index}: memory len {}", chunk.len()),
        }
    }
    Ok(())
}

fn dump(path: &str, offset: usize, count: usize) -> Result<(), String> {
    let buffer = open(path)?;
    if offset > buffer.len() {
        return Err(format!("Offset {} is past the end ({} bytes)", offset, buffer.len()));
    }
    let mut bytes = vec![0u8; count];
    let read = buffer.read(offset, &mut bytes);
    for (row, line) in bytes[..read].chunks(16).enumerate() {
        let hex: Vec<String> = line.iter().map(|b| format!("{:02x}", b)).collect();
        let ascii: String = line
            .iter()
            .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
            .collect();
        println!("{:08x}  {:<47}  |{}|", offset + row * 16, hex.join(" "), ascii);
    }
    Ok(())
}

fn find(path: &str, pattern: &str, flags: &[String]) -> Result<(), String> {
    let pattern = parse_hex(pattern)?;
    let buffer = open(path)?;

    let mut direction = Direction::Forward;
    let mut start = None;
    let mut wrap_around = false;
    let mut flags = flags.iter();
    while let Some(flag) = flags.next() {
        match flag.as_str() {
            "--backward" => direction = Direction::Backward,
            "--wrap" => wrap_around = true,
            "--from" => {
                let value = flags.next().ok_or("--from needs an offset")?;
                start = Some(parse_number(value)?);
            }
            other => return Err(format!("Unknown flag: {}", other)),
        }
    }
    let start = start.unwrap_or(match direction {
        Direction::Forward => 0,
        Direction::Backward => buffer.len(),
    });

    let options = FindOptions {
        start,
        direction,
        wrap_around,
    };
    let cancel = CancellationToken::new();
    match buffer.find(&pattern, options, &cancel) {
        Ok(Some(offset)) => println!("Found at {:#x} ({})", offset, offset),
        Ok(None) => println!("Not found"),
        Err(e) => return Err(format!("Search failed: {}", e)),
    }
    Ok(())
}

fn print_help() {
    println!("hexed - inspect files through the hexed buffer engine");
    println!();
    println!("Commands:");
    println!("  hexed info <file>");
    println!("  hexed dump <file> <offset> <count>");
    println!("  hexed find <file> <hex-pattern> [--backward] [--from N] [--wrap]");
    println!();
    println!("Offsets accept decimal or 0x-prefixed hex. Set RUST_LOG for tracing output.");
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_help();
        return;
    }

    let result = match args[1].as_str() {
        "info" => {
            if args.len() < 3 {
                Err("Usage: hexed info <file>".to_string())
            } else {
                info(&args[2])
            }
        }
        "dump" => {
            if args.len() < 5 {
                Err("Usage: hexed dump <file> <offset> <count>".to_string())
            } else {
                parse_number(&args[3])
                    .and_then(|offset| parse_number(&args[4]).map(|count| (offset, count)))
                    .and_then(|(offset, count)| dump(&args[2], offset, count))
            }
        }
        "find" => {
            if args.len() < 4 {
                Err("Usage: hexed find <file> <hex-pattern> [--backward] [--from N] [--wrap]"
                    .to_string())
            } else {
                find(&args[2], &args[3], &args[4..])
            }
        }
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        other => Err(format!("Unknown command: {}", other)),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
