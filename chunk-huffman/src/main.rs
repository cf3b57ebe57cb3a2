use std::{
    num::NonZeroUsize,
    path::{Path, PathBuf},
    time::Instant,
};

use anyhow::{anyhow, Context};
use chunk_huffman::{
    compress_file,
    config::{Config, DEFAULT_BUFFER_SIZE, MAX_CHUNK_SIZE},
    decompress_file, paths,
};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about = "Huffman coding over n-byte chunks", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Size of the read and write buffers in bytes
    #[arg(long, global = true, env = "CHUNK_HUFFMAN_BUFFER_SIZE", default_value_t = DEFAULT_BUFFER_SIZE)]
    buffer_size: usize,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compress a file; the result is written next to it as `<name>.<n>.hc`
    #[command(alias = "c")]
    Compress {
        path: PathBuf,
        chunk_size: NonZeroUsize,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Restore a `.hc` file; the result is written next to it as `extracted.<name>`
    #[command(alias = "d")]
    Decompress {
        path: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Command::Compress {
            path,
            chunk_size,
            output,
        } => {
            let config = Config::with_chunk_size(chunk_size)
                .ok_or_else(|| {
                    anyhow!("The chunk size must be at most {} bytes", MAX_CHUNK_SIZE)
                })?
                .with_buffer_size(args.buffer_size);
            let output = match output {
                Some(output) => output,
                None => paths::compressed_path(&path, chunk_size.get())
                    .ok_or_else(|| anyhow!("Cannot derive an output name from {}", path.display()))?,
            };

            let start = Instant::now();
            let report = compress_file(&path, &output, &config)
                .with_context(|| format!("Failed to compress {}", path.display()))?;

            println!("Compression ratio: {}", report.ratio());
            println!("total compress time: {} ms", start.elapsed().as_millis());
            print_output(&output);
        }
        Command::Decompress { path, output } => {
            let output = match output {
                Some(output) => output,
                None => paths::extracted_path(&path).ok_or_else(|| {
                    anyhow!("The file must end in .{}: {}", paths::EXTENSION, path.display())
                })?,
            };

            let start = Instant::now();
            decompress_file(&path, &output, args.buffer_size.max(1))
                .with_context(|| format!("Failed to decompress {}", path.display()))?;

            println!("total decompress time: {} ms", start.elapsed().as_millis());
            print_output(&output);
        }
    }

    Ok(())
}

fn print_output(output: &Path) {
    println!("Output written to {}", output.display());
}
