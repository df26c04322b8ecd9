use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use minipas::{
    compiler::{compile_with, Compilation, Options},
    symbol_table::DEFAULT_CAPACITY,
    tokenizer::{tokenize, TokenKind},
};

#[derive(Debug, Parser)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Tokenize, parse and analyze a source file, printing all three listings.
    Run(RunArgs),
    /// Dump the token stream of a source file.
    Tokens(TokensArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    file: PathBuf,
    /// Slots in the lexeme and variable tables.
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,
    /// Write lexical.txt, syntax.txt and semantic.txt here instead of stdout.
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct TokensArgs {
    file: PathBuf,
}

#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn main() {
    let args = Cli::parse();

    let result = match &args.command {
        Command::Run(args) => run_command(args),
        Command::Tokens(args) => tokens_command(args).map(|()| false),
    };

    match result {
        Ok(false) => {}
        Ok(true) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    }
}

/// Returns whether any diagnostic was recorded.
fn run_command(args: &RunArgs) -> Result<bool, RunError> {
    let source = read_source(&args.file)?;
    let options = Options {
        capacity: args.capacity,
    };
    let compilation = compile_with(&source, &options);

    match &args.out_dir {
        Some(dir) => write_listings(dir, &compilation)?,
        None => {
            print!("{}", compilation.lexical_listing());
            println!();
            print!("{}", compilation.parse_trace());
            println!();
            print!("{}", compilation.semantic_listing());
        }
    }

    Ok(compilation.has_errors())
}

fn write_listings(dir: &Path, compilation: &Compilation) -> Result<(), RunError> {
    let listings = [
        ("lexical.txt", compilation.lexical_listing()),
        ("syntax.txt", compilation.parse_trace()),
        ("semantic.txt", compilation.semantic_listing()),
    ];
    for (name, contents) in listings {
        let path = dir.join(name);
        std::fs::write(&path, contents).map_err(|source| RunError::Write { path, source })?;
    }
    Ok(())
}

fn tokens_command(args: &TokensArgs) -> Result<(), RunError> {
    let source = read_source(&args.file)?;
    let tokenized = tokenize(&source);

    let mut line = 0;
    for token in &tokenized.tokens {
        if token.line != line {
            print!("{:4} ", token.line);
            line = token.line;
        } else {
            print!("   | ");
        }

        let marker = if token.kind == TokenKind::Error { " !" } else { "" };
        println!("{:<10} {}{}", token.kind.to_string(), token.lexeme, marker);
    }

    Ok(())
}

fn read_source(path: &Path) -> Result<String, RunError> {
    std::fs::read_to_string(path).map_err(|source| RunError::Read {
        path: path.to_path_buf(),
        source,
    })
}
