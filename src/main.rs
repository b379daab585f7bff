use clap::{Parser, Subcommand};
use mylang::{diagnostics, language::parser, runtime::Interpreter};
use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

#[derive(Debug, Parser)]
#[command(
    name = "mylang",
    version,
    about = "MyLang interpreter",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Evaluate a MyLang source file
    Run {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Parse a source file and dump its syntax tree
    Ast {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run { file } => run_file(&file),
        Commands::Ast { file } => dump_ast(&file),
    }
}

fn run_file(path: &Path) -> ExitCode {
    let Some((source, program)) = load_program(path) else {
        return ExitCode::FAILURE;
    };
    let mut interpreter = Interpreter::new();
    match interpreter.eval_program(&program) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            diagnostics::emit_runtime_error(path, &source, &err);
            ExitCode::FAILURE
        }
    }
}

fn dump_ast(path: &Path) -> ExitCode {
    let Some((_, program)) = load_program(path) else {
        return ExitCode::FAILURE;
    };
    println!("{:#?}", program);
    ExitCode::SUCCESS
}

fn load_program(path: &Path) -> Option<(String, mylang::language::ast::Program)> {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            diagnostics::report_io_error(path, &err);
            return None;
        }
    };
    match parser::parse(&source) {
        Ok(program) => Some((source, program)),
        Err(errors) => {
            diagnostics::emit_syntax_errors(path, &source, &errors);
            None
        }
    }
}
