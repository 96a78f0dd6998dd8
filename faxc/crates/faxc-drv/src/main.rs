use std::path::PathBuf;
use std::process::ExitCode;

use faxc_drv::{print_usage, run_file, run_repl, EXIT_USAGE};

fn main() -> anyhow::Result<ExitCode> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let code = match args.as_slice() {
        [_prog] => run_repl()?,
        [_prog, path] => run_file(&PathBuf::from(path))?,
        [prog, ..] => {
            print_usage(prog);
            EXIT_USAGE
        }
        [] => unreachable!("argv always has at least the program name"),
    };

    Ok(ExitCode::from(code as u8))
}
