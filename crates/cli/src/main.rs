use std::process::ExitCode;

fn main() -> ExitCode {
    sts_cli::run()
}
