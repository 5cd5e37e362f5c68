use std::process::ExitCode;

fn main() -> ExitCode {
    chanprice_cli::run()
}
