use std::process::ExitCode;

fn main() -> ExitCode {
    match hookbotd::run_bot() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("hookbotd: {error}");
            ExitCode::FAILURE
        }
    }
}
