use std::process::ExitCode;

fn main() -> ExitCode {
    match voidstrike::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Fatal: {err}");
            ExitCode::FAILURE
        }
    }
}
