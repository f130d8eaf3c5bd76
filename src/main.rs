use std::process::ExitCode;

fn main() -> ExitCode {
    match doltrun::cli::run() {
        Ok(code) => code,
        Err(err) => {
            doltrun::ui::output::error(format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}
