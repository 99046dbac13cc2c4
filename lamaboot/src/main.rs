use lamaboot_core::error::SetupError;

fn main() {
    if let Err(e) = lamaboot::run_cli() {
        eprintln!("Error: {e:#}");
        let code = e
            .downcast_ref::<SetupError>()
            .map(SetupError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}
