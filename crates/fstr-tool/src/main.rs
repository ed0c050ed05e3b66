#![forbid(unsafe_code)]

fn main() {
    if let Err(error) = fstr_tool::run_from_env() {
        eprintln!("fstr: {error}");
        std::process::exit(error.exit_code());
    }
}
