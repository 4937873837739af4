fn main() {
    let args: Vec<String> = std::env::args().collect();
    std::process::exit(pdq::cli::run_with_args(&args));
}
