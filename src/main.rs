fn main() {
    if let Err(e) = ai_dashboard::run() {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
