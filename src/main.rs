fn main() {
    if let Err(e) = ollama_tui::cli::main() {
        eprintln!("❌ {e}");
        std::process::exit(1);
    }
}
