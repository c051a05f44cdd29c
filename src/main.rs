use std::process;

fn main() {
    if let Err(e) = muster::cli::main() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
