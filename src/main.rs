fn main() {
    if let Err(err) = graphlens::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
