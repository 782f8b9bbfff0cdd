fn main() {
    if let Err(err) = sheet_ingest::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
