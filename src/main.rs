fn main() {
    if let Err(err) = emostudy_lib::run() {
        eprintln!("emostudy: {err:#}");
        std::process::exit(1);
    }
}
