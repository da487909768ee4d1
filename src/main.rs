fn main() {
    if let Err(err) = bpmn_autolayout::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
