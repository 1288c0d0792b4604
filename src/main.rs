fn main() {
    if let Err(err) = dock_planner::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
