fn main() {
    if let Err(err) = roomviz::app::run() {
        log::error!("{err}");
        std::process::exit(1);
    }
}
