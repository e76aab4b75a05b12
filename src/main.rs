fn main() {
    #[cfg(feature = "cli")]
    oxihex::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("oxihex: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
