fn main() -> std::process::ExitCode {
    media_fetch_lib::run()
}
