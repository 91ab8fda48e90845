fn main() -> std::process::ExitCode {
    shotlift::run()
}
