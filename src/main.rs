use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    forgectl::resolve::exit_code(forgectl::resolve::run(argv).await)
}
