mod cli;

pub fn main() -> ! {
    env_logger::builder().parse_env("GSVN_LOG").init();
    match cli::run(std::env::args_os()) {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            eprintln!("error: {:#}", err);
            std::process::exit(1)
        }
    }
}
